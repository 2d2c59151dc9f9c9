//! Polling and push scheduler.
//!
//! Driven by a fixed 1-second tick. The scheduler owns three countdowns
//! and notifies a [`SchedulerDelegate`] when one expires; it never touches
//! the UART or the relay itself.
//!
//! ```text
//!  tick ──▶ settle delay ──▶ ┌─ MCU poll countdown ──▶ McuPoll(0x0B / 0x0C, alternating)
//!                            ├─ push watchdog (decrement only)
//!                            └─ push countdown ──▶ Push   (fast while watchdog > 0,
//!                                                           slow otherwise)
//! ```
//!
//! A push only fires when the module is on now or was on at the previous
//! tick, so a push that falls on the power-down tick still goes out.

use crate::app::ports::{ScheduleFired, SchedulerDelegate};
use crate::config::{EngineConfig, PushFrequency};
use crate::uart::PollKind;
use log::{debug, info};

pub struct PollingScheduler {
    /// Ticks left before the scheduler starts counting.
    settle_remaining: u32,
    running: bool,

    // --- MCU poll ---
    mcu_interval: i32,
    mcu_countdown: i32,
    next_poll: PollKind,

    // --- Push ---
    push: PushFrequency,
    push_countdown: i64,
    watchdog: u32,
    watchdog_budget: u32,
    /// Module state seen by the previous tick.
    prev_on: bool,
}

impl PollingScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            settle_remaining: config.settle_secs,
            running: true,
            mcu_interval: config.mcu_poll_secs,
            mcu_countdown: config.mcu_poll_secs,
            next_poll: PollKind::Status,
            push: config.push,
            push_countdown: i64::from(config.push.slow),
            watchdog: 0,
            watchdog_budget: config.watchdog_secs,
            prev_on: false,
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self, module_is_on: bool, delegate: &mut dyn SchedulerDelegate) {
        if !self.running {
            return;
        }
        let prev_on = std::mem::replace(&mut self.prev_on, module_is_on);
        if self.settle_remaining > 0 {
            self.settle_remaining -= 1;
            if self.settle_remaining == 0 {
                info!("Scheduler: settled, polling every {}s", self.mcu_interval);
            }
            return;
        }

        if self.mcu_interval > 0 {
            self.mcu_countdown -= 1;
            if self.mcu_countdown <= 0 {
                delegate.on_schedule_fired(ScheduleFired::McuPoll(self.next_poll));
                self.next_poll = self.next_poll.other();
                self.mcu_countdown = self.mcu_interval;
            }
        }

        self.watchdog = self.watchdog.saturating_sub(1);

        self.push_countdown -= 1;
        if self.push_countdown <= 0 {
            self.push_countdown = i64::from(self.current_push_interval());
            if module_is_on || prev_on {
                delegate.on_schedule_fired(ScheduleFired::Push);
            } else {
                debug!("Scheduler: push skipped, module off");
            }
        }
    }

    /// Raise the watchdog to its full budget and push on the next tick.
    pub fn keepalive(&mut self) {
        self.watchdog = self.watchdog_budget;
        self.push_countdown = 0;
        debug!("Scheduler: keepalive, watchdog={}s", self.watchdog);
    }

    /// Push on the next tick without touching the watchdog.
    pub fn force_push(&mut self) {
        self.push_countdown = 0;
    }

    /// Change the MCU poll interval; zero or negative disables polling.
    pub fn set_mcu_interval(&mut self, secs: i32) {
        self.mcu_interval = secs;
        self.mcu_countdown = secs;
        if secs > 0 {
            info!("Scheduler: MCU poll every {}s", secs);
        } else {
            info!("Scheduler: MCU poll disabled");
        }
    }

    pub fn mcu_interval(&self) -> i32 {
        self.mcu_interval
    }

    /// Replace the push cadence and restart the push countdown under it.
    pub fn set_push_frequency(&mut self, push: PushFrequency) {
        self.push = push;
        self.push_countdown = i64::from(self.current_push_interval());
        info!("Scheduler: push fast={}s slow={}s", push.fast, push.slow);
    }

    pub fn push_frequency(&self) -> PushFrequency {
        self.push
    }

    pub fn watchdog_remaining(&self) -> u32 {
        self.watchdog
    }

    pub fn is_settled(&self) -> bool {
        self.settle_remaining == 0
    }

    /// Cancel every countdown. Ticks are ignored until [`start`](Self::start).
    pub fn stop(&mut self) {
        self.running = false;
        self.watchdog = 0;
        info!("Scheduler: stopped");
    }

    /// Resume with fresh countdowns.
    pub fn start(&mut self) {
        self.running = true;
        self.mcu_countdown = self.mcu_interval;
        self.push_countdown = i64::from(self.current_push_interval());
        info!("Scheduler: started");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn current_push_interval(&self) -> u32 {
        if self.watchdog > 0 {
            self.push.fast
        } else {
            self.push.slow
        }
    }
}
