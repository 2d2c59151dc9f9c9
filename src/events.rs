//! Engine event queue.
//!
//! Events are produced by:
//! - the UART reader (raw controller bytes)
//! - the relay reader (one JSON document per event) and its link state
//! - the tick timer (1 Hz)
//!
//! Events are consumed by the single engine loop, strictly in arrival
//! order, one at a time. No handler is ever interrupted by another event.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ UART reader │────▶│              │     │              │
//! │ Relay reader│────▶│  EventQueue  │────▶│ Engine loop  │
//! │ Tick timer  │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::debug;

use crate::app::ports::Ports;
use crate::app::service::Engine;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Largest UART read carried by one event.
pub const UART_CHUNK: usize = 256;

pub type UartBytes = heapless::Vec<u8, UART_CHUNK>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Scheduler tick.
    Tick,
    /// Bytes read from the controller UART.
    Uart(UartBytes),
    /// One inbound relay document.
    Relay(String),
    RelayUp,
    RelayDown,
}

pub type EventQueue = Channel<CriticalSectionRawMutex, EngineEvent, EVENT_QUEUE_CAP>;

/// Split a UART read into events of at most [`UART_CHUNK`] bytes.
pub fn uart_events(bytes: &[u8]) -> impl Iterator<Item = EngineEvent> + '_ {
    bytes.chunks(UART_CHUNK).map(|chunk| {
        let mut v = UartBytes::new();
        // chunks() never exceeds the capacity
        let _ = v.extend_from_slice(chunk);
        EngineEvent::Uart(v)
    })
}

/// Enqueue from a producer thread, waiting for room. Never call this from
/// the thread that drains the queue.
pub fn send_event(queue: &EventQueue, event: EngineEvent) {
    futures_lite::future::block_on(queue.send(event));
}

/// Enqueue from the consumer thread. A full queue is drained into the
/// engine first, so nothing is dropped.
pub fn push_or_drain(
    queue: &EventQueue,
    event: EngineEvent,
    engine: &mut Engine,
    ports: &mut Ports<'_>,
) {
    let mut event = event;
    loop {
        match queue.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(back)) => {
                debug!("Event queue full, draining");
                drain_events(queue, engine, ports);
                event = back;
            }
        }
    }
}

/// Hand every pending event to the engine in FIFO order. Returns the
/// number processed.
pub fn drain_events(queue: &EventQueue, engine: &mut Engine, ports: &mut Ports<'_>) -> usize {
    let mut n = 0;
    while let Ok(event) = queue.try_receive() {
        engine.handle_event(event, ports);
        n += 1;
    }
    n
}
