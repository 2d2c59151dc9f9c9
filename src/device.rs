//! Device identity and per-model status layouts.
//!
//! A device announces itself as `<PFX>-<suffix>`, e.g. `PBL-EFCAFE`.
//! The 3-letter prefix names the control-board family, which fixes the
//! byte layout of the status (0x0B) and temperatures (0x0C) replies and,
//! with it, where the `moduleIsOn` byte sits.

use core::fmt::{self, Write};

/// Bounded device id string (`"PBL-EFCAFE"`).
pub type DeviceIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Offset of `moduleIsOn` in a status frame with no optional fields.
const BASE_POWER_OFFSET: usize = 18;

/// Width of one temperature triple.
const TRIPLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIdError {
    /// No `-` separating prefix and suffix.
    MissingSeparator,
    /// Prefix is not exactly 3 ASCII alphanumerics.
    BadPrefix,
    /// Suffix is empty or contains whitespace.
    BadSuffix,
    /// Longer than [`DeviceIdString`] can hold.
    TooLong,
}

impl fmt::Display for DeviceIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "missing '-' separator"),
            Self::BadPrefix => write!(f, "model prefix must be 3 alphanumerics"),
            Self::BadSuffix => write!(f, "suffix must be non-empty without whitespace"),
            Self::TooLong => write!(f, "device id too long"),
        }
    }
}

/// Parsed device identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    full: DeviceIdString,
}

impl DeviceId {
    pub fn parse(s: &str) -> Result<Self, DeviceIdError> {
        let (prefix, suffix) = s.split_once('-').ok_or(DeviceIdError::MissingSeparator)?;
        if prefix.len() != 3 || !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DeviceIdError::BadPrefix);
        }
        if suffix.is_empty() || suffix.chars().any(char::is_whitespace) {
            return Err(DeviceIdError::BadSuffix);
        }
        let mut full = DeviceIdString::new();
        full.push_str(s).map_err(|_| DeviceIdError::TooLong)?;
        Ok(Self { full })
    }

    /// Derive an id from the last 3 MAC bytes: `<prefix>-XXYYZZ`.
    pub fn from_mac(prefix: &str, mac: &MacAddress) -> Result<Self, DeviceIdError> {
        let mut s = DeviceIdString::new();
        write!(s, "{}-{:02X}{:02X}{:02X}", prefix, mac[3], mac[4], mac[5])
            .map_err(|_| DeviceIdError::TooLong)?;
        Self::parse(&s)
    }

    /// The 3-letter model prefix.
    pub fn prefix(&self) -> &str {
        &self.full[..3]
    }

    pub fn suffix(&self) -> &str {
        &self.full[4..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Optional temperature triples present in a board's status replies.
///
/// Each present field shifts every later byte by three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusLayout {
    pub p2_target: bool,
    pub p4_temp: bool,
    pub smoker_act_temp: bool,
}

impl StatusLayout {
    pub const MINIMAL: Self = Self {
        p2_target: false,
        p4_temp: false,
        smoker_act_temp: false,
    };

    pub const DUAL_PROBE: Self = Self {
        p2_target: true,
        p4_temp: true,
        smoker_act_temp: false,
    };

    pub const FULL: Self = Self {
        p2_target: true,
        p4_temp: true,
        smoker_act_temp: true,
    };

    fn optional_count(self) -> usize {
        usize::from(self.p2_target) + usize::from(self.p4_temp) + usize::from(self.smoker_act_temp)
    }

    /// Full-frame offset of `moduleIsOn` implied by this layout.
    pub fn power_offset(self) -> usize {
        BASE_POWER_OFFSET + TRIPLE * self.optional_count()
    }
}

/// Everything the engine needs to know about one board family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelProfile {
    pub layout: StatusLayout,
    /// Pinned `moduleIsOn` offset for boards that deviate from the layout rule.
    pub power_offset_override: Option<usize>,
    /// Board reports Fahrenheit digits even in Celsius mode.
    pub converts_units: bool,
}

impl ModelProfile {
    pub const fn new(layout: StatusLayout) -> Self {
        Self {
            layout,
            power_offset_override: None,
            converts_units: false,
        }
    }

    pub const fn with_power_offset(mut self, offset: usize) -> Self {
        self.power_offset_override = Some(offset);
        self
    }

    pub const fn converting_units(mut self) -> Self {
        self.converts_units = true;
        self
    }

    pub fn power_offset(&self) -> usize {
        self.power_offset_override
            .unwrap_or_else(|| self.layout.power_offset())
    }
}

/// Maximum number of model entries.
const MAX_MODELS: usize = 16;

/// Built-in board families.
const BUILTIN_MODELS: &[(&str, ModelProfile)] = &[
    ("PBL", ModelProfile::new(StatusLayout::DUAL_PROBE)),
    ("PBA", ModelProfile::new(StatusLayout::DUAL_PROBE)),
    ("PBC", ModelProfile::new(StatusLayout::DUAL_PROBE)),
    ("PBV", ModelProfile::new(StatusLayout::DUAL_PROBE).converting_units()),
    (
        "PBT",
        ModelProfile::new(StatusLayout {
            p2_target: true,
            p4_temp: false,
            smoker_act_temp: false,
        })
        .converting_units(),
    ),
    (
        "PBM",
        ModelProfile::new(StatusLayout::DUAL_PROBE)
            .with_power_offset(23)
            .converting_units(),
    ),
    ("PBG", ModelProfile::new(StatusLayout::FULL)),
    ("LFS", ModelProfile::new(StatusLayout::MINIMAL).converting_units()),
];

/// Prefix → profile lookup.
#[derive(Debug, Clone)]
pub struct ModelTable {
    entries: heapless::Vec<([u8; 3], ModelProfile), MAX_MODELS>,
}

impl ModelTable {
    /// An empty table; every prefix is unknown.
    pub fn empty() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// Register or replace a profile. Returns `false` if the table is full
    /// or the prefix is not 3 bytes.
    pub fn insert(&mut self, prefix: &str, profile: ModelProfile) -> bool {
        let Ok(key) = <[u8; 3]>::try_from(prefix.as_bytes()) else {
            return false;
        };
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = profile;
            return true;
        }
        self.entries.push((key, profile)).is_ok()
    }

    pub fn lookup(&self, prefix: &str) -> Option<&ModelProfile> {
        let key = prefix.as_bytes();
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, p)| p)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter_map(|(k, _)| core::str::from_utf8(k).ok())
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (prefix, profile) in BUILTIN_MODELS {
            table.insert(prefix, *profile);
        }
        table
    }
}
