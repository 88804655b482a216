use serde::{Deserialize, Serialize};

/// Everything a dashboard reader needs from one tick.
///
/// Each field is independently meaningful: an updater that fails leaves its
/// own fields at the last published value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PublishedState {
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    /// Fraction in `[0, 1]`.
    pub memory_percent: f64,

    pub storage_free_bytes: u64,
    /// Fraction in `[0, 1]`.
    pub storage_used_percent: f64,

    /// Percentage in `[0, 100]`, stays at 0 until two samples exist.
    pub cpu_load_percent: f64,

    pub battery_percent: u8,
    pub battery_state: BatteryState,

    pub network_bytes_per_sec: f64,

    pub trash_size: TrashSize,
    pub trash_accessible: bool,
}

impl Default for PublishedState {
    fn default() -> Self {
        Self {
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            memory_percent: 0.0,
            storage_free_bytes: 0,
            storage_used_percent: 0.0,
            cpu_load_percent: 0.0,
            battery_percent: 100,
            battery_state: BatteryState::Normal,
            network_bytes_per_sec: 0.0,
            trash_size: TrashSize::Empty,
            trash_accessible: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryState {
    Charging,
    Normal,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryIcon {
    Plugged,
    Full,
    ThreeQuarter,
    Half,
    Quarter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryColor {
    Green,
    Red,
}

impl BatteryState {
    pub const LOW_THRESHOLD: u8 = 20;

    pub fn classify(percent: u8, is_charging: bool) -> Self {
        if is_charging {
            Self::Charging
        } else if percent < Self::LOW_THRESHOLD {
            Self::Low
        } else {
            Self::Normal
        }
    }

    pub fn color(&self) -> BatteryColor {
        match self {
            Self::Low => BatteryColor::Red,
            Self::Charging | Self::Normal => BatteryColor::Green,
        }
    }
}

impl BatteryIcon {
    pub fn from_level(percent: u8, state: BatteryState) -> Self {
        if state == BatteryState::Charging {
            return Self::Plugged;
        }

        match percent {
            80.. => Self::Full,
            50..=79 => Self::ThreeQuarter,
            25..=49 => Self::Half,
            _ => Self::Quarter,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bytes", rename_all = "snake_case")]
pub enum TrashSize {
    Empty,
    Bytes(u64),
    NoAccess,
}

impl TrashSize {
    pub fn from_total(total: u64) -> Self {
        match total {
            0 => Self::Empty,
            bytes => Self::Bytes(bytes),
        }
    }
}

/// Dashboard modules that can be shown or hidden.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Memory,
    Storage,
    Cpu,
    Battery,
    Network,
    Trash,
}

impl Module {
    pub const ALL: [Module; 6] = [
        Module::Memory,
        Module::Storage,
        Module::Cpu,
        Module::Battery,
        Module::Network,
        Module::Trash,
    ];
}
