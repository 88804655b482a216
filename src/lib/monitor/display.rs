use serde::Serialize;

use super::types::{BatteryColor, BatteryIcon, Module, PublishedState, TrashSize};

pub const TRASH_EMPTY: &str = "Empty";
pub const TRASH_NO_ACCESS: &str = "No Access";

/// Presentation-ready rendering of a [`PublishedState`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayState {
    pub memory_used: String,
    pub memory_total: String,
    pub memory_percent: f64,
    pub storage_free: String,
    pub storage_used_percent: f64,
    pub cpu_load: String,
    pub battery_percent: String,
    pub battery_icon: BatteryIcon,
    pub battery_color: BatteryColor,
    pub network_speed: String,
    pub trash_size: String,
    /// Readers should show the access guidance instead of the dashboard.
    pub show_permission_guide: bool,
    pub modules: Vec<Module>,
}

impl DisplayState {
    pub fn new(state: &PublishedState, modules: Vec<Module>) -> Self {
        Self {
            memory_used: format_bytes(state.memory_used_bytes),
            memory_total: format_bytes(state.memory_total_bytes),
            memory_percent: state.memory_percent,
            storage_free: format_bytes(state.storage_free_bytes),
            storage_used_percent: state.storage_used_percent,
            cpu_load: format!("{:.0}%", state.cpu_load_percent),
            battery_percent: format!("{}%", state.battery_percent),
            battery_icon: BatteryIcon::from_level(state.battery_percent, state.battery_state),
            battery_color: state.battery_state.color(),
            network_speed: format!("{}/s", format_bytes(state.network_bytes_per_sec as u64)),
            trash_size: match state.trash_size {
                TrashSize::Empty => TRASH_EMPTY.to_string(),
                TrashSize::NoAccess => TRASH_NO_ACCESS.to_string(),
                TrashSize::Bytes(bytes) => format_bytes(bytes),
            },
            show_permission_guide: !state.trash_accessible,
            modules,
        }
    }
}

/// Decimal file-size formatting: "512 bytes", "340 KB", "12.3 MB", "1.23 GB".
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(&str, i32); 5] = [("KB", 0), ("MB", 1), ("GB", 2), ("TB", 2), ("PB", 2)];

    if bytes < 1000 {
        return match bytes {
            1 => "1 byte".to_string(),
            bytes => format!("{bytes} bytes"),
        };
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    loop {
        let (_, precision) = UNITS[unit];
        let scale = 10f64.powi(precision);
        let rounded = (value * scale).round() / scale;
        if rounded < 1000.0 || unit == UNITS.len() - 1 {
            break;
        }
        value /= 1000.0;
        unit += 1;
    }

    let (name, precision) = UNITS[unit];
    format!("{value:.prec$} {name}", prec = precision as usize)
}
