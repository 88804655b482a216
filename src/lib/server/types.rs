use serde::{Deserialize, Serialize};

use crate::{
    monitor::{network::InterfaceFilter, types::Module},
    settings::manager::Language,
};

#[derive(Debug, Serialize)]
pub struct Info {
    pub name: String,
    pub version: String,
    pub authors: String,
    pub started_at: String,
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct EmptyTrashResult {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct TrashPermission {
    pub accessible: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetModule {
    pub module: Module,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetLanguage {
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct ResetSettings {
    pub all: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetNetworkInterfaces {
    pub network_interfaces: InterfaceFilter,
}
