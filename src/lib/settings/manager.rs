use std::{
    io::prelude::*,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::monitor::{network::InterfaceFilter, types::Module};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct HeaderSettingsFile {
    pub name: String,
    pub version: u32,
}

/// Which dashboard modules are shown.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModuleVisibility {
    pub memory: bool,
    pub storage: bool,
    pub cpu: bool,
    pub battery: bool,
    pub network: bool,
    pub trash: bool,
}

impl Default for ModuleVisibility {
    fn default() -> Self {
        Self {
            memory: true,
            storage: true,
            cpu: true,
            battery: true,
            network: true,
            trash: true,
        }
    }
}

impl ModuleVisibility {
    pub fn is_enabled(&self, module: Module) -> bool {
        match module {
            Module::Memory => self.memory,
            Module::Storage => self.storage,
            Module::Cpu => self.cpu,
            Module::Battery => self.battery,
            Module::Network => self.network,
            Module::Trash => self.trash,
        }
    }

    pub fn set(&mut self, module: Module, enabled: bool) {
        let flag = match module {
            Module::Memory => &mut self.memory,
            Module::Storage => &mut self.storage,
            Module::Cpu => &mut self.cpu,
            Module::Battery => &mut self.battery,
            Module::Network => &mut self.network,
            Module::Trash => &mut self.trash,
        };
        *flag = enabled;
    }

    pub fn enabled(&self) -> Vec<Module> {
        Module::ALL
            .into_iter()
            .filter(|module| self.is_enabled(*module))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Chinese,
    Japanese,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SettingsStruct {
    pub header: HeaderSettingsFile,
    #[serde(default)]
    pub modules: ModuleVisibility,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub network_interfaces: InterfaceFilter,
    #[serde(default)]
    pub trash_path: Option<PathBuf>,
}

impl Default for SettingsStruct {
    fn default() -> Self {
        SettingsStruct {
            header: HeaderSettingsFile {
                name: "Host Dashboard".to_string(),
                version: 0,
            },
            modules: ModuleVisibility::default(),
            language: Language::default(),
            network_interfaces: InterfaceFilter::default(),
            trash_path: None,
        }
    }
}

#[derive(Debug)]
struct ManagerStruct {
    pub file_name: PathBuf,
    pub config: SettingsStruct,
}

#[derive(Default)]
struct Manager {
    pub content: Option<ManagerStruct>,
}

lazy_static! {
    static ref MANAGER: Arc<Mutex<Manager>> = Default::default();
}

impl Manager {
    fn new(file_name: &str, reset: bool) -> ManagerStruct {
        let file_name = settings_path(file_name);

        debug!("Using settings file: {file_name:?}");

        let config = if reset {
            info!("Resetting settings file: {file_name:?}");
            SettingsStruct::default()
        } else {
            load_settings_from_file(&file_name)
        };

        let settings = ManagerStruct { file_name, config };

        if let Err(error) = save_settings_to_file(&settings.file_name, &settings.config) {
            error!("Failed to save file: {error:?}");
        }

        settings
    }
}

fn settings_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let Some(project) = ProjectDirs::from("com", "Host Dashboard", env!("CARGO_PKG_NAME")) else {
        warn!("Failed to find user settings path, using the working directory");
        return path.to_path_buf();
    };

    let folder_path = project.config_dir();
    if let Err(error) = std::fs::create_dir_all(folder_path) {
        error!("Failed to create settings folder: {folder_path:?}, reason: {error:?}");
    }

    folder_path.join(file_name)
}

// Init settings manager with the desired settings file,
// will be created if does not exist
#[instrument(level = "debug")]
pub fn init(file_name: Option<&str>, reset: bool) {
    let file_name = file_name.unwrap_or("settings.json");
    let content = Manager::new(file_name, reset);
    MANAGER.lock().unwrap().content = Some(content);
}

fn load_settings_from_file(file_name: &Path) -> SettingsStruct {
    let content = match std::fs::read_to_string(file_name) {
        Ok(content) => content,
        Err(error) => {
            debug!("Settings file not loaded, using defaults: {error:?}");
            return SettingsStruct::default();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|error| {
        warn!("Failed to parse settings file {file_name:?}, using defaults: {error:?}");
        SettingsStruct::default()
    })
}

fn save_settings_to_file(file_name: &Path, content: &SettingsStruct) -> Result<()> {
    let value = serde_json::to_string_pretty(content).context("Failed to serialize settings")?;
    let mut file = std::fs::File::create(file_name)
        .with_context(|| format!("Failed to create settings file {file_name:?}"))?;
    file.write_all(value.as_bytes())
        .with_context(|| format!("Failed to write settings file {file_name:?}"))?;

    trace!("Saved settings: {content:#?}");
    Ok(())
}

// Save the latest state of the settings
pub fn save() {
    let manager = MANAGER.lock().unwrap();
    if let Some(content) = &manager.content {
        if let Err(error) = save_settings_to_file(&content.file_name, &content.config) {
            error!(
                "Failed to save settings: file: {:#?}, configuration: {:#?}, error: {:#?}",
                &content.file_name, &content.config, error
            );
        }
    } else {
        debug!("Settings manager not initialized, nothing to save");
    }
}

#[instrument(level = "debug")]
pub fn reset() {
    {
        let mut manager = MANAGER.lock().unwrap();
        if let Some(content) = manager.content.as_mut() {
            content.config = SettingsStruct::default();
        }
    }
    save();
}

fn read<T>(f: impl FnOnce(&SettingsStruct) -> T) -> T {
    let manager = MANAGER.lock().unwrap();
    match &manager.content {
        Some(content) => f(&content.config),
        None => f(&SettingsStruct::default()),
    }
}

fn write(f: impl FnOnce(&mut SettingsStruct)) {
    {
        let mut manager = MANAGER.lock().unwrap();
        let Some(content) = manager.content.as_mut() else {
            warn!("Settings manager not initialized, change is not stored");
            return;
        };
        f(&mut content.config);
    }
    save();
}

pub fn settings() -> SettingsStruct {
    read(|config| config.clone())
}

pub fn modules() -> ModuleVisibility {
    read(|config| config.modules.clone())
}

pub fn set_module(module: Module, enabled: bool) {
    write(|config| config.modules.set(module, enabled));
}

pub fn set_language(language: Language) {
    write(|config| config.language = language);
}

pub fn network_interfaces() -> InterfaceFilter {
    read(|config| config.network_interfaces.clone())
}

pub fn set_network_interfaces(network_interfaces: InterfaceFilter) {
    write(|config| config.network_interfaces = network_interfaces);
}

pub fn trash_path() -> Option<PathBuf> {
    read(|config| config.trash_path.clone())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn generate_random_settings_file_name() -> String {
        use rand::Rng;

        let rand_string: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();

        std::env::temp_dir()
            .join(format!("{rand_string}.json"))
            .to_string_lossy()
            .to_string()
    }

    #[test]
    #[serial]
    fn test_store() {
        let file_name = generate_random_settings_file_name();
        init(Some(&file_name), false);

        assert_eq!(settings().header.name, "Host Dashboard".to_string());
        assert_eq!(modules().enabled(), Module::ALL.to_vec());

        set_module(Module::Battery, false);
        set_language(Language::Japanese);
        let interfaces = InterfaceFilter {
            prefixes: vec!["wlan".into()],
            names: vec!["br-lan".into()],
        };
        set_network_interfaces(interfaces.clone());

        // Reload from disk
        init(Some(&file_name), false);
        assert!(!modules().is_enabled(Module::Battery));
        assert_eq!(settings().language, Language::Japanese);
        assert_eq!(network_interfaces(), interfaces);

        reset();
        assert_eq!(settings(), SettingsStruct::default());

        std::fs::remove_file(file_name).unwrap();
    }

    #[test]
    #[serial]
    fn test_reset_flag_ignores_stored_file() {
        let file_name = generate_random_settings_file_name();
        init(Some(&file_name), false);
        set_language(Language::Chinese);

        init(Some(&file_name), true);
        assert_eq!(settings().language, Language::English);

        std::fs::remove_file(file_name).unwrap();
    }

    #[test]
    #[serial]
    fn test_partial_file_uses_defaults() {
        let file_name = generate_random_settings_file_name();
        std::fs::write(
            &file_name,
            r#"{"header": {"name": "Old", "version": 0}, "modules": {"cpu": false}}"#,
        )
        .unwrap();

        init(Some(&file_name), false);
        assert_eq!(settings().header.name, "Old");
        assert!(!modules().cpu);
        assert!(modules().memory);
        assert_eq!(network_interfaces(), InterfaceFilter::default());
        assert_eq!(trash_path(), None);

        std::fs::remove_file(file_name).unwrap();
    }
}
