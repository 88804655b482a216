use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;

use host_dashboard::monitor::{
    cpu::{CoreTicks, CpuTicks},
    error::ProbeError,
    manager::Monitor,
    network::{InterfaceCounter, InterfaceFilter},
    probe::{MemoryReading, PowerSourceReading, StorageReading},
    trash::{self, TrashEntry},
    types::{BatteryState, TrashSize},
    DisplayState, HostProbe, Sampler, SystemProbe,
};

/// Steady host whose trash lives in a real directory.
struct SteadyHost {
    trash_path: PathBuf,
    /// Listing the trash fails with `PermissionDenied` while set.
    trash_denied: Arc<AtomicBool>,
    ticks: u64,
    received_bytes: u64,
}

impl SteadyHost {
    fn new(trash_path: &Path) -> Self {
        Self {
            trash_path: trash_path.to_path_buf(),
            trash_denied: Default::default(),
            ticks: 0,
            received_bytes: 0,
        }
    }
}

impl HostProbe for SteadyHost {
    fn memory(&mut self) -> Result<MemoryReading, ProbeError> {
        Ok(MemoryReading {
            used_bytes: 4_000_000_000,
            total_bytes: 8_000_000_000,
        })
    }

    fn storage(&mut self) -> Result<StorageReading, ProbeError> {
        Ok(StorageReading {
            total_bytes: 500_000_000_000,
            available_bytes: 125_000_000_000,
        })
    }

    fn cpu_ticks(&mut self) -> Result<CpuTicks, ProbeError> {
        // Half busy on both cores
        self.ticks += 100;
        let core = CoreTicks {
            user: self.ticks / 2,
            system: 0,
            nice: 0,
            idle: self.ticks / 2,
        };
        Ok(CpuTicks::new(vec![core, core]))
    }

    fn power_source(&mut self) -> Result<Option<PowerSourceReading>, ProbeError> {
        Ok(Some(PowerSourceReading {
            current_capacity: 15.0,
            max_capacity: 100.0,
            is_charging: false,
        }))
    }

    fn interface_counters(&mut self) -> Result<Vec<InterfaceCounter>, ProbeError> {
        self.received_bytes += 1_000;
        Ok(vec![
            InterfaceCounter {
                name: "en0".into(),
                received_bytes: self.received_bytes,
            },
            InterfaceCounter {
                name: "lo0".into(),
                received_bytes: 999_999_999,
            },
        ])
    }

    fn trash_entries(&mut self) -> io::Result<Vec<TrashEntry>> {
        if self.trash_denied.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        trash::list_entries(&self.trash_path)
    }

    fn remove_trash_entry(&mut self, entry: &TrashEntry) -> io::Result<()> {
        trash::remove_entry(entry)
    }
}

fn filter() -> InterfaceFilter {
    InterfaceFilter {
        prefixes: vec!["en".into()],
        names: vec![],
    }
}

fn fill_trash(trash_path: &Path) -> Result<()> {
    fs::write(trash_path.join("a.txt"), vec![b'a'; 4096])?;
    fs::write(trash_path.join("b.bin"), vec![b'b'; 8192])?;
    fs::create_dir(trash_path.join("folder"))?;
    fs::write(trash_path.join("folder").join("c.txt"), vec![b'c'; 4096])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn monitor_publishes_every_module() -> Result<()> {
    let trash_dir = tempfile::tempdir()?;
    fill_trash(trash_dir.path())?;

    let sampler = Sampler::new(Box::new(SteadyHost::new(trash_dir.path())), filter());
    let monitor = Monitor::start(sampler, Duration::from_secs(3600))?;
    let handle = monitor.handle();

    // Startup sample plus this one gives the rate based widgets two readings
    let state = handle.refresh_all().await?;

    assert_eq!(state.memory_used_bytes, 4_000_000_000);
    assert_eq!(state.memory_percent, 0.5);
    assert_eq!(state.storage_free_bytes, 125_000_000_000);
    assert_eq!(state.storage_used_percent, 0.75);
    assert!((state.cpu_load_percent - 50.0).abs() < 1e-9);
    assert_eq!(state.battery_percent, 15);
    assert_eq!(state.battery_state, BatteryState::Low);
    assert!(state.network_bytes_per_sec > 0.0);
    assert!(state.trash_accessible);
    assert!(matches!(state.trash_size, TrashSize::Bytes(bytes) if bytes > 0));

    assert_eq!(handle.snapshot(), state);

    let dashboard = DisplayState::new(&state, vec![]);
    assert!(!dashboard.show_permission_guide);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_trash_removes_files_and_folders() -> Result<()> {
    let trash_dir = tempfile::tempdir()?;
    fill_trash(trash_dir.path())?;

    let sampler = Sampler::new(Box::new(SteadyHost::new(trash_dir.path())), filter());
    let monitor = Monitor::start(sampler, Duration::from_secs(3600))?;
    let handle = monitor.handle();
    let mut receiver = handle.subscribe();

    let removed = handle.empty_trash().await?;
    assert_eq!(removed, 3);
    assert_eq!(fs::read_dir(trash_dir.path())?.count(), 0);

    receiver.changed().await?;
    assert_eq!(receiver.borrow().trash_size, TrashSize::Empty);

    // Nothing left to delete is not an error
    assert_eq!(handle.empty_trash().await?, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trash_permission_follows_denials() -> Result<()> {
    let trash_dir = tempfile::tempdir()?;

    let host = SteadyHost::new(trash_dir.path());
    let denied = host.trash_denied.clone();
    let sampler = Sampler::new(Box::new(host), filter());
    let monitor = Monitor::start(sampler, Duration::from_secs(3600))?;
    let handle = monitor.handle();

    assert!(handle.check_trash_permission().await?);

    denied.store(true, Ordering::SeqCst);
    assert!(!handle.check_trash_permission().await?);

    let state = handle.refresh_all().await?;
    assert!(!state.trash_accessible);
    assert_eq!(state.trash_size, TrashSize::NoAccess);
    assert!(DisplayState::new(&state, vec![]).show_permission_guide);

    assert!(handle.empty_trash().await.is_err());

    denied.store(false, Ordering::SeqCst);
    let state = handle.refresh_all().await?;
    assert!(state.trash_accessible);
    assert_eq!(state.trash_size, TrashSize::Empty);

    Ok(())
}

#[test]
fn system_probe_sizes_the_trash_folder() -> Result<()> {
    let trash_dir = tempfile::tempdir()?;
    fill_trash(trash_dir.path())?;

    let mut sampler = Sampler::new(
        Box::new(SystemProbe::new(trash_dir.path().to_path_buf())),
        InterfaceFilter::default(),
    );
    let state = sampler.refresh_all().clone();

    assert!(state.trash_accessible);
    assert!(matches!(state.trash_size, TrashSize::Bytes(bytes) if bytes > 0));
    assert!(state.memory_total_bytes > 0);
    assert!((0.0..=1.0).contains(&state.memory_percent));

    let removed = sampler.empty_trash()?;
    assert_eq!(removed, 3);
    assert_eq!(sampler.state().trash_size, TrashSize::Empty);

    Ok(())
}

#[test]
fn missing_trash_folder_is_not_a_denial() -> Result<()> {
    let home = tempfile::tempdir()?;
    let trash_path = home.path().join("Trash").join("files");

    let mut sampler = Sampler::new(
        Box::new(SystemProbe::new(trash_path.clone())),
        InterfaceFilter::default(),
    );

    assert!(sampler.check_trash_permission());
    let state = sampler.refresh_all().clone();
    assert!(state.trash_accessible);
    assert_eq!(state.trash_size, TrashSize::Empty);
    assert!(!DisplayState::new(&state, vec![]).show_permission_guide);

    assert_eq!(sampler.empty_trash()?, 0);

    // Trashing the first file creates the folder
    fs::create_dir_all(&trash_path)?;
    fs::write(trash_path.join("first.txt"), vec![b'x'; 4096])?;
    assert!(matches!(sampler.refresh_all().trash_size, TrashSize::Bytes(bytes) if bytes > 0));

    Ok(())
}
