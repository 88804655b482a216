use std::{io, path::PathBuf};

use directories::BaseDirs;
use sysinfo::{DiskExt, NetworkExt, NetworksExt, System, SystemExt};
use tracing::*;

use super::{
    cpu::{self, CpuTicks},
    error::ProbeError,
    network::InterfaceCounter,
    trash::{self, TrashEntry},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryReading {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerSourceReading {
    pub current_capacity: f64,
    pub max_capacity: f64,
    pub is_charging: bool,
}

/// Operating system counters the sampler reads on every tick.
pub trait HostProbe: Send {
    fn memory(&mut self) -> Result<MemoryReading, ProbeError>;

    /// Capacity of the volume holding the user's home directory.
    fn storage(&mut self) -> Result<StorageReading, ProbeError>;

    fn cpu_ticks(&mut self) -> Result<CpuTicks, ProbeError>;

    /// First power source, `None` on machines without one.
    fn power_source(&mut self) -> Result<Option<PowerSourceReading>, ProbeError>;

    fn interface_counters(&mut self) -> Result<Vec<InterfaceCounter>, ProbeError>;

    fn trash_entries(&mut self) -> io::Result<Vec<TrashEntry>>;

    fn remove_trash_entry(&mut self, entry: &TrashEntry) -> io::Result<()>;
}

/// Probe backed by the running host.
pub struct SystemProbe {
    system: System,
    home: Option<PathBuf>,
    trash_path: PathBuf,
    total_memory: Option<u64>,
}

impl SystemProbe {
    pub fn new(trash_path: PathBuf) -> Self {
        Self {
            system: System::new(),
            home: BaseDirs::new().map(|base_dirs| base_dirs.home_dir().to_path_buf()),
            trash_path,
            total_memory: None,
        }
    }

}

/// Resident page counts behind the "used memory" figure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VmPageCounts {
    pub active: u64,
    pub wired: u64,
}

impl VmPageCounts {
    /// Active plus wired pages, in bytes.
    pub fn used_bytes(&self, page_size: u64) -> u64 {
        self.active
            .saturating_add(self.wired)
            .saturating_mul(page_size)
    }
}

#[cfg(target_os = "macos")]
fn used_memory(_system: &System) -> Result<u64, ProbeError> {
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return Err(ProbeError::Query("Failed to read the page size".into()));
    }

    Ok(vm_page_counts()?.used_bytes(page_size as u64))
}

#[cfg(not(target_os = "macos"))]
fn used_memory(system: &System) -> Result<u64, ProbeError> {
    Ok(system.used_memory())
}

#[cfg(target_os = "macos")]
#[allow(deprecated)]
fn vm_page_counts() -> Result<VmPageCounts, ProbeError> {
    let mut stats: libc::vm_statistics64 = unsafe { std::mem::zeroed() };
    let mut count = (std::mem::size_of::<libc::vm_statistics64>()
        / std::mem::size_of::<libc::integer_t>())
        as libc::mach_msg_type_number_t;

    let result = unsafe {
        libc::host_statistics64(
            libc::mach_host_self(),
            libc::HOST_VM_INFO64,
            &mut stats as *mut libc::vm_statistics64 as libc::host_info64_t,
            &mut count,
        )
    };

    if result != libc::KERN_SUCCESS {
        return Err(ProbeError::Query(format!(
            "host_statistics64 returned {result}"
        )));
    }

    Ok(VmPageCounts {
        active: stats.active_count as u64,
        wired: stats.wire_count as u64,
    })
}

impl HostProbe for SystemProbe {
    fn memory(&mut self) -> Result<MemoryReading, ProbeError> {
        self.system.refresh_memory();

        // Physical memory does not change while we run
        let total_bytes = match self.total_memory {
            Some(total) => total,
            None => {
                let total = self.system.total_memory();
                if total == 0 {
                    return Err(ProbeError::Query("Physical memory size is zero".into()));
                }
                *self.total_memory.insert(total)
            }
        };

        Ok(MemoryReading {
            used_bytes: used_memory(&self.system)?,
            total_bytes,
        })
    }

    fn storage(&mut self) -> Result<StorageReading, ProbeError> {
        let Some(home) = self.home.as_deref() else {
            return Err(ProbeError::Query("Failed to find home directory".into()));
        };

        self.system.refresh_disks_list();

        let home_disk = self
            .system
            .disks()
            .iter()
            .filter(|disk| home.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| ProbeError::Query(format!("No volume mounted for {home:?}")))?;

        Ok(StorageReading {
            total_bytes: home_disk.total_space(),
            available_bytes: home_disk.available_space(),
        })
    }

    fn cpu_ticks(&mut self) -> Result<CpuTicks, ProbeError> {
        cpu::read_cpu_ticks()
    }

    fn power_source(&mut self) -> Result<Option<PowerSourceReading>, ProbeError> {
        use battery::units::energy::watt_hour;

        let manager = battery::Manager::new()
            .map_err(|error| ProbeError::Query(format!("Power sources: {error}")))?;
        let mut batteries = manager
            .batteries()
            .map_err(|error| ProbeError::Query(format!("Power sources: {error}")))?;

        let Some(source) = batteries.next() else {
            return Ok(None);
        };
        let source =
            source.map_err(|error| ProbeError::Query(format!("Power source: {error}")))?;

        Ok(Some(PowerSourceReading {
            current_capacity: source.energy().get::<watt_hour>() as f64,
            max_capacity: source.energy_full().get::<watt_hour>() as f64,
            is_charging: source.state() == battery::State::Charging,
        }))
    }

    fn interface_counters(&mut self) -> Result<Vec<InterfaceCounter>, ProbeError> {
        self.system.refresh_networks_list();
        self.system.refresh_networks();

        Ok(self
            .system
            .networks()
            .iter()
            .map(|(name, data)| InterfaceCounter {
                name: name.clone(),
                received_bytes: data.total_received(),
            })
            .collect())
    }

    fn trash_entries(&mut self) -> io::Result<Vec<TrashEntry>> {
        trash::list_entries(&self.trash_path)
    }

    #[instrument(level = "debug", skip(self))]
    fn remove_trash_entry(&mut self, entry: &TrashEntry) -> io::Result<()> {
        trash::remove_entry(entry)
    }
}
