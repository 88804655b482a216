//! Per-core processor time counters and the load computed from two of them.
//!
//! Counters are cumulative ticks spent in each state since boot. A single
//! reading says nothing about the current load, two consecutive readings do.

use super::error::ProbeError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreTicks {
    pub user: u64,
    pub system: u64,
    pub nice: u64,
    pub idle: u64,
}

/// One reading of every core, owned by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub cores: Vec<CoreTicks>,
}

impl CpuTicks {
    pub fn new(cores: Vec<CoreTicks>) -> Self {
        Self { cores }
    }

    /// Average busy percentage across cores between `previous` and `self`.
    ///
    /// Returns `None` when the two readings cannot be compared.
    pub fn load_since(&self, previous: &CpuTicks) -> Option<f64> {
        if self.cores.is_empty() || self.cores.len() != previous.cores.len() {
            return None;
        }

        let usage: f64 = self
            .cores
            .iter()
            .zip(previous.cores.iter())
            .filter_map(|(current, previous)| {
                let in_use = current.user.saturating_sub(previous.user)
                    + current.system.saturating_sub(previous.system)
                    + current.nice.saturating_sub(previous.nice);
                let total = in_use + current.idle.saturating_sub(previous.idle);

                (total > 0).then(|| in_use as f64 / total as f64)
            })
            .sum();

        let average = usage / self.cores.len() as f64;
        Some((average * 100.0).clamp(0.0, 100.0))
    }
}

/// Parse the per-core `cpuN` lines of `/proc/stat`.
///
/// Columns after the label are `user nice system idle iowait ...`.
pub fn parse_proc_stat(content: &str) -> Result<CpuTicks, ProbeError> {
    let cores = content
        .lines()
        .filter(|line| {
            line.strip_prefix("cpu")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .map(|line| {
            let values: Vec<u64> = line
                .split_whitespace()
                .skip(1)
                .take(4)
                .map(|value| value.parse::<u64>())
                .collect::<Result<_, _>>()
                .map_err(|error| ProbeError::Query(format!("Bad /proc/stat line {line:?}: {error}")))?;

            let [user, nice, system, idle] = values[..] else {
                return Err(ProbeError::Query(format!(
                    "Short /proc/stat line: {line:?}"
                )));
            };

            Ok(CoreTicks {
                user,
                system,
                nice,
                idle,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if cores.is_empty() {
        return Err(ProbeError::Query("No per-core lines in /proc/stat".into()));
    }

    Ok(CpuTicks::new(cores))
}

#[cfg(target_os = "linux")]
pub fn read_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    let content = std::fs::read_to_string("/proc/stat")?;
    parse_proc_stat(&content)
}

#[cfg(target_os = "macos")]
pub fn read_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    let info = macos::ProcessorLoadInfo::acquire()?;
    Ok(info.ticks())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn read_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    Err(ProbeError::Unsupported("per-core processor ticks"))
}

#[cfg(target_os = "macos")]
#[allow(deprecated)]
mod macos {
    use super::{CoreTicks, CpuTicks, ProbeError};

    /// Kernel-allocated `PROCESSOR_CPU_LOAD_INFO` array, released on drop.
    pub struct ProcessorLoadInfo {
        info: libc::processor_info_array_t,
        info_count: libc::mach_msg_type_number_t,
        cpu_count: libc::natural_t,
    }

    impl ProcessorLoadInfo {
        pub fn acquire() -> Result<Self, ProbeError> {
            let mut cpu_count: libc::natural_t = 0;
            let mut info: libc::processor_info_array_t = std::ptr::null_mut();
            let mut info_count: libc::mach_msg_type_number_t = 0;

            let result = unsafe {
                libc::host_processor_info(
                    libc::mach_host_self(),
                    libc::PROCESSOR_CPU_LOAD_INFO,
                    &mut cpu_count,
                    &mut info,
                    &mut info_count,
                )
            };

            if result != libc::KERN_SUCCESS || info.is_null() {
                return Err(ProbeError::Query(format!(
                    "host_processor_info returned {result}"
                )));
            }

            Ok(Self {
                info,
                info_count,
                cpu_count,
            })
        }

        pub fn ticks(&self) -> CpuTicks {
            let states = libc::CPU_STATE_MAX as usize;
            let values = unsafe {
                std::slice::from_raw_parts(self.info, self.info_count as usize)
            };

            let cores = (0..self.cpu_count as usize)
                .filter_map(|core| values.get(core * states..(core + 1) * states))
                .map(|state| CoreTicks {
                    user: state[libc::CPU_STATE_USER as usize] as u32 as u64,
                    system: state[libc::CPU_STATE_SYSTEM as usize] as u32 as u64,
                    nice: state[libc::CPU_STATE_NICE as usize] as u32 as u64,
                    idle: state[libc::CPU_STATE_IDLE as usize] as u32 as u64,
                })
                .collect();

            CpuTicks::new(cores)
        }
    }

    impl Drop for ProcessorLoadInfo {
        fn drop(&mut self) {
            let size = self.info_count as usize * std::mem::size_of::<libc::integer_t>();
            unsafe {
                libc::vm_deallocate(
                    libc::mach_task_self(),
                    self.info as libc::vm_address_t,
                    size as libc::vm_size_t,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(user: u64, system: u64, nice: u64, idle: u64) -> CoreTicks {
        CoreTicks {
            user,
            system,
            nice,
            idle,
        }
    }

    #[test]
    fn test_parse_proc_stat() {
        let content = "cpu  700 20 300 9000 10 0 5 0 0 0\n\
                       cpu0 400 10 200 4000 5 0 3 0 0 0\n\
                       cpu1 300 10 100 5000 5 0 2 0 0 0\n\
                       intr 12345 0 0\n\
                       cpufreq 1\n";
        let ticks = parse_proc_stat(content).unwrap();
        assert_eq!(
            ticks.cores,
            vec![core(400, 200, 10, 4000), core(300, 100, 10, 5000)]
        );
    }

    #[test]
    fn test_parse_proc_stat_without_cores() {
        assert!(parse_proc_stat("cpu  1 2 3 4\n").is_err());
        assert!(parse_proc_stat("cpu0 1 2\n").is_err());
    }

    #[test]
    fn test_load_since_averages_cores() {
        let previous = CpuTicks::new(vec![core(100, 100, 0, 800), core(0, 0, 0, 1000)]);
        // core0: 50 busy of 100, core1: 100 busy of 100
        let current = CpuTicks::new(vec![core(130, 120, 0, 850), core(100, 0, 0, 1000)]);
        let load = current.load_since(&previous).unwrap();
        assert!((load - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_core_contributes_nothing() {
        let previous = CpuTicks::new(vec![core(10, 10, 10, 10), core(10, 10, 10, 10)]);
        let current = CpuTicks::new(vec![core(20, 10, 10, 10), core(10, 10, 10, 10)]);
        // core0 fully busy, core1 no ticks at all
        assert_eq!(current.load_since(&previous), Some(50.0));
    }

    #[test]
    fn test_no_change_is_zero_load() {
        let ticks = CpuTicks::new(vec![core(1, 2, 3, 4)]);
        assert_eq!(ticks.load_since(&ticks), Some(0.0));
    }

    #[test]
    fn test_counter_going_backwards_is_bounded() {
        let previous = CpuTicks::new(vec![core(500, 500, 0, 500)]);
        let current = CpuTicks::new(vec![core(10, 10, 0, 600)]);
        assert_eq!(current.load_since(&previous), Some(0.0));
    }

    #[test]
    fn test_core_count_change_is_not_comparable() {
        let previous = CpuTicks::new(vec![core(1, 1, 1, 1)]);
        let current = CpuTicks::new(vec![core(2, 2, 2, 2), core(2, 2, 2, 2)]);
        assert_eq!(current.load_since(&previous), None);
    }
}
