use std::time::Instant;

use tracing::*;

use super::{
    cpu::CpuTicks,
    error::TrashError,
    network::InterfaceFilter,
    probe::HostProbe,
    types::{BatteryState, PublishedState, TrashSize},
};

/// Raw counters of the previous tick, needed to turn counters into rates.
#[derive(Debug, Default)]
struct RateSampleHistory {
    cpu: Option<CpuTicks>,
    network: Option<NetworkSample>,
}

#[derive(Debug, Clone, Copy)]
struct NetworkSample {
    received_bytes: u64,
    taken_at: Instant,
}

/// Reads host counters and keeps the published state up to date.
///
/// Every updater is fault contained: a failing OS query leaves its fields
/// untouched, except for the trash whose failure is published as
/// `trash_accessible = false`.
pub struct Sampler {
    probe: Box<dyn HostProbe>,
    interface_filter: InterfaceFilter,
    state: PublishedState,
    history: RateSampleHistory,
}

impl Sampler {
    pub fn new(probe: Box<dyn HostProbe>, interface_filter: InterfaceFilter) -> Self {
        Self {
            probe,
            interface_filter,
            state: PublishedState::default(),
            history: RateSampleHistory::default(),
        }
    }

    pub fn state(&self) -> &PublishedState {
        &self.state
    }

    pub fn set_interface_filter(&mut self, interface_filter: InterfaceFilter) {
        self.interface_filter = interface_filter;
    }

    /// Run one tick: every metric, in order.
    #[instrument(level = "trace", skip(self))]
    pub fn refresh_all(&mut self) -> &PublishedState {
        self.refresh_all_at(Instant::now())
    }

    fn refresh_all_at(&mut self, now: Instant) -> &PublishedState {
        self.update_memory();
        self.update_storage();
        self.update_cpu();
        self.update_battery();
        self.update_network(now);
        self.update_trash();

        &self.state
    }

    fn update_memory(&mut self) {
        let reading = match self.probe.memory() {
            Ok(reading) => reading,
            Err(error) => {
                debug!("Skipping memory update: {error}");
                return;
            }
        };

        if reading.total_bytes == 0 {
            debug!("Skipping memory update: total memory is zero");
            return;
        }

        self.state.memory_used_bytes = reading.used_bytes;
        self.state.memory_total_bytes = reading.total_bytes;
        self.state.memory_percent = reading.used_bytes as f64 / reading.total_bytes as f64;
    }

    fn update_storage(&mut self) {
        let reading = match self.probe.storage() {
            Ok(reading) => reading,
            Err(error) => {
                debug!("Skipping storage update: {error}");
                return;
            }
        };

        if reading.total_bytes == 0 {
            debug!("Skipping storage update: volume capacity is zero");
            return;
        }

        let used = reading.total_bytes.saturating_sub(reading.available_bytes);
        self.state.storage_free_bytes = reading.available_bytes;
        self.state.storage_used_percent = used as f64 / reading.total_bytes as f64;
    }

    fn update_cpu(&mut self) {
        let current = match self.probe.cpu_ticks() {
            Ok(ticks) => ticks,
            Err(error) => {
                debug!("Skipping CPU update: {error}");
                return;
            }
        };

        if let Some(previous) = &self.history.cpu {
            match current.load_since(previous) {
                Some(load) => self.state.cpu_load_percent = load,
                None => debug!(
                    "CPU core count changed from {} to {}, waiting for next sample",
                    previous.cores.len(),
                    current.cores.len()
                ),
            }
        }

        self.history.cpu = Some(current);
    }

    fn update_battery(&mut self) {
        let reading = match self.probe.power_source() {
            Ok(Some(reading)) => reading,
            Ok(None) => return,
            Err(error) => {
                debug!("Skipping battery update: {error}");
                return;
            }
        };

        if reading.max_capacity <= 0.0 {
            debug!("Skipping battery update: no maximum capacity reported");
            return;
        }

        let percent = (reading.current_capacity / reading.max_capacity * 100.0).clamp(0.0, 100.0) as u8;
        self.state.battery_percent = percent;
        self.state.battery_state = BatteryState::classify(percent, reading.is_charging);
    }

    fn update_network(&mut self, now: Instant) {
        let counters = match self.probe.interface_counters() {
            Ok(counters) => counters,
            Err(error) => {
                debug!("Skipping network update: {error}");
                return;
            }
        };

        let received_bytes = self.interface_filter.total_received(&counters);

        match self.history.network {
            Some(previous)
                if previous.received_bytes > 0 && received_bytes >= previous.received_bytes =>
            {
                let elapsed = now.saturating_duration_since(previous.taken_at).as_secs_f64();
                if elapsed > 0.0 {
                    self.state.network_bytes_per_sec =
                        (received_bytes - previous.received_bytes) as f64 / elapsed;
                }
            }
            _ => self.state.network_bytes_per_sec = 0.0,
        }

        self.history.network = Some(NetworkSample {
            received_bytes,
            taken_at: now,
        });
    }

    /// Size the trash, which doubles as the access check.
    #[instrument(level = "trace", skip(self))]
    pub fn update_trash(&mut self) {
        match self.probe.trash_entries() {
            Ok(entries) => {
                let total = entries
                    .iter()
                    .map(|entry| entry.allocated_bytes)
                    .fold(0u64, u64::saturating_add);
                self.set_trash_accessible(true);
                self.state.trash_size = TrashSize::from_total(total);
            }
            Err(error) => {
                if self.state.trash_accessible {
                    warn!("Trash is not accessible: {error}");
                }
                self.set_trash_accessible(false);
                self.state.trash_size = TrashSize::NoAccess;
            }
        }
    }

    /// Probe trash access without touching the published size.
    #[instrument(level = "debug", skip(self))]
    pub fn check_trash_permission(&mut self) -> bool {
        let accessible = self.probe.trash_entries().is_ok();
        self.set_trash_accessible(accessible);
        accessible
    }

    fn set_trash_accessible(&mut self, accessible: bool) {
        if self.state.trash_accessible != accessible {
            info!("Trash access changed: accessible = {accessible}");
        }
        self.state.trash_accessible = accessible;
    }

    /// Delete every trash entry in order, stopping at the first failure.
    ///
    /// Entries removed before a failure stay removed. The trash is sampled
    /// again only when everything was removed, otherwise the next tick
    /// picks up what is left.
    #[instrument(level = "debug", skip(self))]
    pub fn empty_trash(&mut self) -> Result<usize, TrashError> {
        let entries = self.probe.trash_entries().map_err(|error| {
            error!("Empty trash failed: {error}");
            TrashError::Listing(error)
        })?;

        for (removed, entry) in entries.iter().enumerate() {
            if let Err(source) = self.probe.remove_trash_entry(entry) {
                let error = TrashError::Removal {
                    path: entry.path.clone(),
                    removed,
                    source,
                };
                error!("Empty trash failed: {error}");
                return Err(error);
            }
        }

        info!("Emptied trash: {} entries removed", entries.len());
        self.update_trash();

        Ok(entries.len())
    }
}
