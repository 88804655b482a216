use std::{
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use tokio::sync::{oneshot, watch};
use tracing::*;

use super::{
    error::TrashError, network::InterfaceFilter, sampler::Sampler, types::PublishedState,
};

enum Command {
    Refresh(oneshot::Sender<PublishedState>),
    EmptyTrash(oneshot::Sender<Result<usize, TrashError>>),
    CheckPermission(oneshot::Sender<bool>),
    SetInterfaceFilter(InterfaceFilter),
    Stop,
}

/// Cheap handle to a running [`Monitor`].
///
/// All requests run on the sampler thread, between ticks.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PublishedState>,
}

impl MonitorHandle {
    pub fn snapshot(&self) -> PublishedState {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever a tick changes the published state.
    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.state.clone()
    }

    pub async fn refresh_all(&self) -> Result<PublishedState> {
        let (sender, receiver) = oneshot::channel();
        self.send(Command::Refresh(sender))?;
        receiver.await.context("Sampler thread dropped the refresh request")
    }

    pub async fn empty_trash(&self) -> Result<usize> {
        let (sender, receiver) = oneshot::channel();
        self.send(Command::EmptyTrash(sender))?;
        let removed = receiver
            .await
            .context("Sampler thread dropped the empty trash request")??;
        Ok(removed)
    }

    pub async fn check_trash_permission(&self) -> Result<bool> {
        let (sender, receiver) = oneshot::channel();
        self.send(Command::CheckPermission(sender))?;
        receiver
            .await
            .context("Sampler thread dropped the permission request")
    }

    pub fn set_interface_filter(&self, interface_filter: InterfaceFilter) -> Result<()> {
        self.send(Command::SetInterfaceFilter(interface_filter))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Sampler thread is not running"))
    }
}

/// Owns the sampler thread: one tick per interval, never overlapping.
pub struct Monitor {
    handle: MonitorHandle,
    thread: Option<JoinHandle<()>>,
}

impl Monitor {
    #[instrument(level = "debug", skip(sampler))]
    pub fn start(sampler: Sampler, interval: Duration) -> Result<Self> {
        let (command_sender, command_receiver) = mpsc::channel();
        let (state_sender, state_receiver) = watch::channel(sampler.state().clone());

        let thread = std::thread::Builder::new()
            .name("HostSampler".into())
            .spawn(move || polling_loop(sampler, interval, command_receiver, state_sender))
            .context("Failed to spawn HostSampler thread")?;

        Ok(Self {
            handle: MonitorHandle {
                commands: command_sender,
                state: state_receiver,
            },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        let _ = self.handle.commands.send(Command::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("HostSampler thread panicked");
            }
        }
    }
}

fn publish(state: &watch::Sender<PublishedState>, new_state: &PublishedState) {
    state.send_if_modified(|current| {
        if current == new_state {
            return false;
        }
        *current = new_state.clone();
        true
    });
}

fn polling_loop(
    mut sampler: Sampler,
    interval: Duration,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<PublishedState>,
) {
    debug!("Starting host sampler with {interval:?} interval");

    sampler.check_trash_permission();
    publish(&state, sampler.refresh_all());

    let mut next_tick = Instant::now() + interval;
    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());

        match commands.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                publish(&state, sampler.refresh_all());

                let now = Instant::now();
                next_tick += interval;
                if next_tick <= now {
                    trace!("Tick overran the interval, delaying the next one");
                    next_tick = now + interval;
                }
            }
            Ok(Command::Refresh(reply)) => {
                let new_state = sampler.refresh_all().clone();
                publish(&state, &new_state);
                let _ = reply.send(new_state);
            }
            Ok(Command::EmptyTrash(reply)) => {
                let result = sampler.empty_trash();
                publish(&state, sampler.state());
                let _ = reply.send(result);
            }
            Ok(Command::CheckPermission(reply)) => {
                let accessible = sampler.check_trash_permission();
                publish(&state, sampler.state());
                let _ = reply.send(accessible);
            }
            Ok(Command::SetInterfaceFilter(interface_filter)) => {
                debug!("Using network interfaces: {interface_filter:?}");
                sampler.set_interface_filter(interface_filter);
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Host sampler stopped");
}

lazy_static! {
    static ref MANAGER: Arc<Mutex<Option<Monitor>>> = Default::default();
}

// Start the sampler thread, should be done inside main
#[instrument(level = "debug", skip(sampler))]
pub fn init(sampler: Sampler, interval: Duration) -> Result<()> {
    let monitor = Monitor::start(sampler, interval)?;
    let previous = MANAGER
        .lock()
        .map_err(|_| anyhow!("Monitor manager lock poisoned"))?
        .replace(monitor);

    // Joined outside of the lock
    drop(previous);

    Ok(())
}

pub fn stop() {
    let monitor = match MANAGER.lock() {
        Ok(mut manager) => manager.take(),
        Err(_) => return,
    };
    drop(monitor);
}

pub fn handle() -> Result<MonitorHandle> {
    MANAGER
        .lock()
        .map_err(|_| anyhow!("Monitor manager lock poisoned"))?
        .as_ref()
        .map(Monitor::handle)
        .ok_or_else(|| anyhow!("Monitor manager not initialized"))
}

pub fn snapshot() -> Result<PublishedState> {
    Ok(handle()?.snapshot())
}

pub fn subscribe() -> Result<watch::Receiver<PublishedState>> {
    Ok(handle()?.subscribe())
}

#[instrument(level = "debug")]
pub async fn refresh_all() -> Result<PublishedState> {
    handle()?.refresh_all().await
}

#[instrument(level = "debug")]
pub async fn empty_trash() -> Result<usize> {
    handle()?.empty_trash().await
}

#[instrument(level = "debug")]
pub async fn check_trash_permission() -> Result<bool> {
    handle()?.check_trash_permission().await
}

pub fn set_interface_filter(interface_filter: InterfaceFilter) -> Result<()> {
    handle()?.set_interface_filter(interface_filter)
}
