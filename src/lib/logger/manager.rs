use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use ringbuffer::{AllocRingBuffer, RingBuffer};
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{metadata::LevelFilter, *};
use tracing_log::LogTracer;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    filter::Directive,
    EnvFilter, Layer,
};

use crate::cli;

struct HistoryWriter {
    history: Arc<Mutex<History>>,
}

impl Write for HistoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let message = String::from_utf8_lossy(buf).to_string();
        if let Ok(mut history) = self.history.lock() {
            history.push(message);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct HistoryMakeWriter {
    history: Arc<Mutex<History>>,
}

impl<'a> MakeWriter<'a> for HistoryMakeWriter {
    type Writer = HistoryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        HistoryWriter {
            history: self.history.clone(),
        }
    }
}

/// Last log lines, replayed to new `/log` subscribers before live ones.
pub struct History {
    pub history: AllocRingBuffer<String>,
    pub sender: Sender<String>,
}

impl Default for History {
    fn default() -> Self {
        let (sender, _receiver) = tokio::sync::broadcast::channel(100);
        Self {
            history: AllocRingBuffer::new(10 * 1024),
            sender,
        }
    }
}

impl History {
    pub fn push(&mut self, message: String) {
        self.history.push(message.clone());
        let _ = self.sender.send(message);
    }

    pub fn subscribe(&self) -> (Receiver<String>, Vec<String>) {
        let reader = self.sender.subscribe();
        (reader, self.history.to_vec())
    }
}

lazy_static! {
    pub static ref HISTORY: Arc<Mutex<History>> = Default::default();
}

// Start logger, should be done inside main
pub fn init() -> Result<()> {
    // Redirect all logs from libs using "Log"
    LogTracer::init_with_filter(tracing::log::LevelFilter::Trace)
        .context("Failed to set logger")?;

    // Configure the console log
    let console_env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli::manager::is_verbose() {
            EnvFilter::new(LevelFilter::DEBUG.to_string())
        } else {
            EnvFilter::new(LevelFilter::INFO.to_string())
        }
    });

    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(fmt::format::FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_filter(filter_unwanted_crates(console_env_filter));

    // Configure the file log
    let file_env_filter = if cli::manager::is_tracing() {
        EnvFilter::new(LevelFilter::TRACE.to_string())
    } else {
        EnvFilter::new(LevelFilter::DEBUG.to_string())
    };
    let dir = cli::manager::log_path();
    let file_appender = tracing_appender::rolling::hourly(dir, "host-dashboard.log");
    let file_layer = fmt::Layer::new()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(fmt::format::FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_filter(filter_unwanted_crates(file_env_filter));

    // Configure the server log
    let server_env_filter = if cli::manager::is_tracing() {
        EnvFilter::new(LevelFilter::TRACE.to_string())
    } else {
        EnvFilter::new(LevelFilter::DEBUG.to_string())
    };
    let server_layer = fmt::Layer::new()
        .with_writer(HistoryMakeWriter {
            history: HISTORY.clone(),
        })
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(fmt::format::FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_filter(filter_unwanted_crates(server_env_filter));

    let subscriber = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(server_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Unable to set a global subscriber")?;

    info!(
        "{}, version: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );
    info!(
        "Starting at {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
    );
    debug!("Command line call: {}", cli::manager::command_line_string());
    debug!(
        "Command line input struct call: {}",
        cli::manager::command_line()
    );

    Ok(())
}

fn filter_unwanted_crates(env_filter: EnvFilter) -> EnvFilter {
    // Network and HTTP internals are pretty verbose when they are on
    ["mio=off", "actix_server=warn", "actix_http=warn", "h2=off"]
        .into_iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(env_filter, |env_filter, directive| {
            env_filter.add_directive(directive)
        })
}
