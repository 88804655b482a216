use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::json;
use tracing::*;

use host_dashboard::{
    cli, logger,
    monitor::{manager as monitor_manager, trash, DisplayState, Sampler, SystemProbe},
    server, settings,
};

#[actix_web::main]
async fn main() -> Result<()> {
    cli::manager::init();
    logger::manager::init()?;
    settings::manager::init(
        Some(&cli::manager::settings_file()),
        cli::manager::is_reset(),
    );
    server::pages::init();

    let trash_path = cli::manager::trash_path()
        .or_else(settings::manager::trash_path)
        .or_else(trash::default_trash_path)
        .ok_or_else(|| anyhow!("Failed to find the trash folder"))?;
    info!("Watching trash at {trash_path:?}");

    let sampler = Sampler::new(
        Box::new(SystemProbe::new(trash_path)),
        settings::manager::network_interfaces(),
    );

    if cli::manager::is_once() {
        return print_once(sampler, cli::manager::sample_interval());
    }

    monitor_manager::init(sampler, cli::manager::sample_interval())?;

    if cli::manager::is_server_enabled() {
        server::manager::run(&cli::manager::server_address()).await?;
    } else {
        tokio::signal::ctrl_c().await?;
    }

    info!("Shutting down");
    monitor_manager::stop();

    Ok(())
}

/// Two samples one interval apart, so rates are meaningful, then print
fn print_once(mut sampler: Sampler, interval: Duration) -> Result<()> {
    sampler.refresh_all();
    std::thread::sleep(interval);
    let state = sampler.refresh_all().clone();

    let dashboard = DisplayState::new(&state, settings::manager::modules().enabled());
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "stats": state,
            "dashboard": dashboard,
        }))?
    );

    Ok(())
}
