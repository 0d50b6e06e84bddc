#![allow(dead_code)]

mod cli;
mod config;
mod error;
mod network;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use config::SwitchConfig;
use error::Result;
use network::{
    device::switch::Switch,
    link::{raw::RawLink, LinkTransport},
};


fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_thread_names(true)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "switch stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let link = Arc::new(RawLink::open(&cli.interfaces, cli.mac)?);
    for port in 0..link.port_count() {
        info!(port, name = %link.port_name(port), "port up");
    }

    let path = SwitchConfig::path_for(&cli.config_dir, &cli.switch_id);
    let config = SwitchConfig::load(&path, link.port_count())?;
    for (port, mode) in config.ports.iter().enumerate() {
        info!(port, %mode, "port configured");
    }

    let mut switch = Switch::new(&config, link.own_mac()).with_trunk_policy(cli.trunk_policy);
    let _hello = switch.spawn_hello_task(link.clone())?;

    switch.run(link.as_ref())
}
