//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::network::{device::switch::TrunkPolicy, ethernet::MacAddress};

#[derive(Parser, Debug)]
#[command(name = "soft-switch")]
#[command(version, about = "Software Ethernet switch with VLANs and spanning tree", long_about = None)]
pub struct Cli {
    /// Switch identity; selects `<config-dir>/switch<ID>.cfg`
    #[arg(value_name = "ID")]
    pub switch_id: String,

    /// Host interfaces to use as ports, in port order
    #[arg(value_name = "INTERFACE", required = true)]
    pub interfaces: Vec<String>,

    /// Directory holding the per-switch configuration files
    #[arg(short, long, value_name = "DIR", default_value = "configs")]
    pub config_dir: PathBuf,

    /// Handling of tagged frames crossing between trunk ports
    #[arg(short, long, value_enum, default_value_t = TrunkPolicy::Preserve)]
    pub trunk_policy: TrunkPolicy,

    /// Override the switch MAC address (aa:bb:cc:dd:ee:ff)
    #[arg(short, long)]
    pub mac: Option<MacAddress>,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
