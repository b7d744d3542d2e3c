//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_cashflow_dir;
use crate::output;
use cashflow_core::config::Config;
use cashflow_core::DEMO_DB_FILE;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let cashflow_dir = get_cashflow_dir()?;
    std::fs::create_dir_all(&cashflow_dir)?;
    let mut config = Config::load(&cashflow_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&cashflow_dir)?;
            output::success("Demo mode enabled");
            println!("Demo data is kept in {}. Run 'cf list' to see it.", DEMO_DB_FILE);
            Ok(())
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&cashflow_dir)?; // Demo data stays on disk
            output::warning("Demo mode disabled");
            output::info(&format!("Using {}", config.api_base_url));
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
                println!("Backend: {}", config.api_base_url);
            }
            Ok(())
        }
    }
}
