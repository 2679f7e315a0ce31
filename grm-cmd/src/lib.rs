//! Command implementations for the river monitor CLI.
//!
//! Provides subcommands for batch collection, one-shot climate queries,
//! and running the HTTP API server.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use grm_core::interval::Cadence;
use std::path::PathBuf;

pub mod climate;
pub mod collect;
pub mod config;
pub mod serve;

pub use config::GrmConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CadenceArg {
    /// Quarterly intervals, for long-running analysis
    ThreeMonths,
    /// 15-day intervals, for short spans
    FifteenDays,
}

impl From<CadenceArg> for Cadence {
    fn from(arg: CadenceArg) -> Self {
        match arg {
            CadenceArg::ThreeMonths => Cadence::THREE_MONTHS,
            CadenceArg::FifteenDays => Cadence::FIFTEEN_DAYS,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Collect imagery, water-index, and climate data over a date span to CSV
    Collect {
        /// First interval start (YYYY-MM-DD)
        #[arg(long, default_value = "2020-01-01")]
        start: NaiveDate,

        /// Span end; the last interval is clamped to it (YYYY-MM-DD)
        #[arg(long, default_value = "2023-12-31")]
        end: NaiveDate,

        /// Interval length
        #[arg(long, value_enum, default_value = "three-months")]
        cadence: CadenceArg,

        /// Path to a grm.toml configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Query averaged climate variables at a point around one date
    Climate {
        /// Latitude in degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long)]
        lon: f64,

        /// Center date (YYYY-MM-DD); the query widens it by one day each way
        #[arg(long)]
        date: NaiveDate,

        /// Path to a grm.toml configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run the HTTP API server
    Serve {
        /// Path to a grm.toml configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Collect {
            start,
            end,
            cadence,
            config,
        } => {
            let config = GrmConfig::load(config.as_deref())?;
            collect::run_collect(&config, start, end, cadence.into()).await
        }
        Command::Climate {
            lat,
            lon,
            date,
            config,
        } => {
            let config = GrmConfig::load(config.as_deref())?;
            climate::run_climate(&config, lat, lon, date).await
        }
        Command::Serve { config } => {
            let config = GrmConfig::load(config.as_deref())?;
            serve::run_serve(config).await
        }
    }
}
