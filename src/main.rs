//! CLI Entry Point for touch_daq
//!
//! Thin ingest glue around the library: it feeds frames into a `ChannelStore`
//! and prints detected touches. Plotting, export and synthetic data live elsewhere.
//!
//! # Usage
//!
//! Replay recorded frames (`t v0 v1 .. v7` per line) and print touches as JSON:
//! ```bash
//! touch_daq replay --every 5 < capture.txt
//! ```
//!
//! Print the effective configuration:
//! ```bash
//! touch_daq show-config --config config/touch_daq.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use touch_daq::config::{SessionConfig, DEFAULT_CONFIG_PATH};
use touch_daq::touch::topology::{RowColumnGrid, TopologyKind};
use touch_daq::{tracing_setup, ChannelStore, TouchDetector, CHANNEL_COUNT};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "touch_daq")]
#[command(about = "Multi-channel touch sensing: buffering and touch detection", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read frames from stdin and print detected touches as JSON lines
    Replay {
        /// Run a detection pass every N frames
        #[arg(long, default_value = "1")]
        every: usize,

        /// Print grid crosspoints instead of raw touches (grid topology only)
        #[arg(long)]
        crosspoints: bool,
    },

    /// Print the effective configuration as JSON
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SessionConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    config.validate().context("Invalid configuration")?;
    tracing_setup::init_from_config(&config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Replay { every, crosspoints } => replay(&config, every.max(1), crosspoints),
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn replay(config: &SessionConfig, every: usize, crosspoints: bool) -> Result<()> {
    let store = ChannelStore::new(config.store.capacity)?;
    let topology_kind = config.detector.topology;
    let detector = TouchDetector::with_topology(config.detector_config()?, topology_kind.build());
    let grid = RowColumnGrid;

    info!(
        capacity = store.capacity(),
        topology = ?topology_kind,
        every,
        "Replaying frames from stdin"
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut frames = 0usize;
    let mut touches = 0usize;

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((timestamp, values)) = parse_frame(trimmed) else {
            warn!(line = line_no + 1, "Skipping malformed frame");
            continue;
        };

        for (channel, err) in store.append_frame(timestamp, &values) {
            warn!(line = line_no + 1, channel, error = %err, "Sample rejected");
        }
        frames += 1;

        if frames % every == 0 {
            let events = detector.detect(&store.snapshot());
            touches += events.len();
            if crosspoints && topology_kind == TopologyKind::Grid {
                for point in grid.crosspoints(&events) {
                    writeln!(out, "{}", serde_json::to_string(&point)?)?;
                }
            } else {
                for event in &events {
                    writeln!(out, "{}", serde_json::to_string(event)?)?;
                }
            }
        }
    }

    info!(frames, touches, stats = ?store.stats(), "Replay finished");
    Ok(())
}

fn parse_frame(line: &str) -> Option<(f64, [f64; CHANNEL_COUNT])> {
    let mut fields = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .map(str::parse::<f64>);

    let timestamp = fields.next()?.ok()?;
    let mut values = [0.0; CHANNEL_COUNT];
    for value in &mut values {
        *value = fields.next()?.ok()?;
    }
    if fields.next().is_some() {
        return None;
    }
    Some((timestamp, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_whitespace_and_commas() {
        let (t, values) = parse_frame("0.5 0.1 0.2, 0.3 0.4 0.5 0.6 0.7 0.8").unwrap();
        assert_eq!(t, 0.5);
        assert_eq!(values[7], 0.8);
    }

    #[test]
    fn test_parse_frame_rejects_wrong_arity() {
        assert!(parse_frame("0.5 0.1 0.2").is_none());
        assert!(parse_frame("0.5 1 2 3 4 5 6 7 8 9").is_none());
        assert!(parse_frame("t 1 2 3 4 5 6 7 8").is_none());
    }
}
