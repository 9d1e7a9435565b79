//! sdw-sim - replay a substream open/close cycle against a simulated bus
//!
//! Loads a YAML scenario, runs hw_params → prepare → release through the
//! stream coordinator and prints every transport call.
//!
//! ## Usage
//!
//! ```text
//! sdw-sim <scenario.yaml> [--config <coordinator.yaml>] [--endpoint <name>]
//! ```
//!
//! `--endpoint` replays the scenario on another CPU DAI role, e.g.
//! `--endpoint tx_codec_dma_tx2`.
//! Without `--config`, the coordinator config is read from
//! `~/.config/sdw/coordinator.yaml` (defaults if missing).
//! Set RUST_LOG=debug for lifecycle tracing.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use sdw_core::config::{default_config_path, load_config, CoordinatorConfig, CONFIG_FILENAME};
use sdw_core::sim::Scenario;
use sdw_core::EndpointId;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut args = std::env::args().skip(1);
    let mut scenario_path: Option<PathBuf> = None;
    let mut config_path = default_config_path(CONFIG_FILENAME);
    let mut endpoint: Option<EndpointId> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a path")?;
                config_path = PathBuf::from(path);
            }
            "--endpoint" => {
                let name = args.next().context("--endpoint requires a name")?;
                endpoint = Some(name.parse()?);
            }
            _ if scenario_path.is_none() => scenario_path = Some(PathBuf::from(arg)),
            other => bail!("unexpected argument: {}", other),
        }
    }

    let Some(scenario_path) = scenario_path else {
        bail!("usage: sdw-sim <scenario.yaml> [--config <coordinator.yaml>] [--endpoint <name>]");
    };

    let mut scenario = Scenario::load(&scenario_path)?;
    if let Some(endpoint) = endpoint {
        log::info!("sdw-sim: endpoint overridden to {}", endpoint);
        scenario.endpoint = endpoint;
    }
    let config: CoordinatorConfig = load_config(&config_path);

    let report = scenario.run(config);

    println!(
        "{} ({}) stream: {}",
        scenario.endpoint,
        scenario.direction,
        report
            .selected_stream
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    match &report.hw_params {
        Ok(()) => println!("hw_params: ok"),
        Err(e) => println!("hw_params: {} (errno {})", e, e.errno()),
    }
    for (i, result) in report.prepare_results.iter().enumerate() {
        match result {
            Ok(()) => println!("prepare #{}: ok", i + 1),
            Err(e) => println!("prepare #{}: {} (errno {})", i + 1, e, e.errno()),
        }
    }
    println!(
        "prepared: {} -> {} after release",
        report.prepared_before_release, report.prepared_after_release
    );
    println!();
    println!("transport calls:");
    for call in &report.calls {
        println!("  {:?}", call);
    }

    Ok(())
}
