//                              _
// __      ____ ___   _____ ___(_)_ __ ___
// \ \ /\ / / _` \ \ / / _ / __| | '_ ` _ \
//  \ V  V / (_| |\ V /  __\__ \ | | | | | |
//   \_/\_/ \__,_| \_/ \___|___/_|_| |_| |_|

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use wavesim::channel::{ChannelId, ScheduleMode, CCH_NUMBER, SCH_NUMBERS};
use wavesim::metrics::{self, MetricsSnapshot};
use wavesim::network::DataRate;
use wavesim::simulation::{ScenarioConfig, Simulation};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args, Debug, Clone)]
struct ScenarioArgs {
    /// JSON file with a (partial) scenario; flags below override it
    #[arg(short, long)]
    config: Option<String>,
    #[arg(short = 'n', long)]
    nodes: Option<u32>,
    #[arg(short, long)]
    stop: Option<f64>,
    #[arg(short, long)]
    mode: Option<ScheduleMode>,
    #[arg(long)]
    channel: Option<ChannelId>,
    #[arg(long)]
    immediate: bool,
    /// Skip the control channel probe send
    #[arg(long)]
    no_probe: bool,
    #[arg(long)]
    results: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long)]
        no_save: bool,
    },

    Sweep {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(short, long, default_value_t = 8)]
        repetitions: u64,
        #[arg(long, default_value_t = 1)]
        first_seed: u64,
    },

    List,
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { scenario, seed, no_save } => {
            let config = build_config(&scenario)?.with_seed(seed);
            run_single_simulation(config, !no_save)?;
        }

        Commands::Sweep { scenario, repetitions, first_seed } => {
            let config = build_config(&scenario)?;
            sweep_seeds(config, repetitions, first_seed)?;
        }

        Commands::List => {
            println!("\nChannels");
            println!("  - CCH  ({})", CCH_NUMBER);
            for (i, number) in SCH_NUMBERS.iter().enumerate() {
                println!("  - SCH{} ({})", i + 1, number);
            }

            println!("\nSchedule modes");
            for mode in ScheduleMode::ALL {
                println!("  - {}", mode);
            }

            println!("\nData rates");
            for rate in DataRate::ALL {
                println!("  - {}", rate);
            }

            println!("\nUsage: wavesim run --mode extended-alternating --channel SCH1\n");
        }
    }

    let total_time = program_start.elapsed();
    info!("Total runtime: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

fn build_config(args: &ScenarioArgs) -> Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_json_file(path)?,
        None => ScenarioConfig::default(),
    };

    if let Some(nodes) = args.nodes {
        config.num_nodes = nodes;
    }
    if let Some(stop) = args.stop {
        config.stop_at_s = stop;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(channel) = args.channel {
        config.service_channel = channel;
    }
    if args.immediate {
        config.immediate_switch = true;
    }
    if args.no_probe {
        config.control_probe = None;
    }
    if let Some(results) = &args.results {
        config.results_dir = results.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run_single_simulation(config: ScenarioConfig, save: bool) -> Result<()> {
    info!("wavesim: Single Run");

    let mut sim = Simulation::new(config);
    let report = sim.run()?;

    if save {
        sim.save_results(&report)?;
    }

    summary_table(&[(format!("seed {}", report.seed), report.metrics)]);
    Ok(())
}

fn sweep_seeds(config: ScenarioConfig, repetitions: u64, first_seed: u64) -> Result<()> {
    if repetitions == 0 {
        anyhow::bail!("Need at least one repetition");
    }

    info!("wavesim: Seed Sweep");
    info!("Scenario: {} ({} nodes, {})", config.name, config.num_nodes, config.mode);
    info!("Repetitions: {}", repetitions);

    let pb = ProgressBar::new(repetitions);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} runs {msg}")?
            .progress_chars("█▓░"),
    );

    let rows: Vec<(String, MetricsSnapshot)> = (first_seed..first_seed + repetitions)
        .into_par_iter()
        .map(|seed| -> Result<(String, MetricsSnapshot)> {
            let mut sim = Simulation::new(config.clone().with_seed(seed));
            let report = sim.run()?;
            pb.inc(1);
            Ok((format!("seed {}", seed), report.metrics))
        })
        .collect::<Result<_>>()?;

    pb.finish_with_message("Sweep complete");

    let snapshots: Vec<MetricsSnapshot> = rows.iter().map(|(_, s)| s.clone()).collect();
    let mut table = rows;
    table.push(("average".to_string(), metrics::average(&snapshots)));
    summary_table(&table);

    Ok(())
}

fn summary_table(rows: &[(String, MetricsSnapshot)]) {
    println!("\n╔═══════════════╦═══════════╦═══════════╦═══════════╦═══════════╦═════════════╗");
    println!("║ Run           ║ Attempts  ║ Dispatched║ Deferred  ║ Received  ║ Latency (ms)║");
    println!("╠═══════════════╬═══════════╬═══════════╬═══════════╬═══════════╬═════════════╣");

    for (label, snapshot) in rows {
        println!(
            "║ {:<13} ║ {:>9} ║ {:>9} ║ {:>9} ║ {:>9} ║ {:>11.4} ║",
            label,
            snapshot.dispatch_attempts,
            snapshot.dispatched,
            snapshot.deferred,
            snapshot.received,
            snapshot.avg_latency_ms,
        );
    }

    println!("╚═══════════════╩═══════════╩═══════════╩═══════════╩═══════════╩═════════════╝\n");
}
