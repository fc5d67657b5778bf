use anyhow::Context;
use clap::{Parser, Subcommand};
use gridworld_common::{GRID_MAX, GRID_MIN, ObjectKind};
use gridworld_input::PadButton;
use gridworld_kernel::ObjectMap;
use gridworld_render::{RenderView, Renderer, TextRenderer};
use gridworld_session::{Scenario, ScriptRunner, Simulation, Step, load_config};
use gridworld_timeline::Snapshot;
use gridworld_tools::{WorldInspector, WorldSummary};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridworld-cli", about = "Grid-world robot simulation with time travel")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Simulation config (YAML); overrides any config embedded in a scenario
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective simulation config
    Info,
    /// Run the built-in fetch-and-rewind demo
    Demo {
        /// List every object under each map
        #[arg(short, long)]
        list: bool,
    },
    /// Run a YAML scenario and print the final state
    Run {
        /// Scenario file
        scenario: PathBuf,
        /// Dump the final world and full temporal record as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    summary: WorldSummary,
    objects: &'a ObjectMap,
    record: &'a [Snapshot],
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Some(
            load_config(path).with_context(|| format!("loading config {}", path.display()))?,
        ),
        None => None,
    };

    match cli.command {
        Commands::Info => {
            println!("gridworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("grid: x, z in [{GRID_MIN}, {GRID_MAX}]");
            print!("{}", serde_yaml::to_string(&config.unwrap_or_default())?);
        }
        Commands::Demo { list } => {
            let mut runner = ScriptRunner::new(config.unwrap_or_default())?;
            let view = RenderView {
                list_objects: list,
                ..RenderView::default()
            };
            for (title, steps) in demo_phases() {
                runner.run(&steps)?;
                if runner.simulation().record().pending_resume().is_some() {
                    runner.run(&[Step::Confirm, Step::Tick { ms: 16, times: 12 }])?;
                }
                println!("--- {title} ---");
                print_state(runner.simulation(), &view);
            }
        }
        Commands::Run { scenario, json } => {
            let mut loaded = Scenario::load(&scenario)
                .with_context(|| format!("loading scenario {}", scenario.display()))?;
            if let Some(config) = config {
                loaded.config = config;
            }
            tracing::info!(steps = loaded.steps.len(), "running scenario");
            let runner = ScriptRunner::run_scenario(&loaded)?;
            let sim = runner.simulation();
            if json {
                let report = Report {
                    summary: WorldInspector::summary(sim),
                    objects: sim.world().objects(),
                    record: sim.record().snapshots(),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for (name, id) in runner.names() {
                    println!("{name} = {}", id.short());
                }
                print_state(sim, &RenderView::default());
            }
        }
    }

    Ok(())
}

fn print_state(sim: &Simulation, view: &RenderView) {
    print!("{}", TextRenderer::new().render(sim.world(), view));
    println!("{}", WorldInspector::summary(sim));
    for line in WorldInspector::record_listing(sim.record()) {
        println!("{line}");
    }
}

/// A robot fetches a box onto a shelf, then the timeline is rewound and cut.
fn demo_phases() -> Vec<(&'static str, Vec<Step>)> {
    let spawn = |kind, x, z, name: &str| Step::SpawnAt {
        kind,
        x,
        z,
        name: Some(name.to_string()),
    };
    let run = |ms: u32| Step::Tick { ms: 16, times: ms / 16 };
    vec![
        (
            "robot fetches a box onto a shelf",
            vec![
                spawn(ObjectKind::Robot, 0, 0, "robot"),
                spawn(ObjectKind::Box, 0, 2, "box"),
                spawn(ObjectKind::Shelf, 1, 1, "shelf"),
                Step::Select("robot".into()),
                Step::Press(PadButton::Up),
                Step::Press(PadButton::A),
                Step::Press(PadButton::Right),
                Step::Press(PadButton::B),
                run(800),
            ],
        ),
        (
            "paused and scrubbed back to snapshot 1",
            vec![Step::Pause, Step::Scrub(1)],
        ),
        (
            "resumed from snapshot 1, later history discarded",
            vec![Step::Resume],
        ),
    ]
}
