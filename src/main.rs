use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use fakehuman::csv_export::BufferedCsvExporter;
use fakehuman::sim::{GridWorld, Match};
use fakehuman::AiConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless match between computer-controlled nations", long_about = None)]
struct Args {
    /// Map width in tiles
    #[arg(short = 'w', long, default_value_t = 160)]
    width: u32,

    /// Map height in tiles
    #[arg(short = 'H', long, default_value_t = 120)]
    height: u32,

    /// Ocean border around the continent
    #[arg(long, default_value_t = 6)]
    margin: u32,

    /// Number of ticks to simulate
    #[arg(short = 't', long, default_value_t = 3000)]
    ticks: u64,

    /// Computer-controlled nations
    #[arg(short = 'n', long, default_value_t = 6)]
    nations: usize,

    /// Passive bot players
    #[arg(short = 'b', long, default_value_t = 4)]
    bots: usize,

    /// Length of the spawn phase in ticks
    #[arg(long, default_value_t = 100)]
    spawn_ticks: u64,

    /// Game id; seeds every nation's randomness
    #[arg(short = 'g', long, default_value = "local")]
    game_id: String,

    /// JSON file with AI tuning
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Decision log CSV path
    #[arg(short = 's', long, default_value = "decisions.csv")]
    output_csv: PathBuf,

    /// Number of threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Print pass statistics for each tick
    #[arg(long)]
    print_pass_stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Parse command line arguments
    let args = Args::parse();

    // Set thread pool size
    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()?;
    }

    // Load AI tuning
    let config = match &args.config {
        Some(path) => AiConfig::load(path)?,
        None => AiConfig::default(),
    };
    config.validate()?;

    info!("Map: {}x{} (margin {})", args.width, args.height, args.margin);
    info!("Nations: {} | Bots: {} | Ticks: {}", args.nations, args.bots, args.ticks);

    // Initialize match
    let world = GridWorld::continent(args.width, args.height, args.margin);
    let mut game = Match::setup(
        world,
        &args.game_id,
        args.nations,
        args.bots,
        args.spawn_ticks,
        &config,
    )?;

    // Initialize CSV exporter
    let mut csv_exporter = BufferedCsvExporter::new(&args.output_csv, 100);

    // Progress bar
    let progress = ProgressBar::new(args.ticks);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    // Performance tracking
    let mut total_sim_time = Duration::ZERO;
    let mut total_export_time = Duration::ZERO;

    // Main match loop
    for tick in 0..args.ticks {
        // Simulation step
        let sim_start = Instant::now();
        let records = game.step();
        total_sim_time += sim_start.elapsed();

        let stats = game.get_statistics();

        // Write decisions to CSV
        let export_start = Instant::now();
        csv_exporter.extend(records)?;
        total_export_time += export_start.elapsed();

        // Update progress
        progress.set_position(tick + 1);
        progress.set_message(format!(
            "Alive: {} | Active: {} | Claimed: {:.1}%",
            stats.alive_players,
            stats.active_agents,
            stats.claimed_share() * 100.0
        ));

        // Log periodic updates
        if tick % 100 == 0 && tick > 0 {
            info!(
                "Tick {} | Decide: {}us | Apply: {}us | Step: {}us | Decisions: {} | Executions: {}",
                tick,
                stats.pass_stats.decision_time,
                stats.pass_stats.apply_time,
                stats.pass_stats.step_time,
                stats.pass_stats.num_decisions,
                stats.pass_stats.num_executions
            );
        }

        if args.print_pass_stats {
            println!(
                "{},{},{},{},{},{}",
                tick,
                stats.pass_stats.num_decisions,
                stats.pass_stats.num_executions,
                stats.pass_stats.decision_time,
                stats.pass_stats.apply_time,
                stats.pass_stats.step_time
            );
        }

        if stats.alive_players <= 1 && stats.tick > args.spawn_ticks {
            info!("Match decided at tick {}", stats.tick);
            break;
        }
    }

    progress.finish_with_message("Match complete!");

    // Finalize outputs
    let decisions = csv_exporter.finish()?;
    let stats = game.get_statistics();

    // Print match summary
    let total_time = total_sim_time + total_export_time;
    println!("\n=== Match Summary ===");
    println!("Ticks: {}", stats.tick);
    println!("Alive players: {}", stats.alive_players);
    println!("Claimed land: {:.1}%", stats.claimed_share() * 100.0);
    if let Some((leader, tiles)) = stats.leader {
        println!(
            "Leader: {} with {} tiles ({:.1}%)",
            leader,
            tiles,
            stats.leader_share() * 100.0
        );
    }
    println!("Decisions logged: {} -> {}", decisions, args.output_csv.display());
    println!("Total time: {:.2}s", total_time.as_secs_f64());
    println!(
        "Simulation: {:.2}s ({:.1}%)",
        total_sim_time.as_secs_f64(),
        (total_sim_time.as_secs_f64() / total_time.as_secs_f64().max(f64::EPSILON)) * 100.0
    );
    println!(
        "Average TPS: {:.2}",
        stats.tick as f64 / total_time.as_secs_f64().max(f64::EPSILON)
    );

    Ok(())
}
