mod args;

use args::Args;
use chrono::Local;
use clap::Parser;
use datagen::{GenerationConfig, Generator};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use simplelog::{Config, SimpleLogger};
use std::{
    error::Error,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    // Set up SIGINT handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = Arc::clone(&stop_flag);

    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, stopping generation...");
        stop_flag_handler.store(true, Ordering::Relaxed);
    })?;

    let output = match args.output {
        Some(path) => path,
        None => default_output()?,
    };

    let threads = args.threads.unwrap_or_else(|| num_cpus::get() - 1).max(1);

    let mut config = GenerationConfig {
        max_games: args.games,
        ..GenerationConfig::default()
    };
    if let Some(nodes) = args.nodes {
        config.steady_nodes = nodes;
    }
    if let Some(nodes) = args.verification_nodes {
        config.verification_nodes = nodes;
    }

    let generator = Generator::new(&output, threads, config)?;
    let positions = generator.position_counter();

    let handle = std::thread::spawn(move || generator.run(stop_flag));

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    while !handle.is_finished() {
        bar.set_message(format!(
            "{} positions recorded",
            positions.load(Ordering::Relaxed)
        ));
        bar.tick();
        std::thread::sleep(Duration::from_millis(200));
    }
    bar.finish_and_clear();

    let written = handle.join().map_err(|_| "generator thread panicked")??;
    log::info!("Generated {} positions", written);

    Ok(())
}

fn default_output() -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all("data")?;
    let timestamp = Local::now().format("%Y-%m-%d-%H:%M");
    Ok(PathBuf::from(format!("data/{}.bin", timestamp)))
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    SimpleLogger::init(LevelFilter::Info, Config::default())?;

    Ok(args)
}
