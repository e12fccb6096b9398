//! ArcSFV - Main entry point
//!
//! Thin CLI shell over the integrity engine: parses arguments, renders
//! progress events, and prints the terminal summary.

use anyhow::{anyhow, Result};
use arcsfv::config::Config;
use arcsfv::digest::Xxh64Algorithm;
use arcsfv::engine::orchestrator::{
    EngineOptions, EngineState, Orchestrator, ProgressEvent, RunOutcome,
};
use arcsfv::engine::{RunMode, RunState};
use arcsfv::manifest::ManifestFormat;
use arcsfv::utils;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Number of hashing worker threads (default: hardware concurrency)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash files and write a new checksum manifest
    Create {
        /// Files and directories to hash
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Manifest output path (default: Hash.<ext> in the first input
        /// directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Manifest format to write
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Verify files against an existing checksum manifest
    Verify {
        /// Manifest to verify against
        manifest: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Binary,
}

impl From<FormatArg> for ManifestFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ManifestFormat::Text,
            FormatArg::Binary => ManifestFormat::Binary,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    let mut options = EngineOptions::from_config(&config)?;
    if let Some(jobs) = args.jobs {
        options.worker_threads = jobs;
    }

    let mode = match &args.command {
        Command::Create { format, .. } => {
            if let Some(format) = format {
                options.write_format = (*format).into();
            }
            RunMode::Create
        }
        Command::Verify { .. } => RunMode::Verify,
    };

    let algorithm = Xxh64Algorithm;
    let orchestrator = Orchestrator::new(&algorithm, options);
    let run = RunState::new();
    let (tx, rx) = mpsc::channel();

    let outcome = std::thread::scope(|scope| {
        let engine = scope.spawn(|| {
            // Owns the sender: dropping it on return ends the render loop.
            let tx = tx;
            match &args.command {
                Command::Create { paths, output, .. } => {
                    orchestrator.create(paths, output.as_deref(), &run, &tx)
                }
                Command::Verify { manifest } => orchestrator.verify(manifest, &run, &tx),
            }
        });

        render_progress(rx);

        engine
            .join()
            .map_err(|_| anyhow!("engine thread panicked"))
    })??;

    report(&outcome, mode);

    if mode == RunMode::Verify && outcome.summary.corrupt + outcome.summary.missing > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Drain progress events until the engine drops its sender.
fn render_progress(rx: mpsc::Receiver<ProgressEvent>) {
    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .expect("static template is valid"),
    );

    for event in rx {
        match event {
            ProgressEvent::Started { total_files, .. } => {
                bar.set_length(total_files as u64);
                bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            }
            ProgressEvent::Tick {
                throughput_mbps,
                processed_files,
                ..
            } => {
                bar.set_position(processed_files as u64);
                bar.set_message(format!("{throughput_mbps:.0} MB/s"));
            }
            ProgressEvent::StateChanged(EngineState::Done) => {
                bar.finish_with_message("done");
            }
            ProgressEvent::StateChanged(EngineState::Stopped) => {
                bar.abandon_with_message("stopped");
            }
            ProgressEvent::StateChanged(_) => {}
        }
    }
}

/// Print the terminal summary the way the engine sorted it: failures
/// first.
fn report(outcome: &RunOutcome, mode: RunMode) {
    let summary = &outcome.summary;

    for job in &outcome.jobs {
        let status = job.status();
        if status.sort_priority() == 0 {
            println!("{}: {}", status.label(), job.rel_path);
        }
    }

    match mode {
        RunMode::Create => match (&summary.manifest_path, summary.state) {
            (Some(path), _) => {
                println!("Hashed {} files | saved {}", summary.total_files, path.display())
            }
            (None, EngineState::Stopped) => {
                println!("Stopped | {} files listed, no manifest written", summary.total_files)
            }
            (None, _) => println!("Hashed {} files | manifest write failed", summary.total_files),
        },
        RunMode::Verify => {
            println!(
                "Checked {} files in {:.1}s | corrupt: {} | missing: {}",
                summary.total_files,
                summary.elapsed.as_secs_f64(),
                summary.corrupt,
                summary.missing
            );
            if summary.skipped_lines > 0 {
                println!("Warning: {} malformed manifest lines skipped", summary.skipped_lines);
            }
            if summary.state == EngineState::Stopped {
                println!("Run was stopped; unresolved files were not verified");
            } else if summary.corrupt + summary.missing == 0 {
                println!("All files OK");
            }
        }
    }
}
