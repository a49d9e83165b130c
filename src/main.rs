//! Tacotron CLI - Command-line interface for text-to-speech synthesis

use anyhow::{Context, Result};
use candle_core::Device;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tacotron::config::FileNaming;
use tacotron::inference::{read_sentences, CheckpointStore, Session, DEFAULT_SENTENCES};
use tacotron::{Config, Synthesizer, VERSION};

/// Tacotron - text-to-speech with Griffin-Lim reconstruction in Rust
#[derive(Parser, Debug)]
#[command(name = "tacotron")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use CPU instead of GPU
    #[arg(long, global = true)]
    cpu: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize speech from sentences
    Synthesize {
        /// Path to config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// File with one sentence per line (overrides `synthesis_file`)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Explicit checkpoint (defaults to the latest in the load run)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Output folder (overrides `synthesis_dir`)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output file naming
        #[arg(long, value_enum)]
        naming: Option<FileNaming>,
    },

    /// Show configuration and the checkpoint that would be loaded
    Info {
        /// Path to config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Write freshly initialized parameters as step 0 of the load run
    Init {
        /// Path to config file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn create_progress_bar(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    Ok(pb)
}

fn select_device(cpu: bool) -> Result<Device> {
    if cpu {
        Ok(Device::Cpu)
    } else {
        Device::cuda_if_available(0).context("Failed to select device")
    }
}

fn load_config(path: &Path) -> Result<Config> {
    info!("Loading config from {:?}", path);
    Config::load(path).with_context(|| format!("Failed to load config {:?}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    info!("Tacotron v{}", VERSION);

    match cli.command {
        Commands::Synthesize {
            config,
            input,
            checkpoint,
            output_dir,
            naming,
        } => {
            let mut cfg = load_config(&config)?;
            if let Some(dir) = output_dir {
                cfg.inference.synthesis_dir = dir;
            }
            if let Some(naming) = naming {
                cfg.inference.file_naming = naming;
            }

            let sentences = match input.as_ref().or(cfg.inference.synthesis_file.as_ref()) {
                Some(path) => read_sentences(path)
                    .with_context(|| format!("Failed to read sentences {:?}", path))?,
                None => DEFAULT_SENTENCES.iter().map(|s| s.to_string()).collect(),
            };
            if sentences.is_empty() {
                warn!("No sentences to synthesize");
                return Ok(());
            }

            let device = select_device(cli.cpu)?;
            let pb = create_progress_bar("Loading model...")?;
            let mut synthesizer = Synthesizer::new(&cfg, device, checkpoint.as_deref())
                .context("Failed to open synthesizer")?;
            pb.set_message(format!("Synthesizing {} sentences...", sentences.len()));

            let written = synthesizer.synthesize_to_dir(&sentences).context("Synthesis failed")?;
            pb.finish_with_message("Done!");

            for path in written {
                info!("Saved: {:?}", path);
            }
            Ok(())
        }

        Commands::Info { config } => {
            let cfg = load_config(&config)?;
            println!("{:#?}", cfg);
            println!("win_length: {} samples", cfg.win_length());
            println!("hop_length: {} samples", cfg.hop_length());
            println!("n_freq: {}", cfg.n_freq());

            let store = CheckpointStore::new(cfg.load_run_dir());
            match store.latest()? {
                Some(path) => println!("checkpoint: {:?}", path),
                None => println!("checkpoint: none in {:?}", store.dir()),
            }
            Ok(())
        }

        Commands::Init { config } => {
            let cfg = load_config(&config)?;
            let device = select_device(cli.cpu)?;
            let session = Session::new(&cfg, device).context("Failed to initialize model")?;
            let path = CheckpointStore::new(cfg.load_run_dir()).save(session.varmap(), 0)?;
            info!("Initialized checkpoint {:?}", path);
            Ok(())
        }
    }
}
