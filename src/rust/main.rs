use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use signscan::relay;
use signscan::{describe_sign, HeuristicClassifier, ModelManager, ProcessConfig, RelayConfig, Xorshift64};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay HTTP server
    Serve {
        /// Address to listen on (overrides SIGNSCAN_BIND)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
        /// External classifier program; the image path is appended to its arguments
        #[arg(short, long)]
        classifier: Option<String>,
        /// Extra arguments passed to the classifier before the image path
        #[arg(long = "classifier-arg", allow_hyphen_values = true)]
        classifier_args: Vec<String>,
        /// Classifier timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Force a fresh download of the model artifact
        #[arg(short, long)]
        fresh: bool,
    },
    /// Classify an image file with the local heuristic classifier
    Classify {
        image: PathBuf,
        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print a locally generated description of a sign
    Describe {
        name: String,
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn rng_for(seed: Option<u64>) -> Xorshift64 {
    seed.map(Xorshift64::seeded).unwrap_or_else(Xorshift64::from_entropy)
}

async fn run_server(
    bind: Option<SocketAddr>,
    classifier: Option<String>,
    classifier_args: Vec<String>,
    timeout: Option<u64>,
    fresh: bool,
) -> Result<()> {
    let mut config = RelayConfig::from_env().context("failed to load configuration")?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(program) = classifier {
        let mut process = config.classifier.take().unwrap_or(ProcessConfig {
            program: String::new(),
            args: Vec::new(),
            timeout: signscan::config::DEFAULT_CLASSIFIER_TIMEOUT,
        });
        process.program = program;
        if !classifier_args.is_empty() {
            process.args = classifier_args;
        }
        config.classifier = Some(process);
    }
    if let (Some(secs), Some(process)) = (timeout, config.classifier.as_mut()) {
        process.timeout = Duration::from_secs(secs);
    }

    if fresh {
        if let Some(source) = &config.model {
            info!("Fresh download requested - removing any existing model artifact...");
            ModelManager::new(&config.models_dir)?.remove_download(source)?;
        }
    }

    relay::serve(config).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Serve {
            bind,
            classifier,
            classifier_args,
            timeout,
            fresh,
        } => run_server(bind, classifier, classifier_args, timeout, fresh).await?,
        Command::Classify { image, seed } => {
            let bytes = std::fs::read(&image).with_context(|| format!("failed to read {}", image.display()))?;
            let result = HeuristicClassifier::new().classify_bytes(&bytes, &mut rng_for(seed));
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Describe { name, seed } => {
            println!("{}", describe_sign(&name, &mut rng_for(seed)));
        }
    }

    Ok(())
}
