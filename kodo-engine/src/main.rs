use kodo_engine::{Config, Scheduler};
use kodo_utils::tracing::setup_tracing;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dotenv::dotenv;
use serde_json::Value;
use structopt::StructOpt;
use tracing::info;

#[derive(Debug, StructOpt)]
#[structopt(name = "kodo", about = "Compiles and runs untrusted programs against test cases")]
struct Opt {
    /// Config file. Defaults and environment overrides are used when absent.
    #[structopt(short, long, default_value = "kodo.toml")]
    config: PathBuf,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Executes one JSON request and prints the JSON response
    Run {
        /// Request file, "-" for stdin
        #[structopt(default_value = "-")]
        request: PathBuf,
    },
    /// Lists the enabled languages
    Languages,
}

#[tracing::instrument(err)]
fn load_config(path: &Path) -> Result<&'static Config> {
    let config = if path.exists() {
        info!("loading config from {}", path.display());
        Config::init_from_file(path)?
    } else {
        info!("{} not found, using defaults", path.display());
        Config::init(Config::from_env()?)?
    };
    info!("config is loaded:\n{:#?}", config);
    Ok(config)
}

fn read_request(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read request: path = {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    setup_tracing();

    let opt = Opt::from_args();
    let config = load_config(&opt.config)?;
    let scheduler = Scheduler::new(config.clone())?;

    match opt.cmd {
        Command::Run { request } => {
            let body: Value = serde_json::from_str(&read_request(&request)?)
                .context("request is not valid JSON")?;
            let response = scheduler.handle(&body).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Languages => {
            for profile in scheduler.registry().profiles() {
                let kind = if profile.is_compiled() {
                    "compiled"
                } else {
                    "interpreted"
                };
                if profile.aliases.is_empty() {
                    println!("{}\t{}", profile.id, kind);
                } else {
                    println!("{}\t{}\t({})", profile.id, kind, profile.aliases.join(", "));
                }
            }
        }
    }

    scheduler.shutdown().await;
    Ok(())
}
