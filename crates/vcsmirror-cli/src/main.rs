//! vcsmirror-server - HTTP mirror/proxy for Git and Mercurial repositories.
//!
//! Lazily clones each requested repository into a local mirror, keeps it
//! fresh on demand, and serves smart-protocol proxy traffic, single-file
//! reads, batch first-exist reads, and blame against that mirror.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use vcsmirror_config::{CliOverrides, ConfigLoader};

/// HTTP mirror/proxy for Git and Mercurial repositories.
#[derive(Parser, Debug)]
#[command(name = "vcsmirror-server")]
#[command(author = "vcsmirror contributors")]
#[command(version)]
#[command(about = "HTTP mirror/proxy for Git and Mercurial repositories", long_about = None)]
struct Cli {
    /// Address the HTTP listener binds to, e.g. `0.0.0.0:8080`.
    #[arg(long, env = "VCSMIRROR_BIND")]
    bind: Option<String>,

    /// Directory mirrors are stored under.
    #[arg(long, env = "VCSMIRROR_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Path to the `git-http-backend` executable.
    #[arg(long, env = "GIT_HTTP_BACKEND")]
    git_http_backend: Option<PathBuf>,

    /// Path to a Python 2.7 interpreter, used to launch `hgweb`.
    #[arg(long, env = "PYTHON27")]
    python27: Option<PathBuf>,

    /// Suppress all clone/update activity; serve whatever mirror already
    /// exists on disk.
    #[arg(long)]
    offline: bool,

    /// Increase log verbosity; repeat for more (`-v`, `-vv`, `-vvv`).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Allowed clone hosts. Requests for any other host are rejected with
    /// 403. At least one is required (here or via `VCSMIRROR_HOSTS`).
    hosts: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = CliOverrides {
        bind: cli.bind,
        storage_root: cli.storage_root,
        git_http_backend: cli.git_http_backend,
        python27: cli.python27,
        offline: cli.offline,
        hosts: cli.hosts,
    };

    let settings = ConfigLoader::new().resolve(&overrides)?;
    let bind = settings.bind;

    info!(%bind, hosts = ?settings.allowed_hosts, offline = settings.offline, "starting vcsmirror-server");

    let app = vcsmirror_server::app(settings);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
