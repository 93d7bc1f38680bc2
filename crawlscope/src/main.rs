use anyhow::{Context as _, Result};
use clap::ArgMatches;
use colored::Colorize;
use crawlscope::handlers::{self, expand_path};
use crawlscope::{Context, command_argument_builder};
use crawlscope_core::Config;
use crawlscope_core::config::{LOG_FILE, default_config_dir, default_config_path};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    if let Err(e) = run(&matches).await {
        eprintln!("{} {}", "✗".red().bold(), format!("{:#}", e).red());
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_flag("verbose");
    let ui_mode = matches!(matches.subcommand(), Some(("ui", _)));

    let config_path = matches
        .get_one::<PathBuf>("config")
        .map(|p| expand_path(p))
        .unwrap_or_else(default_config_path);

    // ui mode logs to a file beside the config
    let log_file = ui_mode.then(|| {
        config_path
            .parent()
            .map(|dir| dir.join(LOG_FILE))
            .unwrap_or_else(|| default_config_dir().join(LOG_FILE))
    });
    init_logging(verbose, log_file)?;

    let config = Config::load(&config_path).with_context(|| format!("Invalid config {}", config_path.display()))?;
    let ctx = Context::new(config, matches.get_one::<Url>("base-url"), quiet)?;

    match matches.subcommand() {
        Some(("jobs", jobs)) => match jobs.subcommand() {
            Some(("list", args)) => handlers::handle_jobs_list(&ctx, args).await,
            Some(("create", args)) => handlers::handle_jobs_create(&ctx, args).await,
            Some(("start", args)) => handlers::handle_jobs_start(&ctx, args).await,
            Some(("show", args)) => handlers::handle_jobs_show(&ctx, args).await,
            Some(("classify", args)) => handlers::handle_jobs_classify(&ctx, args).await,
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("graph", graph)) => match graph.subcommand() {
            Some(("export", args)) => handlers::handle_graph_export(&ctx, args).await.map(|_| ()),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("export", args)) => handlers::handle_backend_export(&ctx, args).await.map(|_| ()),
        Some(("ui", _)) => handlers::handle_ui(ctx).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
