use crate::output::{format_detail, format_job_card, format_job_list, format_notice};
use anyhow::{Context as _, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use crawlscope_client::{ApiClient, BackendExport, JobId, JobStatus, NewJob};
use crawlscope_core::export::save_artifact;
use crawlscope_core::session::fetch_detail;
use crawlscope_core::view::{job_card, job_list};
use crawlscope_core::{Config, ExportFormat, Session, ViewMode};
use crawlscope_tui::{DashboardOptions, run_dashboard};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

// Ticks the network simulation gets before a CLI export.
const EXPORT_SETTLE_TICKS: usize = 600;

/// Everything a handler needs besides its own arguments.
pub struct Context {
    pub client: ApiClient,
    pub config: Config,
    pub quiet: bool,
}

impl Context {
    pub fn new(config: Config, base_url: Option<&Url>, quiet: bool) -> Result<Self> {
        let base_url = base_url
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| config.base_url.clone());
        let client = ApiClient::new(&base_url)?.with_retry(config.retry_policy());
        debug!("Using backend {}", client.base_url());
        Ok(Self { client, config, quiet })
    }

    fn spinner(&self, message: impl Into<String>) -> Result<ProgressBar> {
        if self.quiet {
            return Ok(ProgressBar::hidden());
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message.into());
        Ok(spinner)
    }

    fn session(&self) -> Session {
        Session::new(self.config.category_table(), self.config.layout_config())
    }
}

fn job_id(args: &ArgMatches) -> Result<JobId> {
    args.get_one::<i64>("ID").copied().ok_or_else(|| anyhow!("missing job id"))
}

fn string_arg<'a>(args: &'a ArgMatches, name: &str) -> Option<&'a str> {
    args.get_one::<String>(name).map(String::as_str)
}

pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Fetch a job's detail into a fresh session, surfacing load errors.
async fn open_session(ctx: &Context, id: JobId) -> Result<Session> {
    let spinner = ctx.spinner(format!("Loading job #{}...", id))?;
    let mut session = ctx.session();
    let ticket = session.begin_load(id);
    let detail = fetch_detail(&ctx.client, id).await;
    spinner.finish_and_clear();

    let detail = detail.with_context(|| format!("Failed to load job #{}", id))?;
    session.apply_detail(ticket, Ok(detail));
    Ok(session)
}

fn print_notices(session: &mut Session) {
    for notice in session.take_notices() {
        eprintln!("{}", format_notice(&notice));
    }
}

pub async fn handle_jobs_list(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let status = string_arg(args, "status").and_then(JobStatus::from_str);
    let spinner = ctx.spinner("Fetching jobs...")?;
    let jobs = ctx.client.list_jobs(status).await;
    spinner.finish_and_clear();
    let jobs = jobs.context("Failed to list jobs")?;
    info!("Fetched {} jobs", jobs.len());

    let list = job_list(&jobs);
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        print!("{}", format_job_list(&list));
    }
    Ok(())
}

pub async fn handle_jobs_create(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let url = args.get_one::<Url>("url").ok_or_else(|| anyhow!("missing --url"))?;
    let scope = string_arg(args, "scope").unwrap_or("DOMAIN").to_uppercase();
    let job = NewJob {
        start_url: url.as_str().to_string(),
        max_depth: args.get_one::<u32>("depth").copied().unwrap_or(2),
        crawl_scope: scope,
        respect_robots_txt: !args.get_flag("ignore-robots"),
    };

    let created = ctx.client.create_job(&job).await.context("Failed to create job")?;
    println!("{} Crawl job #{} created", "✓".green().bold(), created.id);

    if args.get_flag("start") {
        ctx.client
            .start_job(created.id)
            .await
            .with_context(|| format!("Failed to start job #{}", created.id))?;
        println!("{} Crawl job #{} started", "✓".green().bold(), created.id);
    }
    if !ctx.quiet {
        println!();
        print!("{}", format_job_card(&job_card(&created)));
    }
    Ok(())
}

pub async fn handle_jobs_start(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let id = job_id(args)?;
    ctx.client
        .start_job(id)
        .await
        .with_context(|| format!("Failed to start job #{}", id))?;
    println!("{} Crawl job #{} started", "✓".green().bold(), id);
    Ok(())
}

pub async fn handle_jobs_show(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let id = job_id(args)?;
    let mut session = open_session(ctx, id).await?;

    if let Some(category) = string_arg(args, "category") {
        if !session.select_category(&ctx.client, category).await {
            bail!("Job #{} has no results to filter", id);
        }
        if session.active_category().is_none() {
            print_notices(&mut session);
            bail!("Failed to filter job #{} by {}", id, category);
        }
    }
    print_notices(&mut session);

    let view = session
        .detail_view()
        .ok_or_else(|| anyhow!("Job #{} is not loaded", id))?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", format_detail(&view));
    }
    Ok(())
}

pub async fn handle_jobs_classify(ctx: &Context, args: &ArgMatches) -> Result<()> {
    let id = job_id(args)?;
    ctx.client
        .classify_job(id)
        .await
        .with_context(|| format!("Failed to classify job #{}", id))?;
    println!("{} Classification started for job #{}", "✓".green().bold(), id);
    Ok(())
}

/// Lay out a job's graph and save it as an image. Returns the written path.
pub async fn handle_graph_export(ctx: &Context, args: &ArgMatches) -> Result<PathBuf> {
    let id = job_id(args)?;
    let view = string_arg(args, "view")
        .and_then(ViewMode::from_str)
        .unwrap_or_default();
    let format = string_arg(args, "format")
        .and_then(ExportFormat::from_str)
        .unwrap_or(ExportFormat::Svg);
    let dir = args
        .get_one::<PathBuf>("out")
        .map(|p| expand_path(p))
        .unwrap_or_else(|| ctx.config.download_dir());

    let mut session = open_session(ctx, id).await?;
    if view != session.view_mode() {
        session.set_view_mode(view);
    }

    let spinner = ctx.spinner(format!("Laying out {} view...", view.as_str()))?;
    if let Some(graph) = session.rendered_mut() {
        graph.settle(EXPORT_SETTLE_TICKS);
    }
    let artifact = session.export_current(format);
    spinner.finish_and_clear();
    print_notices(&mut session);

    let Some(artifact) = artifact? else {
        bail!("Job #{} has no graph to export", id);
    };
    let path = save_artifact(&artifact, &dir)?;
    println!("{} Saved {}", "✓".green().bold(), path.display().to_string().bright_white());
    Ok(path)
}

/// Default location of a backend export, e.g. `crawl-job-7-sitemap.xml`.
pub fn backend_export_path(dir: &Path, id: JobId, format: BackendExport) -> PathBuf {
    dir.join(format!(
        "crawl-job-{}-{}.{}",
        id,
        format.path_segment(),
        format.file_extension()
    ))
}

/// Download a server-side export. Returns the written path.
pub async fn handle_backend_export(ctx: &Context, args: &ArgMatches) -> Result<PathBuf> {
    let id = job_id(args)?;
    let format = string_arg(args, "format")
        .and_then(BackendExport::from_str)
        .ok_or_else(|| anyhow!("unknown export format"))?;
    let path = match args.get_one::<PathBuf>("out") {
        Some(path) => expand_path(path),
        None => backend_export_path(&ctx.config.download_dir(), id, format),
    };

    let spinner = ctx.spinner(format!("Exporting job #{} as {}...", id, format.path_segment()))?;
    let body = ctx.client.export(id, format).await;
    spinner.finish_and_clear();
    let body = body.with_context(|| format!("Failed to export job #{}", id))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Saved {}", "✓".green().bold(), path.display().to_string().bright_white());
    Ok(path)
}

pub async fn handle_ui(ctx: Context) -> Result<()> {
    let options = DashboardOptions::from_config(&ctx.config);
    let runtime = tokio::runtime::Handle::current();
    let client = ctx.client;
    tokio::task::spawn_blocking(move || run_dashboard(client, runtime, options)).await?
}
