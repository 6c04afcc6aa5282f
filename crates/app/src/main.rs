use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Mutex;

use anyhow::Context as _;
use catalog_api::{ApiClient, ApiWorker};
use catalog_application::{SessionStore, Shell};
use catalog_core::{Route, Settings};
use catalog_storage::Storage;
use catalog_ui::{Ui, UiExit};
use directories::ProjectDirs;
use tracing::info;
use tracing_subscriber::EnvFilter;

const API_URL_ENV: &str = "CATALOG_API_URL";

const USAGE: &str = "usage: catalog-admin [--api-url <url>] [--route <path>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    api_url: Option<String>,
    route: Option<Route>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api-url" => {
                let value = args.next().context("--api-url needs a value")?;
                parsed.api_url = Some(value);
            }
            "--route" => {
                let value = args.next().context("--route needs a value")?;
                let route = Route::parse(&value)
                    .with_context(|| format!("unknown route {value}"))?;
                parsed.route = Some(route);
            }
            "-h" | "--help" => parsed.help = true,
            other => anyhow::bail!("unexpected argument {other}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

/// Command line beats the environment, which beats the stored value.
fn apply_overrides(settings: &mut Settings, env_url: Option<String>, args: &Args) {
    if let Some(url) = env_url.filter(|url| !url.trim().is_empty()) {
        settings.api_url = url;
    }
    if let Some(url) = &args.api_url {
        settings.api_url = url.clone();
    }
    settings.normalize();
}

fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;
    let log_path = log_dir.join("catalog-admin.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let project_dirs =
        ProjectDirs::from("dev", "catalog", "catalog-admin").context("resolve project dirs")?;
    init_logging(project_dirs.data_dir())?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;

    let db_path = config_dir.join("catalog-admin.db");
    let storage = Rc::new(Storage::open(&db_path)?);
    let mut settings = storage.load_settings()?;
    apply_overrides(&mut settings, std::env::var(API_URL_ENV).ok(), &args);
    storage.save_settings(&settings)?;

    let mut route = args.route.unwrap_or_default();
    loop {
        info!(api_url = %settings.api_url, %route, "starting console");
        let client = ApiClient::new(&settings.api_url)?;
        let worker = ApiWorker::spawn(client)?;
        let shell = Shell::new(settings, SessionStore::load(storage.clone()), route);

        let mut ui = Ui::new(shell, worker);
        let outcome = ui.run()?;
        settings = outcome.settings;
        route = outcome.route;
        storage.save_settings(&settings)?;

        match outcome.exit {
            UiExit::Quit => break,
            UiExit::Reconnect => continue,
        }
    }

    Ok(())
}
