use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use catalog_application::{Network, Notices, Request, Response, handle, login_landing};
use catalog_core::{CatalogConfig, UserId};
use catalog_storage::Storage;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Curate a user's public book catalog", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Catalog database, defaults to catalog.db in the config dir
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file, defaults to config.json in the config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON description of the network's users and sites
    #[arg(long, global = true)]
    network: Option<PathBuf>,

    /// Logged-in user; overrides the network description
    #[arg(long, global = true)]
    as_user: Option<i64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one request against the catalog admin page
    Request {
        /// Query string, e.g. "page=pb_catalog&s=dune"
        #[arg(default_value = "page=pb_catalog")]
        query: String,

        /// URL-encoded form body; makes the request a POST
        #[arg(long)]
        body: Option<String>,

        /// Treat output as already flushed, so redirects fall back to script
        #[arg(long)]
        headers_sent: bool,
    },

    /// Print where the user lands after logging in
    LoginLanding {
        #[arg(long)]
        default_to: Option<String>,
    },

    /// Look for tags no entry links to
    PurgeOrphans,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            eprintln!("{err:?}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.json"),
    };
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => config_dir()?.join("catalog.db"),
    };

    let config = load_config(&config_path)?;
    let storage = Storage::open(&db_path)?;
    let network = match &cli.network {
        Some(path) => Network::load(path)?,
        None => Network::default(),
    };
    let current_user = cli.as_user.map(UserId).or(network.current_user);
    let network = network.with_current_user(current_user);

    match cli.command {
        Command::Request {
            query,
            body,
            headers_sent,
        } => {
            let request = match body {
                Some(body) => Request::post(&query, &body),
                None => Request::get(&query),
            }
            .with_headers_sent(headers_sent);

            let mut notices = Notices::default();
            let response = handle(&storage, network.host(), &config, &request, &mut notices)?;
            Ok(render_response(&response, &notices))
        }
        Command::LoginLanding { default_to } => {
            let default_to = default_to.unwrap_or_else(|| format!("{}/wp-admin/", config.site_url));
            let landing = login_landing(&default_to, current_user, &network.host(), &config);
            Ok(format!("{landing}\n"))
        }
        Command::PurgeOrphans => {
            let removed = storage.purge_orphan_tags()?;
            Ok(format!("removed {removed} orphan tags\n"))
        }
    }
}

fn config_dir() -> anyhow::Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("dev", "pressbooks", "catalog").context("resolve project dirs")?;
    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;
    Ok(config_dir.to_path_buf())
}

/// Reads the configuration; a missing file means defaults.
fn load_config(path: &Path) -> anyhow::Result<CatalogConfig> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?
    } else {
        CatalogConfig::default()
    };
    config.normalize();
    Ok(config)
}

fn render_response(response: &Response, notices: &Notices) -> String {
    let mut out = match response {
        Response::Redirect(location) => format!("303 See Other\nLocation: {location}\n"),
        Response::Denied(_) => "403 Forbidden\n".to_string(),
        Response::Script { .. } | Response::Page(_) => "200 OK\n".to_string(),
    };
    for notice in notices.messages() {
        out.push_str(&format!("Notice: {notice}\n"));
    }
    let body = response.body();
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    out
}
