mod activity;
mod api;
mod app;
mod cli;
mod config;
mod error;
mod model;
mod session;
mod table;
mod transport;
mod validation;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "userdesk", about = "Terminal client for the user management backend")]
pub struct Args {
    #[arg(short, long, help = "Run one command and exit (e.g. \"health\" or \"/users\")")]
    pub command: Option<String>,

    #[arg(long, env = "USERDESK_API_URL", help = "Backend API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session file path")]
    pub session_file: Option<PathBuf>,

    #[arg(long, help = "Keep the session in memory only")]
    pub memory_session: bool,

    #[arg(long, help = "Activity log directory")]
    pub activity_dir: Option<PathBuf>,

    #[arg(long, help = "Do not write an activity log")]
    pub no_activity: bool,

    #[arg(long, help = "Answer yes to confirmations")]
    pub yes: bool,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print HTTP details and settings)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Explicit file replaces the layered lookup, still on top of the defaults
    let mut cfg = if let Some(config_path) = &args.config {
        let mut cfg = config::Config::with_defaults();
        cfg.merge(config::Config::load_from(config_path)?);
        cfg
    } else {
        config::Config::load()?
    };

    // CLI overrides
    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = Some(base_url.clone());
    }
    if let Some(path) = &args.session_file {
        cfg.session.store = Some(config::StoreKind::File);
        cfg.session.path = Some(path.clone());
    }
    if args.memory_session {
        cfg.session.store = Some(config::StoreKind::Memory);
    }
    if let Some(dir) = &args.activity_dir {
        cfg.activity.dir = Some(dir.clone());
    }
    if args.no_activity {
        cfg.activity.enabled = Some(false);
    }

    if let Err(issues) = cfg.validate() {
        let lines: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        return Err(anyhow::anyhow!("Invalid configuration:\n  {}", lines.join("\n  ")));
    }

    if args.debug {
        eprintln!("[DEBUG] Base URL: {}", cfg.base_url());
        eprintln!("[DEBUG] Session store: {}", cfg.store_kind().as_str());
        eprintln!("[DEBUG] Session path: {:?}", cfg.session.path);
        eprintln!("[DEBUG] Activity: {} {:?}", cfg.activity_enabled(), cfg.activity.dir);
    }

    let (store, store_desc): (Box<dyn session::SessionStore>, String) = match cfg.store_kind() {
        config::StoreKind::Memory => (Box::new(session::MemoryStore::new()), "memory".to_string()),
        config::StoreKind::File => {
            let path = cfg
                .session
                .path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("No session path configured"))?;
            let store = session::FileStore::at(&path);
            let desc = format!("file {}", store.path().display());
            (Box::new(store), desc)
        }
    };

    let run_id = uuid::Uuid::new_v4().to_string();
    let activity = match (&cfg.activity.dir, cfg.activity_enabled()) {
        (Some(dir), true) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.jsonl", run_id));
            let mut log = activity::ActivityLog::new(&path, &run_id)?;
            log.run_start(cfg.base_url(), cfg.store_kind().as_str())?;
            Some(RefCell::new(log))
        }
        _ => None,
    };

    let transport = transport::HttpTransport::new(cfg.base_url(), args.debug);
    let base_url = transport.base_url().to_string();
    let api = api::Api::new(transport, session::Sessions::new(store));

    let ctx = cli::Context {
        base_url,
        store_desc,
        history_file: cfg.repl.history_file.clone(),
        run_id,
        app: RefCell::new(app::App::new(api)),
        activity,
        args,
    };

    if let Some(command) = ctx.args.command.clone() {
        cli::run_once(&ctx, &command)
    } else {
        cli::run_repl(ctx)
    }
}
