mod args;
mod handlers;
mod output;

pub use args::{Cli, Commands};

use anyhow::Result;
use logbook_runtime::{Config, ServiceConfig, SessionIndexService};

pub async fn run(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let state_dir = logbook_core::resolve_state_dir(cli.state_dir.as_deref())?;
    let config = Config::load_from(&state_dir.join("config.toml"))?;

    let mut roots = config.effective_roots();
    for root in &cli.roots {
        if !roots.contains(root) {
            roots.push(root.clone());
        }
    }

    match cli.command {
        Commands::Roots => {
            handlers::handle_roots(&roots);
            Ok(())
        }
        command => {
            let service = SessionIndexService::open(ServiceConfig::new(state_dir, roots));
            match command {
                Commands::List { limit, json } => handlers::handle_list(&service, limit, json).await,
                Commands::Show { path, json } => handlers::handle_show(&service, &path, json).await,
                Commands::Watch => handlers::handle_watch(&service).await,
                Commands::Roots => unreachable!(),
            }
        }
    }
}
