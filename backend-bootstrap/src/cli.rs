use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde_json::json;
use tracing::info;

use backend_application::commands::registry_commands;
use backend_application::queries::event_queries;
use backend_application::SyncReconciler;
use backend_domain::ServerPhase;

use crate::context::AppContext;
use crate::lifecycle::shutdown_signal;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve scanners for one event until Ctrl-C or the idle timeout
    Serve {
        #[arg(short, long)]
        event: String,
        /// Override the configured port (0 picks a free one)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Download the ticket registry of an event
    Download {
        #[arg(short, long)]
        event: String,
        /// Replace the registry even if scans are not synced yet
        #[arg(long)]
        force: bool,
    },
    /// Upload unsynced scans of an event
    Sync {
        #[arg(short, long)]
        event: String,
    },
    /// List local events
    Events,
    /// Show recent scan logs of an event
    Logs {
        #[arg(short, long)]
        event: String,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Delete all local events, tickets and scan logs
    Purge {
        /// Confirm the purge
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(command: Command) -> Result<()> {
    let context = AppContext::new().await?;
    match command {
        Command::Serve { event, port } => serve(&context, &event, port).await,
        Command::Download { event, force } => {
            let summary = registry_commands::download_registry(
                context.store.clone(),
                context.backend.as_ref(),
                &event,
                force,
            )
            .await?;
            print_json(&summary)
        }
        Command::Sync { event } => {
            let reconciler = SyncReconciler::new(context.store.clone(), context.backend.clone());
            let result = reconciler.sync_event(&event).await?;
            print_json(&result)
        }
        Command::Events => {
            let events = event_queries::list_events(context.store.clone()).await?;
            print_json(&events)
        }
        Command::Logs { event, limit } => {
            let logs = event_queries::list_scan_logs(context.store.clone(), &event, limit).await?;
            print_json(&logs)
        }
        Command::Purge { yes } => {
            if !yes {
                return Err(anyhow!("refusing to purge local data without --yes"));
            }
            registry_commands::purge_local_data(context.store.clone()).await?;
            print_json(&json!({ "purged": true }))
        }
    }
}

async fn serve(context: &AppContext, event_id: &str, port: Option<u16>) -> Result<()> {
    let server = context.scan_server(port);
    let base_url = server.start(event_id).await?;
    println!("scanner: {}/scanner", base_url);
    println!("admin:   {}/admin", base_url);

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            server.stop().await;
        }
        _ = server.wait_for_phase(ServerPhase::Stopped) => {}
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
