// Prism Wars terminal client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the session store
// 4. Resolve identity: command line, else a fresh saved session
// 5. Save the session
// 6. Create mpsc channels
// 7. Spawn the transport task
// 8. Spawn the app logic task
// 9. Run the TUI until the user quits
// 10. Cleanup on exit

use prismwars_core::session::{SessionRecord, SessionStore};
use prismwars_core::transport::{self, WsConnector};
use prismwars_core::wire::SessionIds;
use prismwars_tui::app;
use prismwars_tui::config;
use prismwars_tui::tui;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

const USAGE: &str = "usage: prismwars <game_id> <player_id> [display_name]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Prism Wars client starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: server {}", config.server.url);

    // 3. Open the session store
    let db_path = config
        .db_path()
        .context("no session database path configured and no data directory available")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let sessions = SessionStore::open_with_freshness(
        &db_path.to_string_lossy(),
        config.session.freshness_hours,
    )
    .context("failed to open session store")?;
    info!("Session store opened at {}", db_path.display());

    // 4. Resolve identity
    let args: Vec<String> = std::env::args().skip(1).collect();
    let resumed = sessions.load().context("failed to read saved session")?;
    let Some((ids, display_name)) = resolve_identity(&args, resumed) else {
        eprintln!("{USAGE}");
        eprintln!("(no recent session to resume)");
        std::process::exit(2);
    };
    info!(
        "Playing game {} as {} ({})",
        ids.game_id, ids.player_id, display_name
    );

    // 5. Save the session
    sessions
        .save(&ids.game_id, &ids.player_id, &display_name)
        .context("failed to save session")?;

    // 6. Create mpsc channels
    let (event_tx, event_rx) = mpsc::channel(256);
    let (req_tx, req_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 7. Spawn the transport task
    let connector = WsConnector::new(config.server.url.clone());
    let policy = config.retry_policy();
    let transport_handle = tokio::spawn(async move {
        transport::run(connector, req_rx, event_tx, policy).await;
        info!("Transport task finished");
    });

    // 8. Spawn the app logic task
    let app_state = app::AppState::new(config.clone(), ids, display_name, sessions);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(event_rx, cmd_rx, ui_tx, req_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 9. Run the TUI until the user quits
    if let Err(e) = tui::run(ui_rx, cmd_tx, &config).await {
        error!("TUI error: {}", e);
    }

    // 10. Cleanup: the app loop asks the transport to shut down on exit.
    let shutdown = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
        let _ = transport_handle.await;
    })
    .await;
    if shutdown.is_err() {
        error!("Background tasks did not stop within 5s");
    }

    info!("Prism Wars client shut down cleanly");
    Ok(())
}

/// Identity from `<game_id> <player_id> [display_name]`, else the resumed
/// session record. The display name defaults to the player id.
fn resolve_identity(
    args: &[String],
    resumed: Option<SessionRecord>,
) -> Option<(SessionIds, String)> {
    match args {
        [game_id, player_id, rest @ ..] => {
            let display_name = rest.first().cloned().unwrap_or_else(|| player_id.clone());
            Some((
                SessionIds {
                    game_id: game_id.clone(),
                    player_id: player_id.clone(),
                },
                display_name,
            ))
        }
        [] => resumed.map(|record| {
            info!("Resuming saved session for game {}", record.game_id);
            (
                SessionIds {
                    game_id: record.game_id,
                    player_id: record.player_id,
                },
                record.display_name,
            )
        }),
        _ => None,
    }
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("prismwars.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("prismwars_tui=info,prismwars_core=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
