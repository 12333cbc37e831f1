// Card Stories terminal client entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, not terminal)
// 3. Load config and resolve the player identity
// 4. Build the HTTP transport and the root controller
// 5. Spawn the controller task
// 6. Run the TUI until the user quits
// 7. Wait (bounded) for the controller to tear down

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use cardstories_app::app::{self, RootContext};
use cardstories_app::transport::HttpTransport;
use cardstories_core::config;
use cardstories_core::identity::{self, Identity};
use cardstories_core::protocol::{GameId, PlayerId, Subject};
use cardstories_tui::tui;

#[derive(Parser, Debug)]
#[command(name = "cardstories", about = "Terminal client for Card Stories")]
struct Cli {
    /// Game to open on startup; the lobby when omitted.
    #[arg(long)]
    game: Option<GameId>,

    /// Play as this player id and remember it for next time.
    #[arg(long)]
    player: Option<PlayerId>,

    /// Display name stored alongside `--player`.
    #[arg(long, requires = "player")]
    name: Option<String>,

    /// Override `server.base_url` from the config file.
    #[arg(long, env = "CARDSTORIES_BASE_URL")]
    base_url: Option<String>,

    /// Identity file location; the platform config directory by default.
    #[arg(long, env = "CARDSTORIES_IDENTITY")]
    identity: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("Card Stories client starting up");

    let mut config = config::load_config().context("failed to load configuration")?;
    if let Some(base_url) = cli.base_url.clone() {
        config.server.base_url = base_url;
    }
    info!(
        base_url = %config.server.base_url,
        timeout_secs = config.server.request_timeout_secs,
        "Config loaded"
    );

    let player_id = resolve_player(&cli)?;
    match player_id {
        Some(id) => info!(player_id = id, "Playing as player {}", id),
        None => warn!("No identity stored; joining as a spectator"),
    }
    let subject = Subject::new(player_id, cli.game);

    let transport = HttpTransport::from_config(&config).context("failed to build HTTP client")?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let (context, poll_rx) = RootContext::new(config, subject, Arc::new(transport), ui_tx)
        .context("failed to register update handlers")?;

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, poll_rx, context).await {
            error!("Controller loop error: {}", e);
        }
    });

    // Blocks until the user quits or the controller hangs up.
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Card Stories client shut down cleanly");
    Ok(())
}

/// `--player` wins and is stored; otherwise the stored identity, if any.
fn resolve_player(cli: &Cli) -> anyhow::Result<Option<PlayerId>> {
    let path = match &cli.identity {
        Some(path) => path.clone(),
        None => identity::default_identity_path()?,
    };

    if let Some(player_id) = cli.player {
        let identity = Identity {
            player_id,
            name: cli.name.clone(),
        };
        identity::store_identity(&path, &identity)
            .with_context(|| format!("failed to store identity at {}", path.display()))?;
        info!(path = %path.display(), "Stored identity");
        return Ok(Some(player_id));
    }

    let stored = identity::load_identity(&path)
        .with_context(|| format!("failed to load identity from {}", path.display()))?;
    Ok(stored.map(|identity| identity.player_id))
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("cardstories.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("cardstories=info,cardstories_tui=info,cardstories_app=info,cardstories_core=info,warn")
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_game_and_player() {
        let cli = Cli::try_parse_from(["cardstories", "--game", "12", "--player", "3"]).unwrap();
        assert_eq!(cli.game, Some(12));
        assert_eq!(cli.player, Some(3));
        assert_eq!(cli.name, None);
    }

    #[test]
    fn name_requires_player() {
        assert!(Cli::try_parse_from(["cardstories", "--name", "ada"]).is_err());
    }

    #[test]
    fn player_flag_is_stored_and_reloaded() {
        let dir = std::env::temp_dir().join(format!("cardstories-main-{}", std::process::id()));
        let path = dir.join("identity.toml");
        let path_arg = path.to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "cardstories",
            "--player",
            "9",
            "--name",
            "ada",
            "--identity",
            path_arg.as_str(),
        ])
        .unwrap();
        assert_eq!(resolve_player(&cli).unwrap(), Some(9));

        let cli = Cli::try_parse_from(["cardstories", "--identity", path_arg.as_str()]).unwrap();
        assert_eq!(resolve_player(&cli).unwrap(), Some(9));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
