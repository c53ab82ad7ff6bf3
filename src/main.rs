//! qr-hunt-client binary entrypoint wiring the decoder feed, countdown
//! clock, and backend into one session controller run.

use std::{env, sync::Arc};

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod identity;
mod scanner;
mod session;

use api::{GameBackend, http::HttpGameBackend, models::RegisterRequest};
use config::AppConfig;
use identity::IdentityStore;
use session::{
    SessionController, SessionIo, SessionOutcome,
    clock::{self, TICK_PERIOD},
    state_machine::Phase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let identity = IdentityStore::new(config.credential_path.clone());

    let backend =
        HttpGameBackend::connect(&config.api_url).context("building the backend client")?;

    let player_id = match identity.load() {
        Some(player_id) => {
            info!("resuming stored session");
            player_id
        }
        None => register(&backend, &identity).await?,
    };

    let backend: Arc<dyn GameBackend> = Arc::new(backend.with_player(&player_id));

    let (clock, ticks) = clock::start(TICK_PERIOD);
    let (scanner, codes) = scanner::stdin_source();
    let controller = SessionController::new(
        backend.clone(),
        player_id.clone(),
        config.debug,
        SessionIo {
            clock,
            ticks,
            scanner,
            codes,
        },
    );

    let outcome = tokio::select! {
        outcome = controller.run() => outcome,
        _ = shutdown_signal() => {
            info!("interrupted; the session stays resumable");
            return Ok(());
        }
    };

    report(backend.as_ref(), &player_id, &outcome).await;

    if outcome.discard_identity() {
        identity.discard();
    }

    Ok(())
}

/// Register a new player and persist the issued identity.
///
/// The registration UI lives elsewhere; here the name comes from the
/// environment so an operator can hand out ready-to-run clients.
async fn register(backend: &HttpGameBackend, identity: &IdentityStore) -> anyhow::Result<String> {
    let name = env::var("QR_HUNT_PLAYER_NAME")
        .context("QR_HUNT_PLAYER_NAME must be set to register a new player")?;
    let family_name = env::var("QR_HUNT_FAMILY_NAME")
        .context("QR_HUNT_FAMILY_NAME must be set to register a new player")?;

    let response = backend
        .register(RegisterRequest { name, family_name })
        .await
        .context("registering player")?;

    identity
        .store(&response.player_id)
        .context("persisting the player credential")?;

    if let Some(time_left) = response.time_left {
        info!(time_left, "registered; the countdown is running");
    }
    Ok(response.player_id)
}

/// Announce how the session ended, with the leaderboard on completion.
async fn report(backend: &dyn GameBackend, player_id: &str, outcome: &SessionOutcome) {
    if let Some(notice) = &outcome.session.notice {
        info!(%notice, "last session message");
    }

    match outcome.phase {
        Phase::Completed => {
            info!(
                completion_time = ?outcome.session.completion_time_seconds,
                "hunt completed"
            );
            print_results(backend, player_id).await;
        }
        Phase::Expired => info!("game time is up"),
        Phase::Invalid => warn!("player unknown; register again to play"),
        phase => info!(?phase, "session ended early"),
    }
}

async fn print_results(backend: &dyn GameBackend, player_id: &str) {
    match backend.results(player_id).await {
        Ok(results) => {
            let standing = &results.current_player;
            info!(
                rank = ?standing.rank,
                completion_time = standing.completion_time,
                "final standing"
            );
            for entry in &results.leaderboard {
                info!(
                    rank = ?entry.rank,
                    name = %entry.name,
                    family_name = %entry.family_name,
                    completion_time = entry.completion_time,
                    "leaderboard"
                );
            }
        }
        Err(err) => warn!(error = %err, "could not fetch the leaderboard"),
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM so an interrupted hunt can resume later.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
