//! Partysheet - headless composition root.
//!
//! Joins the shared session, loads every sheet and logs each character as it
//! changes until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use partysheet_domain::{rank_stats, PlayerId, Roster};
use partysheet_player::application::pin::PinStore;
use partysheet_player::application::session::SheetSession;
use partysheet_player::config::AppConfig;
use partysheet_player::infrastructure::platform::DesktopStorageProvider;
use partysheet_player::infrastructure::supabase::{PostgrestStore, RealtimeFeed};
use partysheet_player::state::CharacterCell;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(filename);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partysheet_player=debug,partysheet=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Partysheet");

    let config = AppConfig::from_env().context("loading configuration")?;
    let roster = if config.dev_roster {
        Roster::development()
    } else {
        Roster::campaign()
    };

    let store = PostgrestStore::new(&config.supabase_url, config.supabase_anon_key.clone())
        .context("building store client")?;
    let feed = RealtimeFeed::new(
        &config.supabase_url,
        config.supabase_anon_key.clone(),
        config.realtime_channel.clone(),
    )
    .context("building realtime client")?;

    let pins = PinStore::new(DesktopStorageProvider::new());
    let pinned = pins.pinned();
    match &pinned {
        Some(player) => tracing::info!(player = %player, "Editing pinned character"),
        None => tracing::info!("No character pinned, all sheets are read-only"),
    }

    let session = SheetSession::new(
        roster.clone(),
        Arc::new(store),
        Arc::new(feed),
        config.sync(),
    );
    session.start().await.context("starting session")?;

    for player in roster.display_order(pinned.as_ref()) {
        let cell = session.sync().registry().cell(&player);
        let name = roster.display_name(&player).unwrap_or_default().to_string();
        tokio::spawn(log_changes(player, name, cell));
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("Shutting down");
    session.shutdown().await;
    Ok(())
}

async fn log_changes(player: PlayerId, name: String, cell: CharacterCell) {
    let mut changes = cell.subscribe();
    loop {
        {
            let character = changes.borrow_and_update();
            let stats: Vec<String> = rank_stats(&character.stats)
                .into_iter()
                .map(|(stat, die)| match die {
                    Some(die) => format!("{} {}", stat.display_name(), die),
                    None => format!("{} -", stat.display_name()),
                })
                .collect();
            tracing::info!(
                player = %player,
                name = %name,
                adversity = character.adversity_tokens,
                status = %character.status,
                dial = character.secondary_dial,
                items = character.inventory.len(),
                stats = %stats.join(", "),
                "Character sheet"
            );
        }
        if changes.changed().await.is_err() {
            return;
        }
    }
}
