//! Plays two games of Core at once from one account.
//!
//! The sessions are created in the `on_ready` hook, after login, and run
//! side by side on the client's single-threaded runtime.
//!
//! Run with: `BOAI_USERNAME=... BOAI_PASSWORD=... cargo run -p concurrent-playing`

use std::time::Duration;

use battleofai::prelude::*;

fn first_free_cell(board: &Board, _symbol: Symbol) -> Option<(usize, usize)> {
    for (x, row) in board.as_array()?.iter().enumerate() {
        for (y, cell) in row.as_array()?.iter().enumerate() {
            if cell.as_str() == Some("#") {
                return Some((x, y));
            }
        }
    }
    None
}

async fn play_two(client: Client) {
    let quick = SessionConfig {
        turn_interval: Duration::from_millis(500),
        ..SessionConfig::default()
    };
    let configs = [
        SessionConfig {
            join_own_games: true,
            ..quick.clone()
        },
        quick,
    ];

    let mut sessions = Vec::new();
    for config in configs {
        match client.create_session(Core, config) {
            Ok(session) => sessions.push(session),
            Err(e) => tracing::error!(error = %e, "could not create session"),
        }
    }
    for session in &sessions {
        if let Err(e) = session.run() {
            tracing::error!(session = session.name(), error = %e, "could not start session");
        }
    }

    // Let matchmaking settle before reporting where each session landed.
    tokio::time::sleep(Duration::from_secs(2)).await;
    for session in &sessions {
        tracing::info!(session = session.name(), game = ?session.game_id(), "playing");
    }

    for session in &sessions {
        match session.wait().await {
            Ok(won) => tracing::info!(session = session.name(), ?won, "finished"),
            Err(e) => tracing::warn!(session = session.name(), error = %e, "failed"),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    battleofai::logging::init();

    let client = Client::new(ClientConfig::from_env())?;
    client.on_turn(Some(GameKind::Core), first_free_cell);
    client.on_ready(play_two);

    client.run()?;
    Ok(())
}
