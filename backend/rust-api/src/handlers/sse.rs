use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::timer::{GameCompleteEvent, TimerEvent, TimerTick},
    services::{game_registry::GameRegistry, AppState},
};

use super::ApiError;

/// SSE endpoint for game timer events
/// GET /api/v1/games/{player_id}/stream
pub async fn game_stream(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.games.contains(&player_id).await {
        return Err(ApiError::not_found(format!(
            "No active game for player {}",
            player_id
        )));
    }

    let tick_interval = state.config.quiz.tick_interval_ms;
    tracing::info!(
        "Client connected to game stream: player={}, tick_interval={}ms",
        player_id,
        tick_interval
    );

    let stream = create_game_stream(
        state.games.clone(),
        player_id,
        Duration::from_millis(tick_interval),
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

struct Snapshot {
    question_index: usize,
    elapsed_seconds: u64,
    answered: bool,
    completed: bool,
    score: u32,
}

/// Decrements the connection gauge when the stream is dropped.
struct ConnectionGuard;

impl ConnectionGuard {
    fn new() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        ConnectionGuard
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// One `timer-tick` per interval until the game completes, then a single
/// `game-complete`. Ends quietly if the game is removed.
fn create_game_stream(
    games: Arc<GameRegistry>,
    player_id: String,
    interval: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (games, player_id, ConnectionGuard::new(), true, false),
        move |(games, pid, guard, first, final_sent)| async move {
            if final_sent {
                return None;
            }
            if !first {
                sleep(interval).await;
            }

            let snapshot = games
                .with_game(&pid, |game| {
                    let session = game.engine.session();
                    let state = game.engine.state();
                    Snapshot {
                        question_index: session.current_index,
                        elapsed_seconds: session.elapsed_seconds,
                        answered: !state.is_awaiting_answer(),
                        completed: state.is_completed(),
                        score: session.score,
                    }
                })
                .await;

            let Some(snapshot) = snapshot else {
                tracing::info!("Game stream closed, game removed: player={}", pid);
                return None;
            };

            if snapshot.completed {
                let complete_event = TimerEvent::GameComplete(GameCompleteEvent {
                    player_id: pid.clone(),
                    score: snapshot.score,
                    elapsed_seconds: snapshot.elapsed_seconds,
                    timestamp: Utc::now(),
                });
                let event = Event::default()
                    .event(complete_event.event_name())
                    .data(complete_event.to_sse_data());

                tracing::info!("Game stream finished: player={}", pid);
                return Some((Ok(event), (games, pid, guard, false, true)));
            }

            let tick_event = TimerEvent::TimerTick(TimerTick {
                player_id: pid.clone(),
                question_index: snapshot.question_index,
                elapsed_seconds: snapshot.elapsed_seconds,
                answered: snapshot.answered,
                timestamp: Utc::now(),
            });
            let event = Event::default()
                .event(tick_event.event_name())
                .data(tick_event.to_sse_data());

            Some((Ok(event), (games, pid, guard, false, false)))
        },
    )
}
