use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::quiz_engine::QuizEngine;

/// One player's live game: the engine plus the timer driving it.
pub struct ActiveGame {
    pub engine: QuizEngine,
    pub display_name: Option<String>,
    timer: Option<GameTimer>,
}

impl ActiveGame {
    pub fn new(engine: QuizEngine, display_name: Option<String>) -> Self {
        Self {
            engine,
            display_name,
            timer: None,
        }
    }

    /// Starts the timer unless one is already running or the game is over.
    pub fn ensure_timer(&mut self, registry: Weak<GameRegistry>, player_id: &str, interval: Duration) {
        if self.engine.state().is_completed() {
            return;
        }
        if self.timer.as_ref().is_some_and(|timer| !timer.is_finished()) {
            return;
        }
        self.timer = Some(GameTimer::spawn(registry, player_id.to_string(), interval));
    }

    pub fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
    }

    pub fn timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }
}

/// What a start request finds for the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingGame {
    /// A game in progress; it stays registered.
    InProgress,
    /// A completed game; it has been removed.
    Finished { display_name: Option<String> },
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ticked { elapsed_seconds: u64 },
    Paused,
    Finished,
    Missing,
}

/// Active games keyed by player id. Each game is mutated by one caller at a
/// time under the registry lock.
#[derive(Default)]
pub struct GameRegistry {
    games: Mutex<HashMap<String, ActiveGame>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a game, tearing down any previous one for the player.
    /// Keeps a game in progress, clears out a completed one.
    pub async fn take_finished(&self, player_id: &str) -> ExistingGame {
        let mut games = self.games.lock().await;
        let finished = match games.get(player_id) {
            None => return ExistingGame::None,
            Some(game) => game.engine.state().is_completed(),
        };
        if !finished {
            return ExistingGame::InProgress;
        }

        let mut game = match games.remove(player_id) {
            Some(game) => game,
            None => return ExistingGame::None,
        };
        game.stop_timer();
        ExistingGame::Finished {
            display_name: game.display_name.take(),
        }
    }

    /// Registers `game` unless a game in progress is already registered for
    /// the player, in which case `game` is handed back untouched. A completed
    /// game is replaced.
    pub async fn insert_if_vacant(&self, player_id: &str, game: ActiveGame) -> Result<(), ActiveGame> {
        let mut games = self.games.lock().await;
        if let Some(existing) = games.get_mut(player_id) {
            if !existing.engine.state().is_completed() {
                return Err(game);
            }
            existing.stop_timer();
        }
        games.insert(player_id.to_string(), game);
        Ok(())
    }

    pub async fn remove(&self, player_id: &str) -> Option<ActiveGame> {
        let mut removed = self.games.lock().await.remove(player_id);
        if let Some(game) = removed.as_mut() {
            game.stop_timer();
        }
        removed
    }

    pub async fn contains(&self, player_id: &str) -> bool {
        self.games.lock().await.contains_key(player_id)
    }

    /// Runs `f` against the player's game; `None` if there is no such game.
    pub async fn with_game<R>(
        &self,
        player_id: &str,
        f: impl FnOnce(&mut ActiveGame) -> R,
    ) -> Option<R> {
        let mut games = self.games.lock().await;
        games.get_mut(player_id).map(f)
    }

    pub async fn tick(&self, player_id: &str) -> TickOutcome {
        let mut games = self.games.lock().await;
        let Some(game) = games.get_mut(player_id) else {
            return TickOutcome::Missing;
        };

        if game.engine.state().is_completed() {
            return TickOutcome::Finished;
        }
        if game.engine.tick() {
            TickOutcome::Ticked {
                elapsed_seconds: game.engine.session().elapsed_seconds,
            }
        } else {
            TickOutcome::Paused
        }
    }

    /// Games that are not completed yet.
    pub async fn active_count(&self) -> usize {
        self.games
            .lock()
            .await
            .values()
            .filter(|game| !game.engine.state().is_completed())
            .count()
    }

    pub async fn len(&self) -> usize {
        self.games.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.lock().await.is_empty()
    }
}

/// Periodic tick task for one game. Aborted when dropped, and exits on its own
/// once the game completes or disappears from the registry.
pub struct GameTimer {
    handle: JoinHandle<()>,
}

impl GameTimer {
    pub fn spawn(registry: Weak<GameRegistry>, player_id: String, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                match registry.tick(&player_id).await {
                    TickOutcome::Ticked { elapsed_seconds } => {
                        tracing::debug!("Game tick: player={}, elapsed={}s", player_id, elapsed_seconds);
                    }
                    TickOutcome::Paused => {}
                    TickOutcome::Finished | TickOutcome::Missing => {
                        tracing::debug!("Game timer stopped: player={}", player_id);
                        break;
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for GameTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Convenience for callers holding the registry behind an `Arc`.
pub fn weak(registry: &Arc<GameRegistry>) -> Weak<GameRegistry> {
    Arc::downgrade(registry)
}
