use std::sync::Arc;
use std::time::Duration;

use crate::errors::QuizError;
use crate::metrics::{
    record_persistence_failure, ANSWERS_REJECTED_TOTAL, ANSWERS_SUBMITTED_TOTAL, GAMES_ACTIVE,
    GAMES_TOTAL,
};
use crate::models::game::{
    AdvanceResponse, GameSessionRecord, GameView, PersistenceStatus, StartGameRequest,
    StartGameResponse, SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::models::PublicQuestion;

use super::catalog::QuestionCatalog;
use super::clock::Clock;
use super::game_registry::{weak, ActiveGame, ExistingGame, GameRegistry};
use super::leaderboard_service::LeaderboardService;
use super::quiz_engine::{AdvanceOutcome, QuizEngine};
use super::session_writer::SessionWriter;
use super::stores::SessionStore;
use super::AppState;

#[derive(Debug, thiserror::Error)]
pub enum GameServiceError {
    #[error("No active game for player {0}")]
    NotFound(String),

    #[error(transparent)]
    Quiz(#[from] QuizError),
}

#[derive(Debug, Clone, Copy)]
pub struct GameSettings {
    pub tick_interval: Duration,
    pub signal_display_ms: u64,
    pub persist_in_background: bool,
}

/// Drives one player's quiz: restores or starts the engine, applies
/// submissions, hands every new record to the session store, and refreshes
/// the leaderboard when a game completes.
pub struct GameService {
    catalog: Arc<QuestionCatalog>,
    registry: Arc<GameRegistry>,
    sessions: Arc<dyn SessionStore>,
    writer: SessionWriter,
    leaderboard: LeaderboardService,
    clock: Arc<dyn Clock>,
    settings: GameSettings,
}

impl GameService {
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        registry: Arc<GameRegistry>,
        sessions: Arc<dyn SessionStore>,
        writer: SessionWriter,
        leaderboard: LeaderboardService,
        clock: Arc<dyn Clock>,
        settings: GameSettings,
    ) -> Self {
        Self {
            catalog,
            registry,
            sessions,
            writer,
            leaderboard,
            clock,
            settings,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.catalog.clone(),
            state.games.clone(),
            state.sessions.clone(),
            state.session_writer.clone(),
            state.leaderboard_service(),
            state.clock.clone(),
            GameSettings {
                tick_interval: Duration::from_millis(state.config.quiz.tick_interval_ms),
                signal_display_ms: state.config.quiz.feedback_display_ms,
                persist_in_background: state.config.persistence.background,
            },
        )
    }

    /// Resumes the in-memory game if still in progress, else restores an
    /// unfinished stored one, else starts fresh. A failed load is treated as
    /// "nothing stored".
    pub async fn start_session(
        &self,
        req: StartGameRequest,
    ) -> Result<StartGameResponse, GameServiceError> {
        let player_id = req.player_id.as_str();

        let (engine, restored, known_name) = match self.registry.take_finished(player_id).await {
            ExistingGame::InProgress => return self.resume(player_id).await,
            // the store may still hold a pre-completion record
            ExistingGame::Finished { display_name } => (self.fresh_engine(), false, display_name),
            ExistingGame::None => self.load_or_fresh(player_id).await,
        };
        let engine = engine.with_signal_display_ms(self.settings.signal_display_ms);

        let display_name = req.display_name.clone().or(known_name);
        let record = engine.to_record(player_id, display_name.as_deref());

        let mut game = ActiveGame::new(engine, display_name);
        game.ensure_timer(weak(&self.registry), player_id, self.settings.tick_interval);
        if self.registry.insert_if_vacant(player_id, game).await.is_err() {
            // a concurrent start registered first; ours is dropped with its timer
            return self.resume(player_id).await;
        }

        GAMES_TOTAL
            .with_label_values(&[if restored { "restored" } else { "started" }])
            .inc();
        self.refresh_active_gauge().await;
        tracing::info!(
            "Game session started: player={}, restored={}, question={}",
            player_id,
            restored,
            record.current_question
        );

        let persistence = self.persist(record).await;
        let game = self.view(player_id, restored).await?;
        Ok(StartGameResponse { game, persistence })
    }

    async fn resume(&self, player_id: &str) -> Result<StartGameResponse, GameServiceError> {
        let game = self.view(player_id, true).await?;
        tracing::info!("Resuming active game for player={}", player_id);
        Ok(StartGameResponse {
            game,
            persistence: PersistenceStatus::Saved,
        })
    }

    async fn load_or_fresh(&self, player_id: &str) -> (QuizEngine, bool, Option<String>) {
        let stored = match self.sessions.load(player_id).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    "Failed to load stored session for player={}, starting fresh: {}",
                    player_id,
                    e
                );
                record_persistence_failure("load");
                None
            }
        };

        match stored {
            Some(record) if !record.completed => {
                match QuizEngine::restore(self.catalog.clone(), self.clock.clone(), &record) {
                    Ok(engine) => (engine, true, record.display_name),
                    Err(e) => {
                        tracing::warn!(
                            "Discarding stored session for player={}: {}",
                            player_id,
                            e
                        );
                        (self.fresh_engine(), false, record.display_name)
                    }
                }
            }
            Some(record) => (self.fresh_engine(), false, record.display_name),
            None => (self.fresh_engine(), false, None),
        }
    }

    pub async fn submit_answer(
        &self,
        player_id: &str,
        req: &SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, GameServiceError> {
        let result = self
            .registry
            .with_game(player_id, |game| {
                let outcome = match req.response_time_seconds {
                    Some(seconds) => game.engine.submit_answer(req.selected_index, seconds),
                    None => game.engine.submit_answer_timed(req.selected_index),
                }?;
                let record = game.engine.to_record(player_id, game.display_name.as_deref());
                Ok::<_, QuizError>((outcome, record, game.engine.stats()))
            })
            .await
            .ok_or_else(|| GameServiceError::NotFound(player_id.to_string()))?;

        let (outcome, record, stats) = match result {
            Ok(accepted) => accepted,
            Err(e) => {
                ANSWERS_REJECTED_TOTAL
                    .with_label_values(&[rejection_label(&e)])
                    .inc();
                tracing::info!("Answer rejected: player={}, reason={}", player_id, e);
                return Err(e.into());
            }
        };

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[if outcome.event.is_correct { "true" } else { "false" }])
            .inc();
        tracing::info!(
            "Answer processed: player={}, question={}, correct={}, points={}, streak={}",
            player_id,
            outcome.event.question_id,
            outcome.event.is_correct,
            outcome.event.points_awarded,
            stats.streak
        );

        let persistence = self.persist(record).await;

        Ok(SubmitAnswerResponse {
            event: outcome.event,
            correct_index: outcome.correct_index,
            explanation: outcome.explanation,
            stats,
            signals: outcome.signals,
            persistence,
        })
    }

    pub async fn advance(&self, player_id: &str) -> Result<AdvanceResponse, GameServiceError> {
        let (outcome, record) = self
            .registry
            .with_game(player_id, |game| {
                let outcome = game.engine.advance()?;
                if matches!(outcome, AdvanceOutcome::Completed { .. }) {
                    game.stop_timer();
                }
                let record = game.engine.to_record(player_id, game.display_name.as_deref());
                Ok::<_, QuizError>((outcome, record))
            })
            .await
            .ok_or_else(|| GameServiceError::NotFound(player_id.to_string()))??;

        let completed = matches!(outcome, AdvanceOutcome::Completed { .. });
        // the leaderboard below must see the final score
        let persistence = if completed {
            self.persist_and_wait(record).await
        } else {
            self.persist(record).await
        };

        let leaderboard = if completed {
            GAMES_TOTAL.with_label_values(&["completed"]).inc();
            self.refresh_active_gauge().await;
            tracing::info!("Game completed: player={}", player_id);
            Some(self.leaderboard.top().await)
        } else {
            None
        };

        let game = self.view(player_id, false).await?;
        Ok(AdvanceResponse {
            game,
            completed,
            leaderboard,
            persistence,
        })
    }

    /// Abandons the current run and starts over at the first question.
    pub async fn restart(&self, player_id: &str) -> Result<StartGameResponse, GameServiceError> {
        let registry = weak(&self.registry);
        let interval = self.settings.tick_interval;
        let record = self
            .registry
            .with_game(player_id, |game| {
                game.engine.restart();
                game.ensure_timer(registry, player_id, interval);
                game.engine.to_record(player_id, game.display_name.as_deref())
            })
            .await
            .ok_or_else(|| GameServiceError::NotFound(player_id.to_string()))?;

        GAMES_TOTAL.with_label_values(&["restarted"]).inc();
        self.refresh_active_gauge().await;
        tracing::info!("Game restarted: player={}", player_id);

        let persistence = self.persist(record).await;
        let game = self.view(player_id, false).await?;
        Ok(StartGameResponse { game, persistence })
    }

    pub async fn state(&self, player_id: &str) -> Result<GameView, GameServiceError> {
        self.view(player_id, false).await
    }

    /// Tears the game down: timer stopped, engine dropped. Stored state is kept.
    pub async fn end_session(&self, player_id: &str) -> Result<(), GameServiceError> {
        self.registry
            .remove(player_id)
            .await
            .ok_or_else(|| GameServiceError::NotFound(player_id.to_string()))?;

        GAMES_TOTAL.with_label_values(&["ended"]).inc();
        self.refresh_active_gauge().await;
        tracing::info!("Game session ended: player={}", player_id);
        Ok(())
    }

    fn fresh_engine(&self) -> QuizEngine {
        QuizEngine::new(self.catalog.clone(), self.clock.clone())
    }

    async fn view(&self, player_id: &str, restored: bool) -> Result<GameView, GameServiceError> {
        self.registry
            .with_game(player_id, |game| GameView {
                player_id: player_id.to_string(),
                display_name: game.display_name.clone(),
                state: game.engine.state(),
                question: game.engine.current_question().map(PublicQuestion::from),
                stats: game.engine.stats(),
                signals: game.engine.active_signals(),
                restored,
            })
            .await
            .ok_or_else(|| GameServiceError::NotFound(player_id.to_string()))
    }

    /// At-most-once write. Failures are logged and reported, never retried,
    /// and never roll back the in-memory game. Background writes go through
    /// the ordered writer.
    async fn persist(&self, record: GameSessionRecord) -> PersistenceStatus {
        if self.settings.persist_in_background {
            return self.writer.enqueue(record);
        }
        self.upsert_now(record).await
    }

    async fn persist_and_wait(&self, record: GameSessionRecord) -> PersistenceStatus {
        if self.settings.persist_in_background {
            return self.writer.save_and_wait(record).await;
        }
        self.upsert_now(record).await
    }

    async fn upsert_now(&self, record: GameSessionRecord) -> PersistenceStatus {
        match self.sessions.upsert(&record).await {
            Ok(()) => PersistenceStatus::Saved,
            Err(e) => {
                tracing::warn!(
                    "Session save failed, continuing in memory: player={}, error={}",
                    record.player_id,
                    e
                );
                record_persistence_failure("upsert");
                PersistenceStatus::Failed
            }
        }
    }

    async fn refresh_active_gauge(&self) {
        GAMES_ACTIVE.set(self.registry.active_count().await as i64);
    }
}

fn rejection_label(error: &QuizError) -> &'static str {
    match error {
        QuizError::AlreadyAnswered { .. } => "already_answered",
        QuizError::InvalidSelection { .. } => "invalid_selection",
        QuizError::NotAnswered { .. } => "not_answered",
        QuizError::GameCompleted => "completed",
        QuizError::QuestionOutOfRange { .. } => "out_of_range",
    }
}
