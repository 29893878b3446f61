use std::sync::Arc;

use crate::errors::QuizError;
use crate::models::game::{
    AnswerEvent, GameSession, GameSessionRecord, GameStats, QuizSignal, QuizState, TimedSignal,
};
use crate::models::Question;

use super::catalog::QuestionCatalog;
use super::clock::Clock;
use super::scoring::{self, STREAK_THRESHOLD};

/// How long celebration/feedback signals stay visible.
pub const DEFAULT_SIGNAL_DISPLAY_MS: u64 = 2000;
/// Recorded in place of a response time that is NaN or infinite.
pub const MAX_RECORDED_RESPONSE_SECONDS: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub event: AnswerEvent,
    pub correct_index: usize,
    pub explanation: String,
    pub signals: Vec<TimedSignal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    NextQuestion { index: usize },
    Completed { signal: TimedSignal },
}

/// Scoring and progress state machine for one player.
///
/// `AwaitingAnswer(i)` --submit--> `Answered(i)` --advance--> `AwaitingAnswer(i + 1)`,
/// and `advance` from the last question ends in `Completed`. Operations run to
/// completion on the caller; persistence and timers live outside.
pub struct QuizEngine {
    catalog: Arc<QuestionCatalog>,
    clock: Arc<dyn Clock>,
    session: GameSession,
    state: QuizState,
    question_shown_at: chrono::DateTime<chrono::Utc>,
    signals: Vec<TimedSignal>,
    signal_display_ms: u64,
}

impl QuizEngine {
    pub fn new(catalog: Arc<QuestionCatalog>, clock: Arc<dyn Clock>) -> Self {
        let question_shown_at = clock.now();
        Self {
            catalog,
            clock,
            session: GameSession::default(),
            state: QuizState::AwaitingAnswer { index: 0 },
            question_shown_at,
            signals: Vec::new(),
            signal_display_ms: DEFAULT_SIGNAL_DISPLAY_MS,
        }
    }

    /// Rebuilds an engine from a persisted record.
    pub fn restore(
        catalog: Arc<QuestionCatalog>,
        clock: Arc<dyn Clock>,
        record: &GameSessionRecord,
    ) -> Result<Self, QuizError> {
        let index = record.current_question as usize;
        if index >= catalog.len() {
            return Err(QuizError::QuestionOutOfRange {
                index,
                total: catalog.len(),
            });
        }

        let state = if record.completed {
            QuizState::Completed
        } else if record.answered_current {
            QuizState::Answered {
                index,
                selected: None,
            }
        } else {
            QuizState::AwaitingAnswer { index }
        };

        let mut engine = Self::new(catalog, clock);
        engine.session = GameSession {
            current_index: index,
            score: record.score,
            streak: record.current_streak,
            best_streak: record.best_streak.max(record.current_streak),
            correct_count: record.correct_answers,
            wrong_count: record.wrong_answers,
            attempts: record.correct_answers + record.wrong_answers,
            avg_response_time_seconds: record.avg_response_time,
            elapsed_seconds: record.time_spent,
            progress: record.progress,
            completed: record.completed,
        };
        engine.state = state;
        Ok(engine)
    }

    pub fn with_signal_display_ms(mut self, display_ms: u64) -> Self {
        self.signal_display_ms = display_ms;
        self
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// The question on screen; `None` once the game is completed.
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            QuizState::Completed => None,
            QuizState::AwaitingAnswer { index } | QuizState::Answered { index, .. } => {
                self.catalog.get(index)
            }
        }
    }

    /// Submits with the response time measured from when the question was shown.
    pub fn submit_answer_timed(&mut self, selected_index: usize) -> Result<AnswerOutcome, QuizError> {
        let elapsed = self.clock.now() - self.question_shown_at;
        let response_time_seconds = elapsed.num_milliseconds().max(0) as f64 / 1000.0;
        self.submit_answer(selected_index, response_time_seconds)
    }

    pub fn submit_answer(
        &mut self,
        selected_index: usize,
        response_time_seconds: f64,
    ) -> Result<AnswerOutcome, QuizError> {
        let index = match self.state {
            QuizState::AwaitingAnswer { index } => index,
            QuizState::Answered { index, .. } => return Err(QuizError::AlreadyAnswered { index }),
            QuizState::Completed => return Err(QuizError::GameCompleted),
        };

        let catalog = Arc::clone(&self.catalog);
        let question = catalog.get(index).ok_or(QuizError::QuestionOutOfRange {
            index,
            total: catalog.len(),
        })?;
        if selected_index >= question.options.len() {
            return Err(QuizError::InvalidSelection {
                selected: selected_index,
                options: question.options.len(),
            });
        }

        // unknown or endless times earn no speed bonus; the average stays finite
        let response_time = if response_time_seconds.is_nan() {
            MAX_RECORDED_RESPONSE_SECONDS
        } else {
            response_time_seconds.clamp(0.0, MAX_RECORDED_RESPONSE_SECONDS)
        };
        let is_correct = selected_index == question.correct_index;
        let now = self.clock.now();
        let display_ms = self.signal_display_ms;
        let timed = |signal| TimedSignal {
            signal,
            emitted_at: now,
            display_ms,
        };

        let session = &mut self.session;
        session.avg_response_time_seconds = if session.attempts == 0 {
            response_time
        } else {
            (session.avg_response_time_seconds * session.attempts as f64 + response_time)
                / (session.attempts + 1) as f64
        };
        session.attempts += 1;

        let mut signals = Vec::with_capacity(2);
        let (points_awarded, speed_bonus, multiplier) = if is_correct {
            session.streak += 1;
            let breakdown = scoring::score_correct(response_time, session.streak);
            session.score += breakdown.points_awarded;
            session.correct_count += 1;
            session.best_streak = session.best_streak.max(session.streak);

            signals.push(timed(QuizSignal::Correct {
                points: breakdown.points_awarded,
                speed_bonus: breakdown.speed_bonus,
                multiplier: breakdown.multiplier(),
                streak: session.streak,
            }));
            if session.streak >= STREAK_THRESHOLD {
                signals.push(timed(QuizSignal::StreakBanner {
                    streak: session.streak,
                    multiplier: breakdown.multiplier(),
                }));
            }
            (
                breakdown.points_awarded,
                breakdown.speed_bonus,
                breakdown.multiplier(),
            )
        } else {
            session.streak = 0;
            session.wrong_count += 1;
            signals.push(timed(QuizSignal::Incorrect {
                correct_index: question.correct_index,
                explanation: question.explanation.clone(),
            }));
            (0, 0, 1.0)
        };

        session.progress = (index + 1) as f64 / catalog.len() as f64 * 100.0;
        self.state = QuizState::Answered {
            index,
            selected: Some(selected_index),
        };
        self.signals.extend(signals.iter().cloned());

        Ok(AnswerOutcome {
            event: AnswerEvent {
                question_id: question.id,
                selected_index,
                is_correct,
                response_time_seconds: response_time,
                points_awarded,
                speed_bonus,
                streak_multiplier_applied: multiplier,
            },
            correct_index: question.correct_index,
            explanation: question.explanation.clone(),
            signals,
        })
    }

    pub fn advance(&mut self) -> Result<AdvanceOutcome, QuizError> {
        let index = match self.state {
            QuizState::Answered { index, .. } => index,
            QuizState::AwaitingAnswer { index } => return Err(QuizError::NotAnswered { index }),
            QuizState::Completed => return Err(QuizError::GameCompleted),
        };

        if index >= self.catalog.last_index() {
            self.session.completed = true;
            self.state = QuizState::Completed;
            let signal = TimedSignal {
                signal: QuizSignal::GameComplete {
                    score: self.session.score,
                    correct_count: self.session.correct_count,
                    total_questions: self.catalog.len(),
                    best_streak: self.session.best_streak,
                },
                emitted_at: self.clock.now(),
                display_ms: self.signal_display_ms,
            };
            self.signals.push(signal.clone());
            return Ok(AdvanceOutcome::Completed { signal });
        }

        let next = index + 1;
        self.session.current_index = next;
        self.state = QuizState::AwaitingAnswer { index: next };
        self.question_shown_at = self.clock.now();
        Ok(AdvanceOutcome::NextQuestion { index: next })
    }

    /// Abandons the current run, from any state.
    pub fn restart(&mut self) {
        self.session = GameSession::default();
        self.state = QuizState::AwaitingAnswer { index: 0 };
        self.question_shown_at = self.clock.now();
        self.signals.clear();
    }

    /// One second of wall-clock time. Paused while an answer is on screen.
    pub fn tick(&mut self) -> bool {
        if self.state.is_awaiting_answer() {
            self.session.elapsed_seconds += 1;
            true
        } else {
            false
        }
    }

    /// Signals still on screen; expired ones are discarded.
    pub fn active_signals(&mut self) -> Vec<TimedSignal> {
        let now = self.clock.now();
        self.signals.retain(|signal| !signal.is_expired(now));
        self.signals.clone()
    }

    pub fn stats(&self) -> GameStats {
        let session = &self.session;
        let accuracy = if session.attempts == 0 {
            0.0
        } else {
            session.correct_count as f64 / session.attempts as f64 * 100.0
        };

        GameStats {
            current_index: session.current_index,
            total_questions: self.catalog.len(),
            score: session.score,
            streak: session.streak,
            best_streak: session.best_streak,
            correct_count: session.correct_count,
            wrong_count: session.wrong_count,
            attempts: session.attempts,
            accuracy,
            avg_response_time_seconds: session.avg_response_time_seconds,
            elapsed_seconds: session.elapsed_seconds,
            progress: session.progress,
            completed: session.completed,
        }
    }

    pub fn to_record(&self, player_id: &str, display_name: Option<&str>) -> GameSessionRecord {
        let session = &self.session;
        GameSessionRecord {
            player_id: player_id.to_string(),
            display_name: display_name.map(str::to_string),
            current_question: session.current_index as u32,
            score: session.score,
            progress: session.progress,
            completed: session.completed,
            correct_answers: session.correct_count,
            wrong_answers: session.wrong_count,
            attempts: session.attempts,
            avg_response_time: session.avg_response_time_seconds,
            current_streak: session.streak,
            best_streak: session.best_streak,
            time_spent: session.elapsed_seconds,
            answered_current: matches!(self.state, QuizState::Answered { .. }),
            last_updated: self.clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use chrono::Utc;

    fn catalog(total: u32) -> Arc<QuestionCatalog> {
        let questions = (1..=total)
            .map(|id| Question {
                id,
                prompt: format!("Question {}", id),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index: (id as usize) % 4,
                explanation: format!("Explanation {}", id),
            })
            .collect();
        Arc::new(QuestionCatalog::from_questions("test", questions).unwrap())
    }

    fn engine(total: u32) -> (QuizEngine, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let engine = QuizEngine::new(catalog(total), Arc::new(clock.clone()));
        (engine, clock)
    }

    fn correct(engine: &QuizEngine) -> usize {
        engine.current_question().unwrap().correct_index
    }

    fn wrong(engine: &QuizEngine) -> usize {
        (correct(engine) + 1) % 4
    }

    fn answer_and_advance(engine: &mut QuizEngine, is_correct: bool, secs: f64) -> AnswerOutcome {
        let selected = if is_correct {
            correct(engine)
        } else {
            wrong(engine)
        };
        let outcome = engine.submit_answer(selected, secs).unwrap();
        engine.advance().unwrap();
        outcome
    }

    #[test]
    fn first_three_fast_answers_score_15_30_47() {
        let (mut engine, _) = engine(15);

        let expected = [(1, 1.0, 15, 15), (2, 1.0, 15, 30), (3, 1.1, 17, 47)];
        for (streak, multiplier, points, score) in expected {
            let outcome = answer_and_advance(&mut engine, true, 4.0);
            assert_eq!(outcome.event.points_awarded, points);
            assert_eq!(outcome.event.streak_multiplier_applied, multiplier);
            assert_eq!(outcome.event.speed_bonus, 5);
            assert_eq!(engine.session().streak, streak);
            assert_eq!(engine.session().score, score);
        }
    }

    #[test]
    fn consecutive_fast_answers_follow_the_multiplier_formula() {
        let (mut engine, _) = engine(15);

        let mut expected = 0;
        for k in 1..=15u32 {
            let tenths = if k < 3 { 10 } else { (10 + k - 2).min(20) };
            expected += (15 * tenths + 5) / 10;
            let selected = correct(&engine);
            engine.submit_answer(selected, 2.5).unwrap();
            assert_eq!(engine.session().score, expected, "after {} answers", k);
            if k < 15 {
                engine.advance().unwrap();
            }
        }
    }

    #[test]
    fn wrong_first_answer() {
        let (mut engine, _) = engine(15);
        let selected = wrong(&engine);

        let outcome = engine.submit_answer(selected, 3.0).unwrap();

        assert!(!outcome.event.is_correct);
        assert_eq!(outcome.event.points_awarded, 0);
        let session = engine.session();
        assert_eq!(session.wrong_count, 1);
        assert_eq!(session.attempts, 1);
        assert_eq!(session.streak, 0);
        assert_eq!(session.score, 0);
        assert!(matches!(
            outcome.signals[0].signal,
            QuizSignal::Incorrect { .. }
        ));
    }

    #[test]
    fn wrong_answer_resets_streak_but_not_best_streak() {
        let (mut engine, _) = engine(15);
        let mut best_seen = 0;

        let pattern = [true, true, true, true, false, true, false, true, true];
        for is_correct in pattern {
            answer_and_advance(&mut engine, is_correct, 8.0);
            let session = engine.session();
            if !is_correct {
                assert_eq!(session.streak, 0);
            }
            assert!(session.best_streak >= best_seen);
            best_seen = session.best_streak;
            assert_eq!(session.attempts, session.correct_count + session.wrong_count);
        }

        assert_eq!(engine.session().best_streak, 4);
        assert_eq!(engine.session().streak, 2);
    }

    #[test]
    fn second_submission_is_rejected_without_side_effects() {
        let (mut engine, _) = engine(15);
        let selected = correct(&engine);
        engine.submit_answer(selected, 1.0).unwrap();
        let before = engine.session().clone();

        let err = engine.submit_answer(selected, 1.0).unwrap_err();

        assert_eq!(err, QuizError::AlreadyAnswered { index: 0 });
        assert_eq!(engine.session(), &before);
    }

    #[test]
    fn out_of_range_selection_is_rejected_without_side_effects() {
        let (mut engine, _) = engine(15);

        let err = engine.submit_answer(4, 1.0).unwrap_err();

        assert_eq!(
            err,
            QuizError::InvalidSelection {
                selected: 4,
                options: 4
            }
        );
        assert_eq!(engine.session(), &GameSession::default());
        assert!(engine.state().is_awaiting_answer());
    }

    #[test]
    fn advance_requires_an_answer() {
        let (mut engine, _) = engine(3);
        assert_eq!(
            engine.advance().unwrap_err(),
            QuizError::NotAnswered { index: 0 }
        );
    }

    #[test]
    fn progress_reaches_100_on_last_answer_and_game_completes() {
        let (mut engine, _) = engine(4);
        for _ in 0..3 {
            answer_and_advance(&mut engine, true, 6.0);
        }
        assert_eq!(engine.session().progress, 75.0);

        let selected = correct(&engine);
        engine.submit_answer(selected, 6.0).unwrap();
        assert_eq!(engine.session().progress, 100.0);
        assert!(!engine.session().completed);

        let outcome = engine.advance().unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Completed { .. }));
        assert!(engine.state().is_completed());
        assert!(engine.session().completed);
        assert!(engine.current_question().is_none());
        assert_eq!(
            engine.submit_answer(0, 1.0).unwrap_err(),
            QuizError::GameCompleted
        );
    }

    #[test]
    fn restart_resets_everything() {
        let (mut engine, _) = engine(3);
        for _ in 0..3 {
            answer_and_advance(&mut engine, true, 1.0);
        }
        assert!(engine.state().is_completed());

        engine.restart();

        assert_eq!(engine.session(), &GameSession::default());
        assert_eq!(engine.state(), QuizState::AwaitingAnswer { index: 0 });
        assert!(engine.active_signals().is_empty());
    }

    #[test]
    fn restart_mid_game() {
        let (mut engine, _) = engine(5);
        answer_and_advance(&mut engine, true, 1.0);
        let selected = wrong(&engine);
        engine.submit_answer(selected, 1.0).unwrap();

        engine.restart();

        assert_eq!(engine.session(), &GameSession::default());
        assert_eq!(engine.state(), QuizState::AwaitingAnswer { index: 0 });
    }

    #[test]
    fn running_average_response_time() {
        let (mut engine, _) = engine(5);
        answer_and_advance(&mut engine, true, 4.0);
        answer_and_advance(&mut engine, false, 8.0);
        answer_and_advance(&mut engine, true, 12.0);

        assert!((engine.session().avg_response_time_seconds - 8.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_response_time_earns_no_speed_bonus() {
        let (mut engine, _) = engine(5);

        for time in [f64::NAN, f64::INFINITY] {
            let selected = correct(&engine);
            let outcome = engine.submit_answer(selected, time).unwrap();
            assert_eq!(outcome.event.speed_bonus, 0);
            assert_eq!(outcome.event.points_awarded, 10);
            assert!(outcome.event.response_time_seconds.is_finite());
            engine.advance().unwrap();
        }

        let selected = correct(&engine);
        let outcome = engine.submit_answer(selected, -3.0).unwrap();
        assert_eq!(outcome.event.response_time_seconds, 0.0);
        assert_eq!(outcome.event.speed_bonus, 5);
        assert!(engine.session().avg_response_time_seconds.is_finite());
    }

    #[test]
    fn timed_submission_uses_clock_since_question_shown() {
        let (mut engine, clock) = engine(5);
        clock.advance_secs(7.0);
        let selected = correct(&engine);

        let outcome = engine.submit_answer_timed(selected).unwrap();

        assert_eq!(outcome.event.response_time_seconds, 7.0);
        assert_eq!(outcome.event.speed_bonus, 3);

        engine.advance().unwrap();
        clock.advance_secs(2.0);
        let selected = correct(&engine);
        let outcome = engine.submit_answer_timed(selected).unwrap();
        assert_eq!(outcome.event.response_time_seconds, 2.0);
    }

    #[test]
    fn tick_pauses_while_answered_and_after_completion() {
        let (mut engine, _) = engine(1);
        assert!(engine.tick());
        assert!(engine.tick());
        let selected = correct(&engine);
        engine.submit_answer(selected, 1.0).unwrap();
        assert!(!engine.tick());
        engine.advance().unwrap();
        assert!(!engine.tick());
        assert_eq!(engine.session().elapsed_seconds, 2);
    }

    #[test]
    fn signals_expire_after_display_duration() {
        let (engine, clock) = engine(5);
        let mut engine = engine.with_signal_display_ms(2000);
        for _ in 0..2 {
            answer_and_advance(&mut engine, true, 1.0);
        }
        let selected = correct(&engine);
        let outcome = engine.submit_answer(selected, 1.0).unwrap();
        assert!(matches!(
            outcome.signals[1].signal,
            QuizSignal::StreakBanner { streak: 3, .. }
        ));
        assert_eq!(engine.active_signals().len(), 4);

        clock.advance_millis(1999);
        assert_eq!(engine.active_signals().len(), 4);

        clock.advance_millis(1);
        assert!(engine.active_signals().is_empty());
    }

    #[test]
    fn record_round_trip_restores_counters() {
        let (mut engine, clock) = engine(6);
        answer_and_advance(&mut engine, true, 1.0);
        answer_and_advance(&mut engine, false, 9.0);
        engine.tick();
        let record = engine.to_record("player-1", Some("Ada"));
        assert_eq!(record.current_question, 2);
        assert!(!record.answered_current);

        let restored = QuizEngine::restore(engine.catalog.clone(), Arc::new(clock), &record).unwrap();

        assert_eq!(restored.session(), engine.session());
        assert_eq!(restored.state(), QuizState::AwaitingAnswer { index: 2 });
    }

    #[test]
    fn record_written_after_answer_cannot_be_answered_again() {
        let (mut engine, clock) = engine(6);
        let selected = correct(&engine);
        engine.submit_answer(selected, 1.0).unwrap();
        let record = engine.to_record("player-1", None);
        assert!(record.answered_current);

        let mut restored =
            QuizEngine::restore(engine.catalog.clone(), Arc::new(clock), &record).unwrap();

        assert_eq!(
            restored.submit_answer(selected, 1.0).unwrap_err(),
            QuizError::AlreadyAnswered { index: 0 }
        );
        assert!(matches!(
            restored.advance().unwrap(),
            AdvanceOutcome::NextQuestion { index: 1 }
        ));
    }

    #[test]
    fn restore_rejects_index_outside_catalog() {
        let (engine, clock) = engine(3);
        let mut record = engine.to_record("p", None);
        record.current_question = 3;

        let result = QuizEngine::restore(engine.catalog.clone(), Arc::new(clock), &record);

        assert!(matches!(
            result,
            Err(QuizError::QuestionOutOfRange { index: 3, total: 3 })
        ));
    }
}
