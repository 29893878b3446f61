//! Points for a correct answer: base points plus a response-time bonus, scaled
//! by the streak multiplier once the streak reaches [`STREAK_THRESHOLD`].

pub const BASE_POINTS: u32 = 10;
pub const STREAK_THRESHOLD: u32 = 3;

const BASE_MULTIPLIER_TENTHS: u32 = 10;
const MAX_MULTIPLIER_TENTHS: u32 = 20;

/// Speed tiers: under 5s, under 10s, under 15s.
pub fn speed_bonus(response_time_seconds: f64) -> u32 {
    if response_time_seconds.is_nan() {
        0
    } else if response_time_seconds < 5.0 {
        5
    } else if response_time_seconds < 10.0 {
        3
    } else if response_time_seconds < 15.0 {
        1
    } else {
        0
    }
}

/// Multiplier in tenths: 1.0 below the threshold, then +0.1 per extra answer, capped at 2.0.
pub fn streak_multiplier_tenths(streak: u32) -> u32 {
    if streak < STREAK_THRESHOLD {
        return BASE_MULTIPLIER_TENTHS;
    }
    BASE_MULTIPLIER_TENTHS
        .saturating_add(streak - (STREAK_THRESHOLD - 1))
        .min(MAX_MULTIPLIER_TENTHS)
}

pub fn streak_multiplier(streak: u32) -> f64 {
    streak_multiplier_tenths(streak) as f64 / 10.0
}

/// `round(points * multiplier)` with halves rounded up, in exact integer arithmetic.
pub fn apply_multiplier(points: u32, multiplier_tenths: u32) -> u32 {
    (points * multiplier_tenths + 5) / 10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub base_points: u32,
    pub speed_bonus: u32,
    pub multiplier_tenths: u32,
    pub points_awarded: u32,
}

impl ScoreBreakdown {
    pub fn multiplier(&self) -> f64 {
        self.multiplier_tenths as f64 / 10.0
    }
}

/// Scores a correct answer. `streak` is the streak including this answer.
pub fn score_correct(response_time_seconds: f64, streak: u32) -> ScoreBreakdown {
    let speed_bonus = speed_bonus(response_time_seconds);
    let base_points = BASE_POINTS + speed_bonus;
    let multiplier_tenths = streak_multiplier_tenths(streak);

    ScoreBreakdown {
        base_points,
        speed_bonus,
        multiplier_tenths,
        points_awarded: apply_multiplier(base_points, multiplier_tenths),
    }
}
