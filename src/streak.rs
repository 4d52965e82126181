//! Streak engine.
//!
//! A streak counts consecutive calendar days with one credited log each.
//! [`advance_streak`] is the only transition that grows a streak; it is pure
//! and never mutates its input.
//!
//! | days since last log | result                         |
//! |---------------------|--------------------------------|
//! | never logged        | `{today, 1}`                   |
//! | 0                   | unchanged                      |
//! | 1                   | `{today, streak + 1}`          |
//! | > 1                 | `{today, 1}`                   |
//! | < 0                 | rejected, `InconsistentState`  |

use serde::{Deserialize, Serialize};

use crate::datekey::{diff_days, DateKey};
use crate::error::{Error, Result};

/// Persisted streak for one goal.
///
/// `streak == 0` with a stale `last_logged_date` is valid: it records a
/// broken streak whose last activity is still known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    #[serde(default)]
    pub last_logged_date: Option<DateKey>,
    #[serde(default)]
    pub streak: u32,
}

/// Display classification of a streak relative to today. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakStatus {
    NoSessions,
    LoggedToday,
    DueToday,
    AtRisk,
    /// Last log is in the future; clock or persisted date moved backward.
    Inconsistent,
}

/// Credit a log for `today`.
pub fn advance_streak(state: &StreakState, today: DateKey) -> Result<StreakState> {
    let Some(last) = state.last_logged_date else {
        return Ok(StreakState {
            last_logged_date: Some(today),
            streak: 1,
        });
    };

    match diff_days(last, today) {
        0 => Ok(state.clone()),
        1 => Ok(StreakState {
            last_logged_date: Some(today),
            streak: state.streak.saturating_add(1),
        }),
        d if d > 1 => Ok(StreakState {
            last_logged_date: Some(today),
            streak: 1,
        }),
        _ => Err(Error::InconsistentState {
            last_logged: last,
            today,
        }),
    }
}

/// Explicit user reset.
pub fn reset_streak() -> StreakState {
    StreakState::default()
}

impl StreakStatus {
    pub fn classify(state: &StreakState, today: DateKey) -> Self {
        match state.last_logged_date {
            None => StreakStatus::NoSessions,
            Some(last) => match diff_days(last, today) {
                0 => StreakStatus::LoggedToday,
                1 => StreakStatus::DueToday,
                d if d > 1 => StreakStatus::AtRisk,
                _ => StreakStatus::Inconsistent,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreakStatus::NoSessions => "no sessions yet",
            StreakStatus::LoggedToday => "logged today",
            StreakStatus::DueToday => "due today",
            StreakStatus::AtRisk => "at risk (next log starts over)",
            StreakStatus::Inconsistent => "inconsistent (last log is in the future)",
        }
    }
}

impl StreakState {
    pub fn status(&self, today: DateKey) -> StreakStatus {
        StreakStatus::classify(self, today)
    }

    /// Whether the streak can still be extended without starting over.
    pub fn is_alive(&self, today: DateKey) -> bool {
        matches!(
            self.status(today),
            StreakStatus::LoggedToday | StreakStatus::DueToday
        )
    }

    /// Streak as it should be shown today: a lapsed streak reads as 0
    /// without touching the stored value.
    pub fn display_streak(&self, today: DateKey) -> u32 {
        if self.is_alive(today) {
            self.streak
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DateKey {
        s.parse().expect("date key")
    }

    fn state(last: &str, streak: u32) -> StreakState {
        StreakState {
            last_logged_date: Some(key(last)),
            streak,
        }
    }

    #[test]
    fn first_log_starts_at_one() {
        for day in ["2024-01-01", "1999-12-31", "2030-06-15"] {
            let next = advance_streak(&StreakState::default(), key(day)).expect("advance");
            assert_eq!(next, state(day, 1));
        }
    }

    #[test]
    fn same_day_log_is_idempotent() {
        let samples = [
            StreakState::default(),
            state("2024-01-01", 4),
            state("2024-01-09", 0),
            state("2023-12-31", 17),
        ];
        let today = key("2024-01-10");
        for s in samples {
            let once = advance_streak(&s, today).expect("once");
            let twice = advance_streak(&once, today).expect("twice");
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn consecutive_day_increments() {
        let next = advance_streak(&state("2024-02-28", 6), key("2024-02-29")).expect("advance");
        assert_eq!(next, state("2024-02-29", 7));
    }

    #[test]
    fn gap_resets_to_one() {
        for streak in [0, 1, 9, 200] {
            let next =
                advance_streak(&state("2024-01-01", streak), key("2024-01-03")).expect("advance");
            assert_eq!(next.streak, 1);
            assert_eq!(next.last_logged_date, Some(key("2024-01-03")));
        }
    }

    #[test]
    fn negative_diff_is_rejected_without_mutation() {
        let before = state("2024-01-05", 3);
        let err = advance_streak(&before, key("2024-01-04")).unwrap_err();
        assert!(matches!(err, Error::InconsistentState { .. }));
        assert_eq!(before, state("2024-01-05", 3));
    }

    #[test]
    fn reset_always_clears() {
        assert_eq!(reset_streak(), StreakState::default());
        assert_eq!(reset_streak().last_logged_date, None);
        assert_eq!(reset_streak().streak, 0);
    }

    #[test]
    fn scenario_log_week() {
        let s0 = StreakState::default();
        let s1 = advance_streak(&s0, key("2024-01-01")).expect("day 1");
        assert_eq!(s1, state("2024-01-01", 1));
        let s2 = advance_streak(&s1, key("2024-01-01")).expect("repeat");
        assert_eq!(s2, s1);
        let s3 = advance_streak(&s2, key("2024-01-02")).expect("day 2");
        assert_eq!(s3, state("2024-01-02", 2));
        let s4 = advance_streak(&s3, key("2024-01-10")).expect("gap");
        assert_eq!(s4, state("2024-01-10", 1));
    }

    #[test]
    fn status_classification() {
        let today = key("2024-05-10");
        assert_eq!(
            StreakStatus::classify(&StreakState::default(), today),
            StreakStatus::NoSessions
        );
        assert_eq!(state("2024-05-10", 2).status(today), StreakStatus::LoggedToday);
        assert_eq!(state("2024-05-09", 2).status(today), StreakStatus::DueToday);
        assert_eq!(state("2024-05-01", 2).status(today), StreakStatus::AtRisk);
        assert_eq!(state("2024-05-11", 2).status(today), StreakStatus::Inconsistent);
    }

    #[test]
    fn display_streak_hides_lapsed_count() {
        let today = key("2024-05-10");
        assert_eq!(state("2024-05-09", 5).display_streak(today), 5);
        assert_eq!(state("2024-05-07", 5).display_streak(today), 0);
        assert_eq!(state("2024-05-07", 5).streak, 5);
    }
}
