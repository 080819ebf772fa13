use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Error;

/// Shown when the user has never received an AI comment.
pub const NO_AI_COMMENT: &str = "AI 코멘트가 없습니다.";

/// Shown when the stamp lookup fails or no usable stamp is equipped.
pub const DEFAULT_STAMP_IMAGE: &str = "image/default_stamp.png";

/// Read model for the "my page" screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPageSummary {
    pub nickname: String,
    pub email: String,
    pub join_date: NaiveDate,
    /// Distinct calendar dates with at least one diary.
    pub total_diary_count: u32,
    /// Consecutive diary days ending yesterday.
    pub consecutive_diary_days: u32,
    /// Emotion tags of the most recent comment, each prefixed with `#`.
    pub main_emotions: Vec<String>,
    pub recent_ai_comment: String,
    pub recent_stamp_image: String,
    pub comment_time: i32,
}

/// How the consecutive-day streak is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreakPolicy {
    /// Return 0 without scanning when there is no diary yesterday.
    #[default]
    Gated,
    /// Always scan the full diary history.
    Ungated,
}

impl StreakPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakPolicy::Gated => "gated",
            StreakPolicy::Ungated => "ungated",
        }
    }
}

impl fmt::Display for StreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreakPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gated" => Ok(StreakPolicy::Gated),
            "ungated" => Ok(StreakPolicy::Ungated),
            other => Err(Error::Config(format!(
                "unknown streak policy '{other}' (expected 'gated' or 'ungated')"
            ))),
        }
    }
}

/// Options controlling summary assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryOptions {
    pub streak_policy: StreakPolicy,
}
