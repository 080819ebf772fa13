use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A diary author. Owned by the user store; the summary only reads it,
/// apart from the preferred comment hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub created_at: NaiveDateTime,
    /// Hour of day (expected 0-23, stored unvalidated) at which the user
    /// wants to receive their daily comment.
    pub comment_time: i32,
}

impl User {
    pub fn join_date(&self) -> NaiveDate {
        self.created_at.date()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diary {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl Diary {
    /// Calendar date the diary counts towards.
    pub fn diary_date(&self) -> NaiveDate {
        self.created_at.date()
    }
}

/// AI-generated comment delivered to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyComment {
    pub id: i64,
    pub user_id: i64,
    pub content: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emotion {
    pub id: i64,
    pub name: Option<String>,
}

/// Link between a daily comment and an emotion tag. The emotion side may
/// be missing if the tag was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmotionMapping {
    pub id: i64,
    pub comment_id: i64,
    pub emotion: Option<Emotion>,
}

/// The stamp a user currently has equipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveStamp {
    pub stamp_id: i64,
    pub name: String,
    pub image: Option<String>,
}
