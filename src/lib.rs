pub mod date_util;
pub mod error;
pub mod model;
pub mod mypage;
pub mod pointshop;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
pub use model::{ActiveStamp, DailyComment, Diary, Emotion, EmotionMapping, User};
pub use mypage::{
    MyPageService, MyPageSummary, StreakPolicy, SummaryOptions, DEFAULT_STAMP_IMAGE,
    NO_AI_COMMENT,
};
pub use pointshop::{Pointshop, StampService};
pub use storage::Database;

use std::sync::Arc;

use chrono::NaiveDateTime;

use storage::repository;
use store::UserStore;

/// Config key holding the default streak policy.
pub const STREAK_POLICY_KEY: &str = "streak_policy";

/// Main entry point: a database plus the services built on it.
pub struct DiaryPage {
    db: Database,
    pointshop: Pointshop,
}

impl DiaryPage {
    pub fn new(db: Database) -> Self {
        let pointshop = Pointshop::new(db.clone());
        Self { db, pointshop }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn pointshop(&self) -> &Pointshop {
        &self.pointshop
    }

    /// Build the summary service. `policy` overrides the configured
    /// streak policy for this service only.
    pub async fn my_page(&self, policy: Option<StreakPolicy>) -> Result<MyPageService> {
        let streak_policy = match policy {
            Some(p) => p,
            None => self.configured_streak_policy().await?,
        };
        Ok(
            MyPageService::from_database(self.db.clone(), Arc::new(self.pointshop.clone()))
                .with_options(SummaryOptions { streak_policy }),
        )
    }

    /// The streak policy stored under [`STREAK_POLICY_KEY`], or the default.
    pub async fn configured_streak_policy(&self) -> Result<StreakPolicy> {
        match self.config_get(STREAK_POLICY_KEY).await? {
            Some(value) => value.parse(),
            None => Ok(StreakPolicy::default()),
        }
    }

    // ── Users ──────────────────────────────────────────────────────

    pub async fn add_user(
        &self,
        nickname: &str,
        email: &str,
        created_at: NaiveDateTime,
        comment_time: i32,
    ) -> Result<i64> {
        let nickname = nickname.to_string();
        let email = email.to_string();
        let id = self
            .db
            .writer()
            .call(move |conn| {
                repository::insert_user(conn, &nickname, &email, created_at, comment_time)
            })
            .await?;
        log::info!("Created user {id}");
        Ok(id)
    }

    /// Load a user, failing with `NotFound` if the id is unknown.
    pub async fn load_user(&self, user_id: i64) -> Result<User> {
        self.db
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {user_id}")))
    }

    // ── Diaries and comments ───────────────────────────────────────

    pub async fn add_diary(
        &self,
        user_id: i64,
        content: &str,
        created_at: NaiveDateTime,
    ) -> Result<i64> {
        let content = content.to_string();
        let id = self
            .db
            .writer()
            .call(move |conn| repository::insert_diary(conn, user_id, &content, created_at))
            .await?;
        Ok(id)
    }

    /// Store an AI comment and tag it with the named emotions, creating
    /// emotions that do not exist yet.
    pub async fn add_comment(
        &self,
        user_id: i64,
        content: &str,
        emotions: &[String],
        created_at: NaiveDateTime,
    ) -> Result<i64> {
        let content = content.to_string();
        let emotions = emotions.to_vec();
        let tag_count = emotions.len();
        let id = self
            .db
            .writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let comment_id =
                    repository::insert_daily_comment(&tx, user_id, Some(content.as_str()), created_at)?;
                for name in &emotions {
                    let emotion_id = repository::ensure_emotion(&tx, name)?;
                    repository::map_comment_emotion(&tx, comment_id, Some(emotion_id))?;
                }
                tx.commit()?;
                Ok::<i64, rusqlite::Error>(comment_id)
            })
            .await?;
        log::debug!("Stored comment {id} with {tag_count} emotion tags");
        Ok(id)
    }

    // ── Config ─────────────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        let value = self
            .db
            .reader()
            .call(move |conn| repository::get_config(conn, &key))
            .await?;
        Ok(value)
    }

    /// Set a config value. Known keys are validated before they are stored.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        if key == STREAK_POLICY_KEY {
            value.parse::<StreakPolicy>()?;
        }
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await?;
        Ok(())
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        let items = self
            .db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?;
        Ok(items)
    }

    /// Row counts per table.
    pub async fn status(&self) -> Result<Vec<(&'static str, i64)>> {
        let counts = self
            .db
            .reader()
            .call(|conn| repository::table_counts(conn))
            .await?;
        Ok(counts)
    }
}
