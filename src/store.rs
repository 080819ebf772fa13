//! Collaborator interfaces the my-page summary reads from, and their
//! SQLite implementations on [`Database`].

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::model::{DailyComment, Diary, EmotionMapping, User};
use crate::storage::repository;
use crate::storage::Database;

#[async_trait]
pub trait DiaryStore: Send + Sync {
    /// Number of distinct calendar dates on which the user wrote a diary.
    async fn count_distinct_dates(&self, user_id: i64) -> Result<u32>;

    /// All diaries of the user, newest first.
    async fn diaries_newest_first(&self, user_id: i64) -> Result<Vec<Diary>>;

    /// Whether any diary was written within `[start, end]`.
    async fn exists_between(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool>;
}

#[async_trait]
pub trait DailyCommentStore: Send + Sync {
    async fn most_recent(&self, user_id: i64) -> Result<Option<DailyComment>>;
}

#[async_trait]
pub trait EmotionMappingStore: Send + Sync {
    /// Mappings for every listed comment, in store order.
    async fn mappings_for_comments(&self, comment_ids: &[i64]) -> Result<Vec<EmotionMapping>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Persist a user by identity.
    async fn save_user(&self, user: &User) -> Result<()>;
}

#[async_trait]
impl DiaryStore for Database {
    async fn count_distinct_dates(&self, user_id: i64) -> Result<u32> {
        let count = self
            .reader()
            .call(move |conn| repository::count_distinct_diary_dates(conn, user_id))
            .await?;
        u32::try_from(count).map_err(|_| Error::Database(format!("invalid diary count {count}")))
    }

    async fn diaries_newest_first(&self, user_id: i64) -> Result<Vec<Diary>> {
        let diaries = self
            .reader()
            .call(move |conn| repository::list_diaries_desc(conn, user_id))
            .await?;
        Ok(diaries)
    }

    async fn exists_between(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool> {
        let exists = self
            .reader()
            .call(move |conn| repository::diary_exists_between(conn, user_id, start, end))
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl DailyCommentStore for Database {
    async fn most_recent(&self, user_id: i64) -> Result<Option<DailyComment>> {
        let comment = self
            .reader()
            .call(move |conn| repository::latest_daily_comment(conn, user_id))
            .await?;
        Ok(comment)
    }
}

#[async_trait]
impl EmotionMappingStore for Database {
    async fn mappings_for_comments(&self, comment_ids: &[i64]) -> Result<Vec<EmotionMapping>> {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let comment_ids = comment_ids.to_vec();
        let mappings = self
            .reader()
            .call(move |conn| repository::list_mappings_for_comments(conn, &comment_ids))
            .await?;
        Ok(mappings)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        let user = self
            .reader()
            .call(move |conn| repository::get_user(conn, user_id))
            .await?;
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let user = user.clone();
        self.writer()
            .call(move |conn| repository::save_user(conn, &user))
            .await?;
        Ok(())
    }
}
