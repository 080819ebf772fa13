pub mod types;

pub use types::*;

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::date_util::{day_bounds, local_today, yesterday_of};
use crate::error::Result;
use crate::model::{DailyComment, Diary, EmotionMapping, User};
use crate::pointshop::StampService;
use crate::storage::Database;
use crate::store::{DailyCommentStore, DiaryStore, EmotionMappingStore, UserStore};

/// Assembles the my-page summary from the diary, comment, emotion and
/// stamp collaborators, and updates the user's comment hour.
pub struct MyPageService {
    diaries: Arc<dyn DiaryStore>,
    comments: Arc<dyn DailyCommentStore>,
    emotions: Arc<dyn EmotionMappingStore>,
    users: Arc<dyn UserStore>,
    stamps: Arc<dyn StampService>,
    options: SummaryOptions,
}

impl MyPageService {
    pub fn new(
        diaries: Arc<dyn DiaryStore>,
        comments: Arc<dyn DailyCommentStore>,
        emotions: Arc<dyn EmotionMappingStore>,
        users: Arc<dyn UserStore>,
        stamps: Arc<dyn StampService>,
    ) -> Self {
        Self {
            diaries,
            comments,
            emotions,
            users,
            stamps,
            options: SummaryOptions::default(),
        }
    }

    /// Use `db` for every store and `stamps` for the equipped stamp.
    pub fn from_database(db: Database, stamps: Arc<dyn StampService>) -> Self {
        let db = Arc::new(db);
        Self::new(db.clone(), db.clone(), db.clone(), db, stamps)
    }

    pub fn with_options(mut self, options: SummaryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SummaryOptions {
        &self.options
    }

    /// Summary for `user`, with the streak ending at yesterday's local date.
    pub async fn summary(&self, user: &User) -> Result<MyPageSummary> {
        self.summary_as_of(user, local_today()).await
    }

    /// Summary for `user` as if the current local date were `today`.
    pub async fn summary_as_of(&self, user: &User, today: NaiveDate) -> Result<MyPageSummary> {
        let total_diary_count = self.diaries.count_distinct_dates(user.id).await?;
        let consecutive_diary_days = self.consecutive_diary_days(user.id, today).await?;
        let recent_comment = self.comments.most_recent(user.id).await?;
        let main_emotions = self.emotion_tags(recent_comment.as_ref()).await?;
        let recent_ai_comment = recent_comment
            .and_then(|c| c.content)
            .unwrap_or_else(|| NO_AI_COMMENT.to_string());
        let recent_stamp_image = self.active_stamp_image(user.id).await;

        Ok(MyPageSummary {
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            join_date: user.join_date(),
            total_diary_count,
            consecutive_diary_days,
            main_emotions,
            recent_ai_comment,
            recent_stamp_image,
            comment_time: user.comment_time,
        })
    }

    /// Set the hour at which the user receives comments and persist the user.
    /// The hour is stored as given.
    pub async fn update_comment_time(&self, user: &mut User, comment_hour: i32) -> Result<()> {
        user.comment_time = comment_hour;
        self.users.save_user(user).await?;
        log::info!("User {} comment time set to {comment_hour}", user.id);
        Ok(())
    }

    async fn consecutive_diary_days(&self, user_id: i64, today: NaiveDate) -> Result<u32> {
        let yesterday = yesterday_of(today);

        if self.options.streak_policy == StreakPolicy::Gated {
            let (start, end) = day_bounds(yesterday);
            if !self.diaries.exists_between(user_id, start, end).await? {
                return Ok(0);
            }
        }

        let diaries = self.diaries.diaries_newest_first(user_id).await?;
        Ok(streak_ending_at(&diaries, yesterday))
    }

    async fn emotion_tags(&self, comment: Option<&DailyComment>) -> Result<Vec<String>> {
        let Some(comment) = comment else {
            return Ok(Vec::new());
        };
        let mappings = self.emotions.mappings_for_comments(&[comment.id]).await?;
        Ok(emotion_tags(&mappings))
    }

    async fn active_stamp_image(&self, user_id: i64) -> String {
        match self.stamps.active_stamp(user_id).await {
            Ok(Some(stamp)) => match stamp.image {
                Some(image) if !image.trim().is_empty() => image,
                _ => DEFAULT_STAMP_IMAGE.to_string(),
            },
            Ok(None) => DEFAULT_STAMP_IMAGE.to_string(),
            Err(e) => {
                log::warn!("Failed to load active stamp for user {user_id}: {e}");
                DEFAULT_STAMP_IMAGE.to_string()
            }
        }
    }
}

/// Count consecutive diary dates ending at `yesterday`, walking `diaries`
/// newest first. Rows newer than the expected date (today's diaries, or a
/// second diary on an already counted date) are skipped; the first row
/// older than the expected date ends the walk.
pub fn streak_ending_at(diaries: &[Diary], yesterday: NaiveDate) -> u32 {
    let mut streak: u32 = 0;
    for diary in diaries {
        let expected = yesterday - Duration::days(i64::from(streak));
        let diary_date = diary.diary_date();
        if diary_date == expected {
            streak += 1;
        } else if diary_date < expected {
            break;
        }
    }
    streak
}

/// `#`-prefixed emotion names, skipping mappings without an emotion or
/// with a blank name. Store order is kept.
pub fn emotion_tags(mappings: &[EmotionMapping]) -> Vec<String> {
    mappings
        .iter()
        .filter_map(|m| m.emotion.as_ref())
        .filter_map(|e| e.name.as_deref())
        .filter(|name| !name.trim().is_empty())
        .map(|name| format!("#{name}"))
        .collect()
}
