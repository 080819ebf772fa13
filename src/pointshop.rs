//! Reward stamps: catalogue, ownership and the one stamp a user has equipped.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::ActiveStamp;
use crate::storage::repository;
use crate::storage::Database;

/// Source of a user's currently equipped stamp. Lookups may fail; callers
/// decide how to degrade.
#[async_trait]
pub trait StampService: Send + Sync {
    async fn active_stamp(&self, user_id: i64) -> Result<Option<ActiveStamp>>;
}

/// SQLite-backed stamp shop.
#[derive(Clone)]
pub struct Pointshop {
    db: Database,
}

impl Pointshop {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a stamp to the catalogue.
    pub async fn add_stamp(&self, name: &str, image: Option<&str>) -> Result<i64> {
        let name = name.to_string();
        let image = image.map(|s| s.to_string());
        let id = self
            .db
            .writer()
            .call(move |conn| repository::insert_stamp(conn, &name, image.as_deref()))
            .await?;
        log::info!("Added stamp {id}");
        Ok(id)
    }

    pub async fn grant(&self, user_id: i64, stamp_id: i64) -> Result<()> {
        self.db
            .writer()
            .call(move |conn| repository::grant_stamp(conn, user_id, stamp_id))
            .await?;
        Ok(())
    }

    /// Equip a stamp the user owns, unequipping any other.
    pub async fn activate(&self, user_id: i64, stamp_id: i64) -> Result<()> {
        let activated = self
            .db
            .writer()
            .call(move |conn| repository::activate_stamp(conn, user_id, stamp_id))
            .await?;
        if !activated {
            return Err(Error::NotFound(format!(
                "stamp {stamp_id} is not owned by user {user_id}"
            )));
        }
        log::debug!("User {user_id} activated stamp {stamp_id}");
        Ok(())
    }
}

#[async_trait]
impl StampService for Pointshop {
    async fn active_stamp(&self, user_id: i64) -> Result<Option<ActiveStamp>> {
        let stamp = self
            .db
            .reader()
            .call(move |conn| repository::get_active_stamp(conn, user_id))
            .await?;
        Ok(stamp)
    }
}
