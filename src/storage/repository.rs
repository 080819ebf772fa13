use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::date_util::{format_timestamp, parse_timestamp};
use crate::model::{ActiveStamp, DailyComment, Diary, Emotion, EmotionMapping, User};

// ── Users ──────────────────────────────────────────────────────────

pub fn insert_user(
    conn: &Connection,
    nickname: &str,
    email: &str,
    created_at: NaiveDateTime,
    comment_time: i32,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO users (nickname, email, created_at, comment_time)
         VALUES (?1, ?2, ?3, ?4)",
        params![nickname, email, format_timestamp(created_at), comment_time],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT user_id, nickname, email, created_at, comment_time
         FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                nickname: row.get(1)?,
                email: row.get(2)?,
                created_at: timestamp_at(row, 3)?,
                comment_time: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Save a user by identity. Saving the same value twice is a no-op.
pub fn save_user(conn: &Connection, user: &User) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO users (user_id, nickname, email, created_at, comment_time)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
            nickname=excluded.nickname, email=excluded.email,
            created_at=excluded.created_at, comment_time=excluded.comment_time",
        params![
            user.id,
            user.nickname,
            user.email,
            format_timestamp(user.created_at),
            user.comment_time,
        ],
    )?;
    Ok(())
}

// ── Diaries ────────────────────────────────────────────────────────

pub fn insert_diary(
    conn: &Connection,
    user_id: i64,
    content: &str,
    created_at: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO diaries (user_id, content, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, content, format_timestamp(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Number of calendar dates with at least one diary. Several diaries on
/// the same day count once.
pub fn count_distinct_diary_dates(conn: &Connection, user_id: i64) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(DISTINCT date(created_at)) FROM diaries WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

/// All diaries of a user, newest first.
pub fn list_diaries_desc(conn: &Connection, user_id: i64) -> Result<Vec<Diary>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT diary_id, user_id, content, created_at
         FROM diaries WHERE user_id = ?1
         ORDER BY created_at DESC, diary_id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Diary {
            id: row.get(0)?,
            user_id: row.get(1)?,
            content: row.get(2)?,
            created_at: timestamp_at(row, 3)?,
        })
    })?;
    rows.collect()
}

/// Whether the user wrote a diary within `[start, end]` (both inclusive).
pub fn diary_exists_between(
    conn: &Connection,
    user_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM diaries
            WHERE user_id = ?1 AND created_at >= ?2 AND created_at <= ?3
         )",
        params![user_id, format_timestamp(start), format_timestamp(end)],
        |row| row.get(0),
    )
}

// ── Daily Comments ─────────────────────────────────────────────────

pub fn insert_daily_comment(
    conn: &Connection,
    user_id: i64,
    content: Option<&str>,
    created_at: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO daily_comments (user_id, content, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, content, format_timestamp(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The comment with the latest creation time; ties go to the later insert.
pub fn latest_daily_comment(
    conn: &Connection,
    user_id: i64,
) -> Result<Option<DailyComment>, rusqlite::Error> {
    conn.query_row(
        "SELECT comment_id, user_id, content, created_at
         FROM daily_comments WHERE user_id = ?1
         ORDER BY created_at DESC, comment_id DESC
         LIMIT 1",
        params![user_id],
        |row| {
            Ok(DailyComment {
                id: row.get(0)?,
                user_id: row.get(1)?,
                content: row.get(2)?,
                created_at: timestamp_at(row, 3)?,
            })
        },
    )
    .optional()
}

// ── Emotions ───────────────────────────────────────────────────────

pub fn insert_emotion(conn: &Connection, name: Option<&str>) -> Result<i64, rusqlite::Error> {
    conn.execute("INSERT INTO emotions (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

/// Find an emotion by exact name, creating it if missing.
pub fn ensure_emotion(conn: &Connection, name: &str) -> Result<i64, rusqlite::Error> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT emotion_id FROM emotions WHERE name = ?1 ORDER BY emotion_id LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    match existing {
        Some(id) => Ok(id),
        None => insert_emotion(conn, Some(name)),
    }
}

pub fn map_comment_emotion(
    conn: &Connection,
    comment_id: i64,
    emotion_id: Option<i64>,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO comment_emotion_mappings (comment_id, emotion_id) VALUES (?1, ?2)",
        params![comment_id, emotion_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Emotion mappings attached to any of the given comments, in insertion order.
pub fn list_mappings_for_comments(
    conn: &Connection,
    comment_ids: &[i64],
) -> Result<Vec<EmotionMapping>, rusqlite::Error> {
    if comment_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = comment_ids
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT m.mapping_id, m.comment_id, e.emotion_id, e.name
         FROM comment_emotion_mappings m
         LEFT JOIN emotions e ON e.emotion_id = m.emotion_id
         WHERE m.comment_id IN ({placeholders})
         ORDER BY m.mapping_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(comment_ids.iter()), |row| {
        let emotion_id: Option<i64> = row.get(2)?;
        Ok(EmotionMapping {
            id: row.get(0)?,
            comment_id: row.get(1)?,
            emotion: match emotion_id {
                Some(id) => Some(Emotion {
                    id,
                    name: row.get(3)?,
                }),
                None => None,
            },
        })
    })?;
    rows.collect()
}

// ── Stamps ─────────────────────────────────────────────────────────

pub fn insert_stamp(
    conn: &Connection,
    name: &str,
    image: Option<&str>,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO stamps (name, image) VALUES (?1, ?2)",
        params![name, image],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Give a stamp to a user (inactive). Granting an owned stamp again is a no-op.
pub fn grant_stamp(conn: &Connection, user_id: i64, stamp_id: i64) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO user_stamps (user_id, stamp_id, is_active, acquired_at)
         VALUES (?1, ?2, 0, datetime('now', 'localtime'))",
        params![user_id, stamp_id],
    )?;
    Ok(())
}

/// Make `stamp_id` the user's only active stamp.
/// Returns false (and changes nothing) if the user does not own the stamp.
pub fn activate_stamp(
    conn: &Connection,
    user_id: i64,
    stamp_id: i64,
) -> Result<bool, rusqlite::Error> {
    let owned: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_stamps WHERE user_id = ?1 AND stamp_id = ?2)",
        params![user_id, stamp_id],
        |row| row.get(0),
    )?;
    if !owned {
        return Ok(false);
    }
    conn.execute(
        "UPDATE user_stamps
         SET is_active = CASE WHEN stamp_id = ?2 THEN 1 ELSE 0 END
         WHERE user_id = ?1",
        params![user_id, stamp_id],
    )?;
    Ok(true)
}

pub fn get_active_stamp(
    conn: &Connection,
    user_id: i64,
) -> Result<Option<ActiveStamp>, rusqlite::Error> {
    conn.query_row(
        "SELECT s.stamp_id, s.name, s.image
         FROM user_stamps us
         JOIN stamps s ON s.stamp_id = us.stamp_id
         WHERE us.user_id = ?1 AND us.is_active = 1
         LIMIT 1",
        params![user_id],
        |row| {
            Ok(ActiveStamp {
                stamp_id: row.get(0)?,
                name: row.get(1)?,
                image: row.get(2)?,
            })
        },
    )
    .optional()
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Status ─────────────────────────────────────────────────────────

/// Row counts for the tables shown by `diarypage status`.
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>, rusqlite::Error> {
    let tables = [
        "users",
        "diaries",
        "daily_comments",
        "emotions",
        "stamps",
    ];
    let mut counts = Vec::with_capacity(tables.len());
    for table in tables {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        counts.push((table, count));
    }
    Ok(counts)
}

// ── Helpers ────────────────────────────────────────────────────────

fn timestamp_at(row: &Row<'_>, idx: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{raw}'").into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                set_config(conn, "streak_policy", "gated")?;
                let val = get_config(conn, "streak_policy")?;
                assert_eq!(val, Some("gated".to_string()));

                let missing = get_config(conn, "nonexistent")?;
                assert_eq!(missing, None);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_user_save_updates_comment_time() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let id = insert_user(conn, "sunny", "sunny@example.com", ts("2024-05-01 10:00:00"), 21)?;
                let mut user = get_user(conn, id)?.unwrap();
                assert_eq!(user.nickname, "sunny");
                assert_eq!(user.comment_time, 21);

                user.comment_time = 9;
                save_user(conn, &user)?;
                save_user(conn, &user)?;

                let reloaded = get_user(conn, id)?.unwrap();
                assert_eq!(reloaded, user);
                assert_eq!(get_user(conn, id + 100)?, None);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_dates_and_ordering() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let uid = insert_user(conn, "a", "a@example.com", ts("2024-01-01 00:00:00"), 8)?;
                let other = insert_user(conn, "b", "b@example.com", ts("2024-01-01 00:00:00"), 8)?;
                insert_diary(conn, uid, "morning", ts("2025-01-10 08:00:00"))?;
                insert_diary(conn, uid, "night", ts("2025-01-10 23:30:00"))?;
                insert_diary(conn, uid, "", ts("2025-01-12 12:00:00"))?;
                insert_diary(conn, other, "", ts("2025-01-11 12:00:00"))?;

                assert_eq!(count_distinct_diary_dates(conn, uid)?, 2);
                assert_eq!(count_distinct_diary_dates(conn, other)?, 1);

                let diaries = list_diaries_desc(conn, uid)?;
                let contents: Vec<&str> = diaries.iter().map(|d| d.content.as_str()).collect();
                assert_eq!(contents, vec!["", "night", "morning"]);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_diary_exists_between_is_inclusive() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let uid = insert_user(conn, "a", "a@example.com", ts("2024-01-01 00:00:00"), 8)?;
                insert_diary(conn, uid, "", ts("2025-01-10 23:59:59"))?;

                let (start, end) = crate::date_util::day_bounds(ts("2025-01-10").date());
                assert!(diary_exists_between(conn, uid, start, end)?);

                let (start, end) = crate::date_util::day_bounds(ts("2025-01-11").date());
                assert!(!diary_exists_between(conn, uid, start, end)?);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_latest_daily_comment() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let uid = insert_user(conn, "a", "a@example.com", ts("2024-01-01 00:00:00"), 8)?;
                assert_eq!(latest_daily_comment(conn, uid)?, None);

                insert_daily_comment(conn, uid, Some("new"), ts("2025-02-02 21:00:00"))?;
                insert_daily_comment(conn, uid, Some("old"), ts("2025-02-01 21:00:00"))?;

                let latest = latest_daily_comment(conn, uid)?.unwrap();
                assert_eq!(latest.content.as_deref(), Some("new"));
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mappings_keep_order_and_missing_emotions() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let uid = insert_user(conn, "a", "a@example.com", ts("2024-01-01 00:00:00"), 8)?;
                let c1 = insert_daily_comment(conn, uid, Some("one"), ts("2025-02-01 21:00:00"))?;
                let c2 = insert_daily_comment(conn, uid, Some("two"), ts("2025-02-02 21:00:00"))?;

                let calm = ensure_emotion(conn, "calm")?;
                let joy = ensure_emotion(conn, "joy")?;
                assert_eq!(ensure_emotion(conn, "calm")?, calm);

                map_comment_emotion(conn, c2, Some(joy))?;
                map_comment_emotion(conn, c1, Some(calm))?;
                map_comment_emotion(conn, c2, None)?;
                map_comment_emotion(conn, c2, Some(calm))?;

                let mappings = list_mappings_for_comments(conn, &[c2])?;
                let names: Vec<Option<&str>> = mappings
                    .iter()
                    .map(|m| m.emotion.as_ref().and_then(|e| e.name.as_deref()))
                    .collect();
                assert_eq!(names, vec![Some("joy"), None, Some("calm")]);
                assert!(mappings[1].emotion.is_none());

                assert_eq!(list_mappings_for_comments(conn, &[c1, c2])?.len(), 4);
                assert!(list_mappings_for_comments(conn, &[])?.is_empty());
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_activate_stamp_is_exclusive() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let uid = insert_user(conn, "a", "a@example.com", ts("2024-01-01 00:00:00"), 8)?;
                let star = insert_stamp(conn, "star", Some("image/star.png"))?;
                let moon = insert_stamp(conn, "moon", Some("image/moon.png"))?;
                let unowned = insert_stamp(conn, "sun", Some("image/sun.png"))?;

                assert_eq!(get_active_stamp(conn, uid)?, None);

                grant_stamp(conn, uid, star)?;
                grant_stamp(conn, uid, moon)?;
                grant_stamp(conn, uid, moon)?;
                assert_eq!(get_active_stamp(conn, uid)?, None);

                assert!(activate_stamp(conn, uid, star)?);
                assert!(activate_stamp(conn, uid, moon)?);
                let active = get_active_stamp(conn, uid)?.unwrap();
                assert_eq!(active.stamp_id, moon);
                assert_eq!(active.image.as_deref(), Some("image/moon.png"));

                assert!(!activate_stamp(conn, uid, unowned)?);
                assert_eq!(get_active_stamp(conn, uid)?.unwrap().stamp_id, moon);
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_table_counts() {
        let db = Database::open_memory().await.unwrap();

        db.writer()
            .call(|conn| {
                let uid = insert_user(conn, "a", "a@example.com", ts("2024-01-01 00:00:00"), 8)?;
                insert_diary(conn, uid, "", ts("2025-01-01 09:00:00"))?;
                insert_diary(conn, uid, "", ts("2025-01-02 09:00:00"))?;

                let counts = table_counts(conn)?;
                assert!(counts.contains(&("users", 1)));
                assert!(counts.contains(&("diaries", 2)));
                assert!(counts.contains(&("stamps", 0)));
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}
