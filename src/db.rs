use crate::error::AppError;
use crate::models::{CreatedEvent, DayVotes, Event, EventRow, NewEvent, VoteStatus};
use crate::votes;
use crate::words::{self, Wordlist};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

const MAX_ID_ATTEMPTS: usize = 5;

/// Per-event mutex registry. Holding the guard for an id serializes every
/// read-modify-write on that event; other ids are unaffected.
#[derive(Clone, Default)]
struct EventLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl EventLocks {
    async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map holds idle entries.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Durable home of all events, keyed by id.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
    words: Arc<Wordlist>,
    locks: EventLocks,
    max_event_days: i64,
}

impl EventStore {
    pub async fn open(
        database_url: &str,
        words: Wordlist,
        max_event_days: i64,
    ) -> Result<Self, AppError> {
        // WAL lets snapshots read while votes keep writing.
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        Self::with_pool(pool, words, max_event_days).await
    }

    pub async fn with_pool(
        pool: SqlitePool,
        words: Wordlist,
        max_event_days: i64,
    ) -> Result<Self, AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                description TEXT,
                first_day TEXT NOT NULL,
                last_day TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                dates TEXT NOT NULL,
                pin TEXT NOT NULL,
                participants TEXT NOT NULL,
                ttl_seconds INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            words: Arc::new(words),
            locks: EventLocks::default(),
            max_event_days,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn create_event(&self, new: NewEvent) -> Result<CreatedEvent, AppError> {
        let dates = populate_dates(new.first_day, new.last_day, self.max_event_days)?;
        let dates = serde_json::to_string(&dates)?;
        let pin = words::generate_pin();
        let created_at = Utc::now().timestamp();

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.words.event_id()?;
            let inserted = sqlx::query(
                "INSERT INTO events (id, description, first_day, last_day, start_time, end_time,
                                     dates, pin, participants, ttl_seconds, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, '{}', ?, ?)",
            )
            .bind(&id)
            .bind(&new.description)
            .bind(new.first_day)
            .bind(new.last_day)
            .bind(new.start_time)
            .bind(new.end_time)
            .bind(&dates)
            .bind(&pin)
            .bind(new.ttl_seconds)
            .bind(created_at)
            .execute(&self.pool)
            .await;

            match inserted {
                Ok(_) => {
                    tracing::info!(
                        event_id = %id,
                        first_day = %new.first_day,
                        last_day = %new.last_day,
                        "event created"
                    );
                    return Ok(CreatedEvent {
                        id,
                        description: new.description,
                        pin,
                    });
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tracing::warn!(
                        event_id = %id,
                        attempt,
                        "event id already taken, generating another"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Generation(format!(
            "no free event id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    pub async fn get_event(&self, id: &str) -> Result<Event, AppError> {
        let row: EventRow = sqlx::query_as("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        Event::try_from(row)
    }

    pub async fn apply_vote(
        &self,
        id: &str,
        date: NaiveDate,
        status: VoteStatus,
        username: &str,
    ) -> Result<Event, AppError> {
        let _guard = self.locks.acquire(id).await;
        let mut event = self.get_event(id).await?;

        if !votes::record_vote(&mut event.dates, &mut event.participants, date, status, username) {
            // TODO: ask whether out-of-range votes should be rejected instead of ignored
            tracing::warn!(
                event_id = %id,
                %date,
                user = %username,
                "vote outside event range ignored"
            );
            return Ok(event);
        }

        let updated = sqlx::query("UPDATE events SET dates = ?, participants = ? WHERE id = ?")
            .bind(serde_json::to_string(&event.dates)?)
            .bind(serde_json::to_string(&event.participants)?)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            // Deleted or purged since we read it.
            return Err(AppError::NotFound(id.to_string()));
        }

        tracing::debug!(event_id = %id, %date, ?status, user = %username, "vote recorded");
        Ok(event)
    }

    pub async fn delete_event(&self, id: &str, pin: Option<&str>) -> Result<(), AppError> {
        let _guard = self.locks.acquire(id).await;

        let stored: (String,) = sqlx::query_as("SELECT pin FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let pin = pin.map(str::trim).unwrap_or_default();
        if pin.is_empty() {
            return Err(AppError::Unauthorized(id.to_string()));
        }
        if pin != stored.0 {
            tracing::warn!(event_id = %id, "delete attempted with incorrect pin");
            return Err(AppError::Forbidden(id.to_string()));
        }

        let deleted = sqlx::query("DELETE FROM events WHERE id = ? AND pin = ?")
            .bind(id)
            .bind(pin)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(id.to_string()));
        }

        tracing::info!(event_id = %id, "event deleted");
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.purge_expired_at(Utc::now().timestamp()).await
    }

    pub async fn purge_expired_at(&self, now: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM events WHERE created_at + ttl_seconds < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn purge_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM events").execute(&self.pool).await?;
        tracing::warn!(count = result.rows_affected(), "all events deleted");
        Ok(result.rows_affected())
    }

    /// Writes a consistent copy of the whole database to `path`.
    ///
    /// The copy is built next to the target and renamed into place, so a
    /// reader of `path` never sees a half-written file.
    pub async fn snapshot_to(&self, path: &Path) -> Result<(), AppError> {
        let tmp = path.with_extension("tmp");
        match tokio::fs::remove_file(&tmp).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        sqlx::query("VACUUM INTO ?")
            .bind(tmp.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;
        // In-memory databases accept VACUUM INTO but write nothing.
        if !tokio::fs::try_exists(&tmp).await? {
            return Err(AppError::Snapshot(format!(
                "no copy was written to {} (is the database in memory?)",
                tmp.display()
            )));
        }
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn populate_dates(
    first_day: NaiveDate,
    last_day: NaiveDate,
    max_days: i64,
) -> Result<BTreeMap<NaiveDate, DayVotes>, AppError> {
    if first_day > last_day {
        return Err(AppError::InvalidRange(format!(
            "first day {first_day} is after last day {last_day}"
        )));
    }
    let span = (last_day - first_day).num_days() + 1;
    if span > max_days {
        return Err(AppError::InvalidRange(format!(
            "event spans {span} days, at most {max_days} allowed"
        )));
    }

    Ok(first_day
        .iter_days()
        .take_while(|d| d <= &last_day)
        .map(|d| (d, DayVotes::default()))
        .collect())
}
