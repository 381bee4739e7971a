use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AppError;

/// A poll spanning an inclusive date range, with everyone's votes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub description: Option<String>,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(skip_serializing)]
    pub pin: String,
    pub dates: BTreeMap<NaiveDate, DayVotes>,
    pub participants: BTreeMap<String, Participant>,
    pub ttl_seconds: i64,
    pub created_at: i64,
}

/// Who objected to a single day. Anyone absent from both sets is free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayVotes {
    #[serde(default)]
    pub blocked: BTreeSet<String>,
    #[serde(default)]
    pub tentative: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub avatar: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStatus {
    Free,
    Tentative,
    Block,
}

impl std::str::FromStr for VoteStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(VoteStatus::Free),
            "tentative" => Ok(VoteStatus::Tentative),
            "block" => Ok(VoteStatus::Block),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

/// Everything the organizer supplies when creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub description: Option<String>,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub ttl_seconds: i64,
}

/// Returned once at creation; the only time the pin leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedEvent {
    pub id: String,
    pub description: Option<String>,
    pub pin: String,
}

/// Row shape of the `events` table. `dates` and `participants` hold JSON.
#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub description: Option<String>,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub dates: String,
    pub pin: String,
    pub participants: String,
    pub ttl_seconds: i64,
    pub created_at: i64,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            dates: serde_json::from_str(&row.dates)?,
            participants: serde_json::from_str(&row.participants)?,
            id: row.id,
            description: row.description,
            first_day: row.first_day,
            last_day: row.last_day,
            start_time: row.start_time,
            end_time: row.end_time,
            pin: row.pin,
            ttl_seconds: row.ttl_seconds,
            created_at: row.created_at,
        })
    }
}
