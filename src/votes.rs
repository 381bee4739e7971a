//! Per-day vote merging. Nothing in here touches the database.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{DayVotes, Participant, VoteStatus};

const AVATAR_PALETTE: [&str; 12] = [
    "#97a8ef", "#ef9797", "#97efb0", "#efd697", "#c497ef", "#97e3ef", "#ef97d2", "#b5ef97",
    "#efb497", "#979fef", "#efef97", "#97efdd",
];

/// Computes a day's voter sets after `username` votes `status`.
pub fn merge(day: &DayVotes, status: VoteStatus, username: &str) -> DayVotes {
    let mut next = day.clone();
    match status {
        VoteStatus::Free => {
            next.blocked.remove(username);
            next.tentative.remove(username);
        }
        VoteStatus::Tentative => {
            next.blocked.remove(username);
            next.tentative.insert(username.to_string());
        }
        VoteStatus::Block => {
            next.tentative.remove(username);
            next.blocked.insert(username.to_string());
        }
    }
    next
}

/// Applies one vote to an event's dates and participants.
///
/// Returns `false` and leaves both maps untouched when `date` is not one of
/// the event's days.
pub fn record_vote(
    dates: &mut BTreeMap<NaiveDate, DayVotes>,
    participants: &mut BTreeMap<String, Participant>,
    date: NaiveDate,
    status: VoteStatus,
    username: &str,
) -> bool {
    let Some(day) = dates.get_mut(&date) else {
        return false;
    };
    *day = merge(day, status, username);

    participants
        .entry(username.to_string())
        .or_insert_with(|| Participant {
            avatar: avatar_for(username),
        });
    true
}

/// Stable colour for a username so the same name always looks the same.
pub fn avatar_for(username: &str) -> String {
    // FNV-1a
    let hash = username
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    let index = (hash % AVATAR_PALETTE.len() as u64) as usize;
    AVATAR_PALETTE[index].to_string()
}
