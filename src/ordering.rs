//! Milestone list ordering.
//!
//! Every listing in the application goes through [`order`]: filter the
//! records down to one folder view, then sort what is left. The sort
//! policy is pinned milestones first, then upcoming dates (today counts
//! as upcoming) ahead of past ones, with each run ordered by distance
//! from the reference instant. The comparator returns `Equal` for tied
//! keys, so the stable sort keeps tied records in input order.
//!
//! Day counts live here too: both endpoints are floored to their
//! calendar day before subtracting, so a milestone later today is
//! always "today" and one minute past midnight is already tomorrow.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{FolderSelector, Milestone};

/// Keeps the milestones visible in `folder`.
///
/// Recently Deleted shows exactly the soft-deleted records. Every other
/// view shows live records only: All keeps them all, Pinned narrows to
/// pinned ones, and a user folder narrows to its members.
pub fn filter(milestones: Vec<Milestone>, folder: &FolderSelector) -> Vec<Milestone> {
    milestones
        .into_iter()
        .filter(|m| match folder {
            FolderSelector::Deleted => m.is_deleted(),
            FolderSelector::All => !m.is_deleted(),
            FolderSelector::Pinned => !m.is_deleted() && m.pinned,
            FolderSelector::User(id) => !m.is_deleted() && m.folder_id == Some(*id),
        })
        .collect()
}

/// Comparator behind every milestone listing.
///
/// `now` is passed in rather than read from the clock so a whole listing
/// is ranked against one instant.
pub fn compare(a: &Milestone, b: &Milestone, now: DateTime<Utc>) -> Ordering {
    if a.pinned != b.pinned {
        return if a.pinned {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    let diff_a = a.date.signed_duration_since(now).num_milliseconds();
    let diff_b = b.date.signed_duration_since(now).num_milliseconds();

    // A date exactly at `now` counts as upcoming, not past.
    match (diff_a >= 0, diff_b >= 0) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    diff_a.abs().cmp(&diff_b.abs())
}

/// Filters `milestones` down to `folder` and sorts them with [`compare`].
pub fn order(
    milestones: Vec<Milestone>,
    folder: &FolderSelector,
    now: DateTime<Utc>,
) -> Vec<Milestone> {
    let mut kept = filter(milestones, folder);
    kept.sort_by(|a, b| compare(a, b, now));
    kept
}

/// Whole-day difference between two calendar dates. Positive when `to`
/// is later than `from`, zero when they are the same day.
pub fn calendar_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Day count from `now` to `target`, flooring both instants to their
/// calendar day first. The time-of-day components never influence the
/// result.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    calendar_days_between(now.date_naive(), target.date_naive())
}

/// How a day count reads on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// The milestone date is today.
    Today,
    /// The date lies this many days ahead (always positive).
    Remaining(i64),
    /// The date passed this many days ago (always positive).
    Elapsed(i64),
}

impl Countdown {
    /// Classifies a signed day count.
    pub fn from_days(days: i64) -> Self {
        match days {
            0 => Countdown::Today,
            d if d > 0 => Countdown::Remaining(d),
            d => Countdown::Elapsed(-d),
        }
    }
}
