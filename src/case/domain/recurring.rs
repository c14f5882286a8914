//! Recurrence rules and anchor-date computation.

use super::CaseDomainError;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// The recurrence kinds a case can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringKind {
    /// Reactivate once on the anchor date.
    Once,
    /// Reactivate every day.
    Daily,
    /// Reactivate weekly on the anchor's weekday.
    Weekly,
    /// Reactivate monthly on the anchor's day of month.
    Monthly,
}

impl RecurringKind {
    /// Returns the canonical storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A recurrence rule as requested by a caller.
///
/// Exactly one variant per change; anything else is rejected upstream as
/// invalid input rather than falling through to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurringRule {
    /// Fire once on the given date.
    Once {
        /// Requested date.
        date: NaiveDate,
    },
    /// Fire every day starting tomorrow.
    Daily,
    /// Fire weekly on the given date's weekday.
    Weekly {
        /// Requested date; past dates roll forward to the next occurrence
        /// of the same weekday.
        date: NaiveDate,
    },
    /// Fire monthly on the given date's day of month.
    Monthly {
        /// Requested date; past dates roll forward by one calendar month.
        date: NaiveDate,
    },
}

impl RecurringRule {
    /// Returns the kind stored on the case for this rule.
    #[must_use]
    pub const fn kind(&self) -> RecurringKind {
        match self {
            Self::Once { .. } => RecurringKind::Once,
            Self::Daily => RecurringKind::Daily,
            Self::Weekly { .. } => RecurringKind::Weekly,
            Self::Monthly { .. } => RecurringKind::Monthly,
        }
    }

    /// Computes the next anchor date relative to `today`.
    ///
    /// - `once`: the given date as-is.
    /// - `daily`: tomorrow.
    /// - `weekly`: the given date when not in the past; otherwise the next
    ///   occurrence of its weekday, strictly in the future (never `today`).
    /// - `monthly`: the given date when not in the past; otherwise the date
    ///   plus one calendar month, clamped to the month end (Jan 31 becomes
    ///   Feb 28/29, not Mar 3).
    ///
    /// # Errors
    ///
    /// Returns [`CaseDomainError::DateOutOfRange`] when the computed date
    /// leaves the representable range.
    pub fn anchor(&self, today: NaiveDate) -> Result<NaiveDate, CaseDomainError> {
        match *self {
            Self::Once { date } => Ok(date),
            Self::Daily => today
                .checked_add_days(Days::new(1))
                .ok_or(CaseDomainError::DateOutOfRange),
            Self::Weekly { date } => {
                if date < today {
                    let ahead = days_until_weekday(today, date);
                    today
                        .checked_add_days(Days::new(ahead))
                        .ok_or(CaseDomainError::DateOutOfRange)
                } else {
                    Ok(date)
                }
            }
            Self::Monthly { date } => {
                if date < today {
                    date.checked_add_months(Months::new(1))
                        .ok_or(CaseDomainError::DateOutOfRange)
                } else {
                    Ok(date)
                }
            }
        }
    }
}

/// A change to a case's recurrence: install a rule or remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum RecurringChange {
    /// Install or replace the recurrence rule.
    Set(RecurringRule),
    /// Clear the recurrence, resetting status and watcher opt-ins.
    Remove,
}

/// The recurrence state stored on a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Installed recurrence kind.
    pub kind: RecurringKind,
    /// Next reactivation date.
    pub anchor: NaiveDate,
}

/// Days from `today` to the next occurrence of `target`'s weekday, always
/// in `1..=7` so the result is strictly in the future.
fn days_until_weekday(today: NaiveDate, target: NaiveDate) -> u64 {
    let today_wd = i64::from(today.weekday().num_days_from_monday());
    let target_wd = i64::from(target.weekday().num_days_from_monday());
    let ahead = (target_wd - today_wd).rem_euclid(7);
    if ahead == 0 { 7 } else { ahead.unsigned_abs() }
}
