//! Daily-index naming and retention classification shared by the stores.

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::warn;

pub const ARRAY_METRICS_PREFIX: &str = "pure-arrays-metrics-";
pub const VOLUME_METRICS_PREFIX: &str = "pure-volumes-metrics-";
pub const ERROR_LOG_PREFIX: &str = "log-error-";
pub const TIMER_LOG_PREFIX: &str = "log-timer-";
pub const ALERTS_COLLECTION: &str = "pure-alerts";

const INDEX_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionAction {
    Delete,
    MarkReadOnly,
    Keep,
}

/// Indices to act on. Fresh and unparsable indices are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub delete: Vec<String>,
    pub read_only: Vec<String>,
}

pub fn index_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}", date.format(INDEX_DATE_FORMAT))
}

/// Index receiving today's writes
pub fn today_index(prefix: &str, now: DateTime<Utc>) -> String {
    index_name(prefix, now.date_naive())
}

pub fn classify(age_hours: i64, max_age_days: u32) -> RetentionAction {
    if age_hours > 24 * i64::from(max_age_days) {
        RetentionAction::Delete
    } else if age_hours >= 24 {
        RetentionAction::MarkReadOnly
    } else {
        RetentionAction::Keep
    }
}

/// Classify every index carrying `prefix`. Age is measured from the
/// index date to today's UTC midnight.
pub fn plan_retention<'a>(
    indices: impl IntoIterator<Item = &'a str>,
    prefix: &str,
    now: DateTime<Utc>,
    max_age_days: u32,
) -> RetentionPlan {
    let today = now.date_naive();
    let mut plan = RetentionPlan::default();

    for index in indices {
        let Some(date_part) = index.strip_prefix(prefix) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_part, INDEX_DATE_FORMAT) else {
            warn!(index, "Could not parse date from index name, skipping");
            continue;
        };

        let age_hours = (today - date).num_hours();
        match classify(age_hours, max_age_days) {
            RetentionAction::Delete => plan.delete.push(index.to_string()),
            RetentionAction::MarkReadOnly => plan.read_only.push(index.to_string()),
            RetentionAction::Keep => {}
        }
    }

    plan
}

/// Alerts created before this Unix time fall out of retention: UTC
/// midnight, `max_age_days` days ago.
pub fn alert_cutoff(now: DateTime<Utc>, max_age_days: u32) -> i64 {
    let day = now
        .date_naive()
        .checked_sub_days(Days::new(u64::from(max_age_days)))
        .unwrap_or(NaiveDate::MIN);
    day.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or(i64::MIN)
}
