//! Dashboard numbers, recomputed from follow-up rows on every request.
//!
//! Months are UTC calendar months.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use db::{Store, models::followup::SentFollowupStat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

/// Months shown on the activity chart, the current one included.
pub const ACTIVITY_MONTHS: u32 = 7;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct MonthlyActivity {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub sent: i64,
    pub opened: i64,
    pub open_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct CountChange {
    pub total: i64,
    pub change: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct RateChange {
    pub current: i64,
    pub change: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
pub struct DashboardStats {
    pub clients: CountChange,
    pub followups: CountChange,
    pub open_rate: RateChange,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub monthly_activity: Vec<MonthlyActivity>,
}

/// Raw counts the dashboard cards are derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub total_clients: i64,
    pub new_clients_this_month: i64,
    pub new_clients_last_month: i64,
    pub sent_this_month: i64,
    pub opened_this_month: i64,
    pub sent_last_month: i64,
    pub opened_last_month: i64,
}

/// Opened share of sent, as a percentage. Zero when nothing was sent.
pub fn open_rate(sent: i64, opened: i64) -> f64 {
    if sent <= 0 {
        return 0.0;
    }
    opened as f64 / sent as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    fn back(self, months: u32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 - months as i32;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    fn start(self) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn label(self) -> &'static str {
        MONTH_LABELS[(self.month - 1) as usize]
    }
}

/// One bucket per calendar month for the last `months` months, oldest
/// first. Rows outside the window are ignored.
pub fn monthly_activity(
    rows: &[SentFollowupStat],
    today: NaiveDate,
    months: u32,
) -> Vec<MonthlyActivity> {
    let current = MonthKey::of(today);
    (0..months)
        .rev()
        .map(|offset| {
            let key = current.back(offset);
            let in_month = rows
                .iter()
                .filter(|row| MonthKey::of(row.sent_at.date_naive()) == key);
            let (sent, opened) = in_month.fold((0i64, 0i64), |(sent, opened), row| {
                (sent + 1, opened + i64::from(row.is_opened))
            });
            MonthlyActivity {
                label: key.label().to_string(),
                year: key.year,
                month: key.month,
                sent,
                opened,
                open_rate: open_rate(sent, opened),
            }
        })
        .collect()
}

/// Nearest integer with halves going up, so -12.5 becomes -12.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn dashboard_stats(counts: &DashboardCounts) -> DashboardStats {
    let this_rate = open_rate(counts.sent_this_month, counts.opened_this_month);
    let last_rate = open_rate(counts.sent_last_month, counts.opened_last_month);
    DashboardStats {
        clients: CountChange {
            total: counts.total_clients,
            change: counts.new_clients_this_month - counts.new_clients_last_month,
        },
        followups: CountChange {
            total: counts.sent_this_month,
            change: counts.sent_this_month - counts.sent_last_month,
        },
        open_rate: RateChange {
            current: round_half_up(this_rate),
            change: round_half_up(this_rate - last_rate),
        },
    }
}

/// Gather the user's rows and compute the whole dashboard as of `now`.
pub async fn load_dashboard(
    store: &dyn Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Dashboard, AnalyticsError> {
    let this_month = MonthKey::of(now.date_naive());
    let this_start = this_month.start();
    let last_start = this_month.back(1).start();
    let window_start = this_month.back(ACTIVITY_MONTHS.saturating_sub(1)).start();

    let total_clients = store
        .count_clients_created_between(user_id, None, None)
        .await?;
    let new_clients_this_month = store
        .count_clients_created_between(user_id, Some(this_start), None)
        .await?;
    let new_clients_last_month = store
        .count_clients_created_between(user_id, Some(last_start), Some(this_start))
        .await?;

    let rows = store
        .sent_followups_between(user_id, window_start.min(last_start), None)
        .await?;

    let tally = |from: DateTime<Utc>, to: Option<DateTime<Utc>>| {
        rows.iter()
            .filter(|r| r.sent_at >= from && to.is_none_or(|t| r.sent_at < t))
            .fold((0i64, 0i64), |(sent, opened), r| {
                (sent + 1, opened + i64::from(r.is_opened))
            })
    };
    let (sent_this_month, opened_this_month) = tally(this_start, None);
    let (sent_last_month, opened_last_month) = tally(last_start, Some(this_start));

    let counts = DashboardCounts {
        total_clients,
        new_clients_this_month,
        new_clients_last_month,
        sent_this_month,
        opened_this_month,
        sent_last_month,
        opened_last_month,
    };

    Ok(Dashboard {
        stats: dashboard_stats(&counts),
        monthly_activity: monthly_activity(&rows, now.date_naive(), ACTIVITY_MONTHS),
    })
}
