//! Report data model.
//!
//! A report is the single product sold by the service. It is created `unpaid`,
//! moves to `pending_payment` once a gateway order exists for it, and ends in
//! `paid` (client verification) or `paid_ready_to_view` (gateway webhook).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownStatus;

/// Canonical report price in minor units (paise). There is no variable pricing.
pub const REPORT_PRICE_PAISE: i64 = 49_900;

/// Currency every order is created in.
pub const REPORT_CURRENCY: &str = "INR";

/// Product name printed on receipts.
pub const REPORT_PRODUCT_NAME: &str = "Detailed Career Risk Report";

/// Report lifecycle status.
///
/// Variants are declared in lifecycle order; `rank` follows that order and
/// every status write is filtered so a row never moves to a lower rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Unpaid,
    PendingPayment,
    Paid,
    PaidReadyToView,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Unpaid,
        ReportStatus::PendingPayment,
        ReportStatus::Paid,
        ReportStatus::PaidReadyToView,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Unpaid => "unpaid",
            ReportStatus::PendingPayment => "pending_payment",
            ReportStatus::Paid => "paid",
            ReportStatus::PaidReadyToView => "paid_ready_to_view",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            ReportStatus::Unpaid => 0,
            ReportStatus::PendingPayment => 1,
            ReportStatus::Paid => 2,
            ReportStatus::PaidReadyToView => 3,
        }
    }

    /// Whether a new order may be created against a report in this status.
    pub fn is_reusable(self) -> bool {
        matches!(self, ReportStatus::Unpaid | ReportStatus::PendingPayment)
    }

    /// Statuses a row may currently hold for a write to `self` to apply.
    pub fn advanceable_from(self) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|status| status.rank() <= self.rank())
            .map(|status| status.as_str())
            .collect()
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ReportStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or(UnknownStatus {
                kind: "report",
                value,
            })
    }
}

/// Represents a report record from the database.
///
/// # Database Table
///
/// Maps to the `reports` table. `price` is in minor units, like every other
/// amount the service stores.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Report {
    pub id: Uuid,

    /// Owning user, as issued by the identity provider
    pub user_id: Uuid,

    /// Price in paise
    pub price: i64,

    #[sqlx(try_from = "String")]
    pub status: ReportStatus,

    pub created_at: DateTime<Utc>,

    /// First time a verified payment signal reached this report
    pub paid_at: Option<DateTime<Utc>>,

    pub assessment_id: Option<Uuid>,
}
