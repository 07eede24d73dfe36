//! Wire payloads shared by the sync client and the API server.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{Shift, ShiftId};
use crate::reconcile::ReconcileReport;
use crate::{Error, Result};

/// Largest page the list endpoint will return
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Body of `POST /v1/shifts/sync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPushRequest {
    pub email: String,
    pub shifts: Vec<Shift>,
}

/// Acknowledgement of a reconciled push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAck {
    pub message: String,
    pub inserted: usize,
    pub updated: usize,
    pub discarded: usize,
}

impl SyncAck {
    pub fn from_report(report: ReconcileReport) -> Self {
        let received = report.inserted + report.updated + report.discarded;
        Self {
            message: format!("Synced {received} shifts"),
            inserted: report.inserted,
            updated: report.updated,
            discarded: report.discarded,
        }
    }

    pub const fn report(&self) -> ReconcileReport {
        ReconcileReport {
            inserted: self.inserted,
            updated: self.updated,
            discarded: self.discarded,
        }
    }
}

/// Sort order accepted by the list endpoint
///
/// Ties on the timestamp are broken by id in the same direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftOrder {
    #[default]
    #[serde(rename = "startedAt_desc")]
    StartedAtDesc,
    #[serde(rename = "updatedAt_desc")]
    UpdatedAtDesc,
    #[serde(rename = "startedAt_asc")]
    StartedAtAsc,
    #[serde(rename = "updatedAt_asc")]
    UpdatedAtAsc,
}

impl ShiftOrder {
    /// Column the order sorts on
    pub const fn column(self) -> &'static str {
        match self {
            Self::StartedAtDesc | Self::StartedAtAsc => "started_at",
            Self::UpdatedAtDesc | Self::UpdatedAtAsc => "updated_at",
        }
    }

    pub const fn is_descending(self) -> bool {
        matches!(self, Self::StartedAtDesc | Self::UpdatedAtDesc)
    }

    /// Compare two shifts in this order
    pub fn compare(self, a: &Shift, b: &Shift) -> Ordering {
        let ascending = match self {
            Self::StartedAtDesc | Self::StartedAtAsc => a
                .started_at
                .cmp(&b.started_at)
                .then_with(|| a.id.cmp(&b.id)),
            Self::UpdatedAtDesc | Self::UpdatedAtAsc => a
                .updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.id.cmp(&b.id)),
        };
        if self.is_descending() {
            ascending.reverse()
        } else {
            ascending
        }
    }
}

/// Body of `POST /v1/shifts/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub email: String,
    #[serde(default)]
    pub order_by: ShiftOrder,
    /// First item of the requested page (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<ShiftId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListRequest {
    /// First page for `email` in the default order
    pub fn first_page(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            order_by: ShiftOrder::default(),
            cursor: None,
            limit: None,
        }
    }

    /// Page size after defaults, rejecting values outside `1..=1000`
    pub fn effective_limit(&self) -> Result<u32> {
        match self.limit {
            None => Ok(MAX_PAGE_LIMIT),
            Some(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => Ok(limit),
            Some(limit) => Err(Error::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<ShiftId>,
    pub limit: u32,
    pub total_items: u64,
}

/// One page of an account's shifts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub items: Vec<Shift>,
    pub meta: ListMeta,
}

/// Body of `POST /v1/shifts/delete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteHistoryRequest {
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteHistoryResponse {
    pub deleted: u64,
}
