use thiserror::Error;
use uuid::Uuid;

use crate::model::UpsertCounts;

/// Unified error type for the reconciliation engine.
///
/// A `Store` failure keeps whatever counts committed before it; nothing is
/// rolled back. Every write is a keyed upsert, so callers retry the whole
/// request and the instance set converges instead of duplicating.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("advert {advert_id} not found")]
    AdvertNotFound { advert_id: Uuid },

    #[error("invalid {field} identifier {value:?}")]
    InvalidId {
        field: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("unknown timezone {name:?}")]
    UnknownTimezone { name: String },

    #[error("store operation failed")]
    Store {
        #[source]
        source: sqlx::Error,
        /// Counts committed by chunks that completed before the failure.
        partial: Option<UpsertCounts>,
    },
}

impl From<sqlx::Error> for SyncError {
    fn from(source: sqlx::Error) -> Self {
        SyncError::Store {
            source,
            partial: None,
        }
    }
}
