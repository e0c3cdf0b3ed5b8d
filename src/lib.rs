pub mod api;
pub mod database_ops;
pub mod error;
pub mod instance;
pub mod localize;
pub mod logging;
pub mod model;
pub mod reconcile;

pub mod util {
    pub mod env;
}

pub use database_ops::db::{resolve_database_url, Db};
pub use error::SyncError;
pub use instance::build_instance;
pub use localize::localize;
pub use model::{
    Advert, AdvertInstance, Location, MarkStaleCounts, ReconcileRequest, ReconcileSummary,
    UpsertCounts, Voucher,
};
pub use reconcile::reconcile;
