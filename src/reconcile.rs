//! Reconciliation orchestrator: resolve the advert and its target locations,
//! then converge the stored instance set on the target in two concurrent
//! legs, soft-deleting instances that fell out of the set while building and
//! upserting one localized instance per targeted location.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::database_ops::{db::Db, instances};
use crate::error::SyncError;
use crate::instance::build_instance;
use crate::model::{ReconcileRequest, ReconcileSummary};

/// Drive one reconciliation run.
///
/// The fetch phase fails fast; once the two write legs start, the first error
/// wins and whatever the other leg already committed stays committed. Callers
/// re-invoke with the same request after a partial failure and the instance
/// set converges; every write is a keyed upsert or an idempotent status flip.
#[instrument(skip(db, request), fields(advert_id = %request.advert_id, targets = request.location_ids.len()))]
pub async fn reconcile(
    db: &Db,
    request: &ReconcileRequest,
) -> Result<ReconcileSummary, SyncError> {
    let advert_id = parse_id("advert_id", &request.advert_id)?;
    let location_ids = request
        .location_ids
        .iter()
        .map(|raw| parse_id("location_id", raw))
        .collect::<Result<Vec<_>, _>>()?;

    let (advert, locations) = tokio::try_join!(
        instances::fetch_advert(db, advert_id),
        instances::fetch_locations(db, &location_ids),
    )?;
    let advert = advert.ok_or(SyncError::AdvertNotFound { advert_id })?;
    info!(
        title = advert.title.as_deref().unwrap_or_default(),
        locations = locations.len(),
        "resolved advert"
    );

    let mark = instances::mark_stale(db, advert_id, &location_ids);
    let upsert = async {
        let built = locations
            .iter()
            .map(|location| build_instance(&advert, location))
            .collect::<Result<Vec<_>, _>>()?;
        instances::upsert_instances(db, &built).await
    };
    let (mark_as_delete, upsert) = tokio::try_join!(mark, upsert)?;

    info!(
        matched = mark_as_delete.matched,
        marked_deleted = mark_as_delete.modified,
        upserted = upsert.upserted,
        modified = upsert.modified,
        "reconcile complete"
    );
    Ok(ReconcileSummary {
        mark_as_delete,
        upsert,
    })
}

fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, SyncError> {
    Uuid::parse_str(raw.trim()).map_err(|source| SyncError::InvalidId {
        field,
        value: raw.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_ids() {
        let id = parse_id("advert_id", " 8c4e7f76-3c54-4e3f-9d07-5f6f5f1f0a11 ").unwrap();
        assert_eq!(id.to_string(), "8c4e7f76-3c54-4e3f-9d07-5f6f5f1f0a11");
    }

    #[test]
    fn rejects_malformed_ids_with_the_offending_value() {
        let err = parse_id("location_id", "not-a-uuid").unwrap_err();
        match err {
            SyncError::InvalidId { field, value, .. } => {
                assert_eq!(field, "location_id");
                assert_eq!(value, "not-a-uuid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
