//! Store operations for advert instances: keyed reads, the batched bulk
//! upsert, and the stale-instance soft delete.

use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, types::Json, QueryBuilder, Row};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::db::Db;
use crate::error::SyncError;
use crate::model::{
    Advert, AdvertInstance, Location, MarkStaleCounts, UpsertCounts, Voucher, STATUS_ACTIVE,
};

/// Upper bound on rows per bulk statement. Chunks run one after another to
/// bound peak load on the store.
pub const UPSERT_CHUNK_SIZE: usize = 100;

#[instrument(skip(db))]
pub async fn fetch_advert(db: &Db, advert_id: Uuid) -> Result<Option<Advert>, SyncError> {
    let row = sqlx::query(
        "SELECT id, title, status, start_date, end_date, voucher, extra \
         FROM adverts WHERE id = $1",
    )
    .bind(advert_id)
    .fetch_optional(&db.pool)
    .await?;
    row.map(|r| advert_from_row(&r)).transpose()
}

#[instrument(skip(db, ids), fields(requested = ids.len()))]
pub async fn fetch_locations(db: &Db, ids: &[Uuid]) -> Result<Vec<Location>, SyncError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query("SELECT id, timezone, extra FROM locations WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&db.pool)
        .await?;
    rows.iter().map(location_from_row).collect()
}

/// Apply the instance set in sequential chunks of keyed upserts.
///
/// Each chunk is one multi-row `INSERT .. ON CONFLICT DO UPDATE`; a chunk
/// failure aborts the remaining chunks and surfaces the counts the committed
/// chunks already produced. Re-running the same input converges on the same
/// stored state.
#[instrument(skip(db, instances), fields(total = instances.len()))]
pub async fn upsert_instances(
    db: &Db,
    instances: &[AdvertInstance],
) -> Result<UpsertCounts, SyncError> {
    let mut counts = UpsertCounts::default();
    if instances.is_empty() {
        return Ok(counts);
    }

    let uniques = dedupe_by_key(instances);
    for chunk in uniques.chunks(UPSERT_CHUNK_SIZE) {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO advert_instances (advert_id, location_id, advert, location, status) ",
        );
        qb.push_values(chunk, |mut b, inst| {
            b.push_bind(inst.advert_id)
                .push_bind(inst.location_id)
                .push_bind(Json(&inst.advert))
                .push_bind(Json(&inst.location))
                .push_bind(STATUS_ACTIVE);
        });
        qb.push(
            " ON CONFLICT (advert_id, location_id) \
              DO UPDATE SET advert = EXCLUDED.advert, \
                            location = EXCLUDED.location, \
                            status = EXCLUDED.status, \
                            updated_at = now() \
              RETURNING (xmax = 0) AS inserted",
        );

        let rows = qb
            .build()
            .persistent(false)
            .fetch_all(&db.pool)
            .await
            .map_err(|source| SyncError::Store {
                source,
                partial: Some(counts),
            })?;

        let mut upserted = 0u64;
        let mut modified = 0u64;
        for row in &rows {
            let fresh: bool = row.try_get("inserted").map_err(|source| SyncError::Store {
                source,
                partial: Some(counts),
            })?;
            if fresh {
                upserted += 1;
            } else {
                modified += 1;
            }
        }
        counts.upserted += upserted;
        counts.modified += modified;
        info!(rows = chunk.len(), upserted, modified, "bulk upsert executed");
    }
    debug!(
        upserted = counts.upserted,
        modified = counts.modified,
        "completed all chunks"
    );
    Ok(counts)
}

/// Soft-delete every instance of `advert_id` whose location fell out of the
/// target set. An empty target set marks the whole advert deleted. One
/// statement, so `matched`/`modified` come from a single snapshot.
#[instrument(skip(db, target_location_ids), fields(targets = target_location_ids.len()))]
pub async fn mark_stale(
    db: &Db,
    advert_id: Uuid,
    target_location_ids: &[Uuid],
) -> Result<MarkStaleCounts, SyncError> {
    let row = sqlx::query(
        "WITH stale AS ( \
             SELECT advert_id, location_id FROM advert_instances \
             WHERE advert_id = $1 AND location_id <> ALL($2) \
         ), marked AS ( \
             UPDATE advert_instances i \
             SET status = 'deleted', updated_at = now() \
             FROM stale s \
             WHERE i.advert_id = s.advert_id AND i.location_id = s.location_id \
               AND i.status <> 'deleted' \
             RETURNING i.location_id \
         ) \
         SELECT (SELECT count(*) FROM stale) AS matched, \
                (SELECT count(*) FROM marked) AS modified",
    )
    .bind(advert_id)
    .bind(target_location_ids)
    .fetch_one(&db.pool)
    .await?;

    let matched: i64 = row.try_get("matched")?;
    let modified: i64 = row.try_get("modified")?;
    let counts = MarkStaleCounts {
        matched: matched as u64,
        modified: modified as u64,
    };
    info!(
        %advert_id,
        matched = counts.matched,
        modified = counts.modified,
        "marked stale instances as deleted"
    );
    Ok(counts)
}

// Keep only the last instance per compound key so one bulk statement never
// touches the same row twice (Postgres rejects that within one INSERT).
fn dedupe_by_key(instances: &[AdvertInstance]) -> Vec<&AdvertInstance> {
    let mut latest: HashMap<(Uuid, Uuid), &AdvertInstance> = HashMap::new();
    for inst in instances {
        latest.insert(inst.key(), inst);
    }
    latest.into_values().collect()
}

fn advert_from_row(row: &PgRow) -> Result<Advert, SyncError> {
    Ok(Advert {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        status: row.try_get("status")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        voucher: row
            .try_get::<Option<Json<Voucher>>, _>("voucher")?
            .map(|j| j.0),
        extra: row
            .try_get::<Option<Json<Map<String, Value>>>, _>("extra")?
            .map(|j| j.0)
            .unwrap_or_default(),
    })
}

fn location_from_row(row: &PgRow) -> Result<Location, SyncError> {
    Ok(Location {
        id: row.try_get("id")?,
        timezone: row.try_get("timezone")?,
        extra: row
            .try_get::<Option<Json<Map<String, Value>>>, _>("extra")?
            .map(|j| j.0)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(advert_id: Uuid, location_id: Uuid, tag: &str) -> AdvertInstance {
        let mut extra = Map::new();
        extra.insert("tag".into(), tag.into());
        AdvertInstance {
            advert_id,
            location_id,
            advert: Advert {
                id: advert_id,
                title: None,
                status: None,
                start_date: None,
                end_date: None,
                voucher: None,
                extra,
            },
            location: Location {
                id: location_id,
                timezone: "Etc/UTC".into(),
                extra: Map::new(),
            },
        }
    }

    #[test]
    fn splits_into_ceil_n_over_chunk_size_batches() {
        let advert_id = Uuid::new_v4();
        for (n, expected) in [(1usize, 1usize), (100, 1), (101, 2), (250, 3)] {
            let instances: Vec<AdvertInstance> = (0..n)
                .map(|_| instance(advert_id, Uuid::new_v4(), "x"))
                .collect();
            let uniques = dedupe_by_key(&instances);
            assert_eq!(uniques.chunks(UPSERT_CHUNK_SIZE).count(), expected);
        }
    }

    #[test]
    fn dedupe_keeps_the_last_write_per_key() {
        let advert_id = Uuid::new_v4();
        let location_id = Uuid::new_v4();
        let instances = vec![
            instance(advert_id, location_id, "first"),
            instance(advert_id, Uuid::new_v4(), "other"),
            instance(advert_id, location_id, "second"),
        ];
        let uniques = dedupe_by_key(&instances);
        assert_eq!(uniques.len(), 2);
        let kept = uniques
            .iter()
            .find(|i| i.location_id == location_id)
            .unwrap();
        assert_eq!(kept.advert.extra.get("tag").unwrap(), "second");
    }
}
