//! reconcile_smoke.rs
//! Minimal end-to-end reconcile smoke against a live database: seeds one
//! advert and three zoned locations, then walks the lifecycle (materialize,
//! re-run, shrink, re-target, withdraw) asserting counts and statuses.

use std::collections::HashMap;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Map;
use sqlx::types::Json;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use advert_sync::database_ops::db::Db;
use advert_sync::model::{ReconcileRequest, UpsertCounts, Voucher, STATUS_ACTIVE, STATUS_DELETED};

#[tokio::main]
async fn main() -> Result<()> {
    advert_sync::util::env::bootstrap_cli("reconcile_smoke");
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let db = Db::connect(&database_url, 10).await?;
    Db::ensure_schema(&db.pool).await?;

    let advert_id = Uuid::new_v4();
    let sydney = Uuid::new_v4();
    let tokyo = Uuid::new_v4();
    let london = Uuid::new_v4();
    seed(&db, advert_id, &[(sydney, "Australia/Sydney"), (tokyo, "Asia/Tokyo"), (london, "Europe/London")]).await?;

    let request = |ids: &[Uuid]| ReconcileRequest {
        advert_id: advert_id.to_string(),
        location_ids: ids.iter().map(Uuid::to_string).collect(),
        database_name: None,
    };

    // Full target set: three fresh instances, nothing stale yet
    let summary = advert_sync::reconcile(&db, &request(&[sydney, tokyo, london])).await?;
    println!("materialize: {}", serde_json::to_string(&summary)?);
    ensure!(summary.upsert.upserted == 3, "expected 3 fresh instances");
    ensure!(summary.mark_as_delete.matched == 0, "nothing should be stale");

    let localized: String = sqlx::query_scalar(
        "SELECT advert->>'start_date' FROM advert_instances WHERE advert_id = $1 AND location_id = $2",
    )
    .bind(advert_id)
    .bind(sydney)
    .fetch_one(&db.pool)
    .await?;
    let got = DateTime::parse_from_rfc3339(&localized)
        .context("localized start_date should be RFC 3339")?
        .with_timezone(&Utc);
    ensure!(
        got == Utc.with_ymd_and_hms(2023, 1, 9, 21, 0, 0).unwrap(),
        "Sydney start_date should be shifted back by +11:00, got {got}"
    );

    // Same request again: converges without creating rows
    let summary = advert_sync::reconcile(&db, &request(&[sydney, tokyo, london])).await?;
    println!("re-run: {}", serde_json::to_string(&summary)?);
    ensure!(summary.upsert.upserted == 0, "re-run must not create rows");
    ensure!(summary.upsert.modified == 3, "re-run rewrites the 3 rows in place");
    expect_statuses(
        &db,
        advert_id,
        &[(sydney, STATUS_ACTIVE), (tokyo, STATUS_ACTIVE), (london, STATUS_ACTIVE)],
    )
    .await?;

    // Shrink the target set: only tokyo goes stale
    let summary = advert_sync::reconcile(&db, &request(&[sydney, london])).await?;
    println!("shrink: {}", serde_json::to_string(&summary)?);
    ensure!(summary.mark_as_delete.modified == 1, "exactly tokyo goes stale");
    expect_statuses(
        &db,
        advert_id,
        &[(sydney, STATUS_ACTIVE), (tokyo, STATUS_DELETED), (london, STATUS_ACTIVE)],
    )
    .await?;

    // Re-target tokyo: the soft-deleted row comes back active
    advert_sync::reconcile(&db, &request(&[sydney, tokyo, london])).await?;
    expect_statuses(
        &db,
        advert_id,
        &[(sydney, STATUS_ACTIVE), (tokyo, STATUS_ACTIVE), (london, STATUS_ACTIVE)],
    )
    .await?;

    // Withdraw from all locations: zero upserts, everything soft-deleted
    let summary = advert_sync::reconcile(&db, &request(&[])).await?;
    println!("withdraw: {}", serde_json::to_string(&summary)?);
    ensure!(
        summary.upsert == UpsertCounts::default(),
        "withdraw performs no upserts"
    );
    ensure!(summary.mark_as_delete.modified == 3, "withdraw soft-deletes all 3");
    expect_statuses(
        &db,
        advert_id,
        &[(sydney, STATUS_DELETED), (tokyo, STATUS_DELETED), (london, STATUS_DELETED)],
    )
    .await?;

    cleanup(&db, advert_id, &[sydney, tokyo, london]).await?;
    println!("reconcile smoke passed");
    Ok(())
}

async fn seed(db: &Db, advert_id: Uuid, locations: &[(Uuid, &str)]) -> Result<()> {
    let voucher = Voucher {
        start_date: Some(Utc.with_ymd_and_hms(2023, 1, 12, 9, 0, 0).unwrap()),
        end_date: Some(Utc.with_ymd_and_hms(2023, 1, 15, 21, 0, 0).unwrap()),
        extra: Map::new(),
    };
    let mut extra = Map::new();
    extra.insert("campaign_code".into(), "SMOKE".into());

    sqlx::query(
        "INSERT INTO adverts (id, title, status, start_date, end_date, voucher, extra) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(advert_id)
    .bind("Smoke test advert")
    .bind("active")
    .bind(Utc.with_ymd_and_hms(2023, 1, 10, 8, 0, 0).unwrap())
    .bind(Utc.with_ymd_and_hms(2023, 1, 20, 20, 0, 0).unwrap())
    .bind(Json(&voucher))
    .bind(Json(&extra))
    .execute(&db.pool)
    .await?;

    for (id, timezone) in locations {
        sqlx::query("INSERT INTO locations (id, timezone, extra) VALUES ($1, $2, '{}'::jsonb)")
            .bind(*id)
            .bind(*timezone)
            .execute(&db.pool)
            .await?;
    }
    Ok(())
}

async fn expect_statuses(db: &Db, advert_id: Uuid, expected: &[(Uuid, &str)]) -> Result<()> {
    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT location_id, status FROM advert_instances WHERE advert_id = $1",
    )
    .bind(advert_id)
    .fetch_all(&db.pool)
    .await?;
    let statuses: HashMap<Uuid, String> = rows.into_iter().collect();

    ensure!(
        statuses.len() == expected.len(),
        "expected {} instances, found {}",
        expected.len(),
        statuses.len()
    );
    for (location_id, status) in expected {
        let got = statuses
            .get(location_id)
            .with_context(|| format!("missing instance for location {location_id}"))?;
        ensure!(
            got == status,
            "location {location_id}: expected {status}, got {got}"
        );
    }
    Ok(())
}

async fn cleanup(db: &Db, advert_id: Uuid, location_ids: &[Uuid]) -> Result<()> {
    sqlx::query("DELETE FROM advert_instances WHERE advert_id = $1")
        .bind(advert_id)
        .execute(&db.pool)
        .await?;
    sqlx::query("DELETE FROM adverts WHERE id = $1")
        .bind(advert_id)
        .execute(&db.pool)
        .await?;
    sqlx::query("DELETE FROM locations WHERE id = ANY($1)")
        .bind(location_ids)
        .execute(&db.pool)
        .await?;
    Ok(())
}
