// HTTP request handlers

use actix_web::{http::StatusCode, web, HttpResponse};
use tracing::{error, info, warn};

use crate::api::models::{ApiResponse, HealthResponse};
use crate::database_ops::db::Db;
use crate::error::SyncError;
use crate::model::{ReconcileRequest, ReconcileSummary};
use crate::reconcile::reconcile;

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> HttpResponse {
    let db_status = match sqlx::query_scalar::<_, bool>("SELECT true")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    HttpResponse::Ok().json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
    }))
}

/// Run one reconciliation for the posted request.
pub async fn run_reconcile(
    payload: web::Json<ReconcileRequest>,
    db: web::Data<Db>,
) -> HttpResponse {
    info!(
        advert_id = %payload.advert_id,
        locations = payload.location_ids.len(),
        "reconcile requested"
    );
    if payload.database_name.is_some() {
        // The server holds one pool for its configured database; per-request
        // database selection is a CLI concern.
        warn!("ignoring database_name override on the HTTP boundary");
    }

    match reconcile(&db, &payload).await {
        Ok(summary) => HttpResponse::Ok().json(ApiResponse::success(summary)),
        Err(err) => {
            error!(error = %err, advert_id = %payload.advert_id, "reconcile failed");
            HttpResponse::build(error_status(&err))
                .json(ApiResponse::<ReconcileSummary>::error(err.to_string()))
        }
    }
}

pub(crate) fn error_status(err: &SyncError) -> StatusCode {
    match err {
        SyncError::AdvertNotFound { .. } => StatusCode::NOT_FOUND,
        SyncError::InvalidId { .. } => StatusCode::BAD_REQUEST,
        SyncError::UnknownTimezone { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SyncError::Store { .. } => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn maps_error_kinds_to_statuses() {
        let not_found = SyncError::AdvertNotFound {
            advert_id: Uuid::new_v4(),
        };
        assert_eq!(error_status(&not_found), StatusCode::NOT_FOUND);

        let bad_id = Uuid::parse_str("nope").unwrap_err();
        let invalid = SyncError::InvalidId {
            field: "advert_id",
            value: "nope".into(),
            source: bad_id,
        };
        assert_eq!(error_status(&invalid), StatusCode::BAD_REQUEST);

        let tz = SyncError::UnknownTimezone {
            name: "Not/A_Zone".into(),
        };
        assert_eq!(error_status(&tz), StatusCode::UNPROCESSABLE_ENTITY);

        let store = SyncError::Store {
            source: sqlx::Error::PoolClosed,
            partial: None,
        };
        assert_eq!(error_status(&store), StatusCode::BAD_GATEWAY);
    }
}
