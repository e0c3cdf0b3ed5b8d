use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Instance status values written by the engine. The upserter writes `active`,
/// the stale marker writes `deleted`; nothing else touches the column.
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DELETED: &str = "deleted";

/// Promotional template distributed to locations.
///
/// Only the validity windows are interpreted here; everything the campaign
/// tooling attaches beyond them rides along untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advert {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher: Option<Voucher>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Optional voucher validity window nested inside an advert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A target site with its own IANA timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub timezone: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-location materialized copy of an advert.
///
/// `advert` is a localized value copy of the template, never a reference to
/// it. At most one row exists per `(advert_id, location_id)` key; rows are
/// soft-deleted, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertInstance {
    pub advert_id: Uuid,
    pub location_id: Uuid,
    pub advert: Advert,
    pub location: Location,
}

impl AdvertInstance {
    pub fn key(&self) -> (Uuid, Uuid) {
        (self.advert_id, self.location_id)
    }
}

/// Wire shape of one reconciliation request. Identifiers arrive as strings
/// and are validated when the orchestrator parses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub advert_id: String,
    #[serde(default)]
    pub location_ids: Vec<String>,
    /// Optional database override; applied to the configured DSN by the
    /// invoking binary, never read by the engine itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
}

/// Counters from the stale-marking update.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkStaleCounts {
    pub matched: u64,
    pub modified: u64,
}

/// Counters from the batched upsert. Keyed upserts never plain-insert, so
/// `inserted` stays zero; `upserted` counts freshly created rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub upserted: u64,
    pub modified: u64,
}

/// Combined result of one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub mark_as_delete: MarkStaleCounts,
    pub upsert: UpsertCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advert_keeps_unknown_fields_through_a_round_trip() {
        let doc = serde_json::json!({
            "id": "8c4e7f76-3c54-4e3f-9d07-5f6f5f1f0a11",
            "title": "2 for 1 burgers",
            "status": "active",
            "start_date": "2023-01-10T08:00:00Z",
            "end_date": "2023-01-20T20:00:00Z",
            "campaign_code": "BURGER23",
            "priority": 7
        });
        let advert: Advert = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(advert.title.as_deref(), Some("2 for 1 burgers"));
        assert_eq!(advert.extra.get("campaign_code").unwrap(), "BURGER23");
        assert_eq!(advert.extra.get("priority").unwrap(), 7);

        let back = serde_json::to_value(&advert).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn request_parses_the_original_event_shape() {
        let body = r#"{
            "advert_id": "8c4e7f76-3c54-4e3f-9d07-5f6f5f1f0a11",
            "location_ids": ["b7f1d9a2-0a2b-4c44-8f0e-2d8f11aa9001"],
            "database_name": "tenant_a"
        }"#;
        let req: ReconcileRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.location_ids.len(), 1);
        assert_eq!(req.database_name.as_deref(), Some("tenant_a"));

        // database_name is optional and location_ids defaults to empty
        let minimal: ReconcileRequest =
            serde_json::from_str(r#"{"advert_id": "x"}"#).unwrap();
        assert!(minimal.location_ids.is_empty());
        assert!(minimal.database_name.is_none());
    }

    #[test]
    fn summary_serializes_with_the_original_result_keys() {
        let summary = ReconcileSummary {
            mark_as_delete: MarkStaleCounts {
                matched: 2,
                modified: 1,
            },
            upsert: UpsertCounts {
                inserted: 0,
                upserted: 3,
                modified: 4,
            },
        };
        let v = serde_json::to_value(summary).unwrap();
        assert_eq!(v["markAsDelete"]["matched"], 2);
        assert_eq!(v["markAsDelete"]["modified"], 1);
        assert_eq!(v["upsert"]["upserted"], 3);
    }
}
