//! Append-only metric snapshots per pin.

use crate::Timestamp;

/// One counter snapshot for a pin, recorded by one ingestion cycle.
///
/// Absolute counters never decrease over `recorded_at` for a given pin.
/// The `delta_*` columns are computed by the pipeline when the row is
/// written (difference from the previous row, or the absolute value for the
/// first row) and are carried through as-is.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinMetricHistory {
    pub id: i64,
    pub pin_id: String,
    pub cycle_id: String,
    pub recorded_at: Timestamp,

    pub impressions: u64,
    pub saves: u64,
    pub outbound_clicks: u64,

    pub delta_impressions: i64,
    pub delta_saves: i64,

    /// Not selected by every store query, so it may be absent.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub delta_outbound_clicks: Option<i64>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_outbound_delta_defaults_to_none() {
        let json = r#"{
            "id": 1010,
            "pin_id": "1029384756",
            "cycle_id": "cycle-uuid-10",
            "recorded_at": "2024-05-01T12:00:00Z",
            "impressions": 5000,
            "saves": 200,
            "outbound_clicks": 150,
            "delta_impressions": 640,
            "delta_saves": 12
        }"#;

        let row: PinMetricHistory = serde_json::from_str(json).unwrap();
        assert_eq!(row.delta_outbound_clicks, None);
        assert_eq!(row.delta_impressions, 640);

        let back = serde_json::to_value(&row).unwrap();
        assert!(back.get("delta_outbound_clicks").is_none());
    }
}
