use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw stat block from the tracker API, tagged by playlist-variant id and
/// season. Field shapes mirror the wire format; everything the source may
/// omit is an `Option`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub attributes: SegmentAttributes,
    #[serde(default)]
    pub metadata: SegmentMetadata,
    #[serde(default)]
    pub stats: SegmentStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentAttributes {
    #[serde(default)]
    pub playlist_id: Option<i64>,
    #[serde(default)]
    pub season: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

/// The named stat fields we care about. The source carries more; unknown
/// fields are dropped at deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    #[serde(default)]
    pub tier: Option<StatField>,
    #[serde(default)]
    pub division: Option<StatField>,
    #[serde(default)]
    pub rating: Option<StatField>,
    #[serde(default)]
    pub matches_played: Option<StatField>,
    #[serde(default)]
    pub win_streak: Option<StatField>,
}

/// A single stat with optional display metadata. `value` stays a raw JSON
/// value: the source sometimes sends null, and occasionally garbage, where a
/// number belongs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatField {
    #[serde(default)]
    pub metadata: Option<StatMetadata>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

impl StatField {
    /// Numeric reading of the stat value, if it is actually a number.
    pub fn as_i64(&self) -> Option<i64> {
        match self.value.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            _ => None,
        }
    }

    /// Whether a value is present but not numeric.
    pub fn is_corrupt(&self) -> bool {
        matches!(self.value.as_ref(), Some(v) if !v.is_null() && !v.is_number())
    }

    /// Whether any non-null value is present at all.
    pub fn is_present(&self) -> bool {
        matches!(self.value.as_ref(), Some(v) if !v.is_null())
    }
}

/// Descriptor for a historical season the profile has data for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableSegment {
    #[serde(default)]
    pub attributes: SegmentAttributes,
    #[serde(default)]
    pub metadata: SegmentMetadata,
}

/// A player profile as returned by one solver round trip, normalized from the
/// raw payload. Transient: this is parser input, never persisted as-is.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedProfile {
    pub platform_slug: String,
    pub platform_user_id: String,
    pub platform_user_handle: String,
    pub user_id: u64,
    pub is_premium: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub current_season: u32,
    pub segments: Vec<Segment>,
    pub available_segments: Vec<AvailableSegment>,
}

// --- Raw payload shapes (solver-internal) ---

/// Top-level payload embedded in the solver response. Only the two segment
/// arrays are required; the surrounding objects default to zero values when
/// the source omits them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProfile {
    #[serde(default)]
    pub platform_info: Option<RawPlatformInfo>,
    #[serde(default)]
    pub user_info: Option<RawUserInfo>,
    #[serde(default)]
    pub metadata: Option<RawProfileMetadata>,
    pub segments: Option<Vec<Segment>>,
    pub available_segments: Option<Vec<AvailableSegment>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlatformInfo {
    #[serde(default)]
    pub platform_slug: Option<String>,
    #[serde(default)]
    pub platform_user_id: Option<String>,
    #[serde(default)]
    pub platform_user_handle: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUserInfo {
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub is_premium: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProfileMetadata {
    #[serde(default)]
    pub last_updated: Option<RawLastUpdated>,
    #[serde(default)]
    pub current_season: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawLastUpdated {
    #[serde(default)]
    pub value: Option<DateTime<Utc>>,
}
