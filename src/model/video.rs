use super::*;

/// One uploaded recording and its playback statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: VideoId,
    #[new(value = "now()")]
    pub created_at: Timestamp,
    pub filename: String,
    #[new(default)]
    #[serde(default)]
    pub views: u64,
    #[new(default)]
    #[serde(default)]
    pub total_watches: u64,
    #[new(default)]
    #[serde(default)]
    pub completion_rate: f64,
}

impl VideoRecord {
    /// Public path of the stored media blob.
    pub fn url(&self) -> String {
        format!("/uploads/{}", self.filename)
    }
}

/// A playback event reported by a viewer, applied to a record by the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEvent {
    View,
    Completion(Percentage),
}

impl TrackEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TrackEvent::View => "view",
            TrackEvent::Completion(_) => "completion",
        }
    }
}
