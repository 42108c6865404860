use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{BasicData, EnhancedData};

/// Everything the collector currently knows.
#[derive(Debug, Clone, Default)]
pub struct CollectorSnapshot {
    /// `None` until the first basic collection ran.
    pub basic: Option<BasicData>,
    /// May hold stale data; only exposed through [`CollectorSnapshot::all_data`].
    pub enhanced: EnhancedData,
    pub is_enhanced_mode: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CollectorSnapshot {
    /// Public view of the snapshot. Enhanced facts are withheld unless the
    /// user is currently opted in, whatever happens to be cached.
    pub fn all_data(&self) -> AllData {
        AllData {
            basic: self.basic.clone(),
            enhanced: self.is_enhanced_mode.then(|| self.enhanced.clone()),
            is_enhanced_mode: self.is_enhanced_mode,
            last_updated: self.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllData {
    pub basic: Option<BasicData>,
    pub enhanced: Option<EnhancedData>,
    pub is_enhanced_mode: bool,
    pub last_updated: Option<DateTime<Utc>>,
}
