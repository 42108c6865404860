pub mod basic;
pub mod chat;
pub mod enhanced;
pub mod snapshot;

pub use basic::{BasicData, BrowserInfo, ConnectionSpeed, DeviceClass, ScreenInfo, UNKNOWN};
pub use chat::{ChatRequest, ChatResponse};
pub use enhanced::{
    BatteryStatus, DeviceCapabilities, EnhancedData, GeoFix, InteractionCounts,
    InteractionMetrics, IpLocation, Location,
};
pub use snapshot::{AllData, CollectorSnapshot};

use serde::{Serialize, Serializer};

/// Serialize `None` as the `"unknown"` sentinel instead of `null`.
pub(crate) fn or_unknown<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(inner) => inner.serialize(serializer),
        None => serializer.serialize_str(UNKNOWN),
    }
}
