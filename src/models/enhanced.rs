use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub ip: String,
}

/// Exactly one source fills the location per collection cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum Location {
    Geolocation(GeoFix),
    IpLookup(IpLocation),
}

impl Location {
    pub fn source(&self) -> &'static str {
        match self {
            Location::Geolocation(_) => "geolocation",
            Location::IpLookup(_) => "ipLookup",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Geolocation(fix) => write!(
                f,
                "{:.4}, {:.4} (accuracy {:.0}m)",
                fix.latitude, fix.longitude, fix.accuracy
            ),
            Location::IpLookup(ip) => {
                let parts: Vec<&str> = [ip.city.as_str(), ip.region.as_str(), ip.country.as_str()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect();
                if parts.is_empty() {
                    f.write_str("Unknown")
                } else {
                    f.write_str(&parts.join(", "))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub has_camera: bool,
    pub has_microphone: bool,
}

impl fmt::Display for DeviceCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
        write!(
            f,
            "Camera: {}, Microphone: {}",
            yes_no(self.has_camera),
            yes_no(self.has_microphone)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatteryStatus {
    /// 0.0 ..= 1.0
    pub level: f64,
    pub charging: bool,
    #[serde(default)]
    pub charging_time_secs: Option<f64>,
    #[serde(default)]
    pub discharging_time_secs: Option<f64>,
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percent = (self.level.clamp(0.0, 1.0) * 100.0).round();
        let state = if self.charging { "charging" } else { "not charging" };
        write!(f, "{percent:.0}% ({state})")
    }
}

/// Raw per-session counters, persisted under `interactionCounts`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCounts {
    pub clicks: u64,
    pub keystrokes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetrics {
    pub clicks: u64,
    pub keystrokes: u64,
    pub clicks_per_minute: f64,
    pub keystrokes_per_minute: f64,
}

impl InteractionMetrics {
    pub fn derive(counts: InteractionCounts, session_secs: u64) -> Self {
        // Rates over less than a second are meaningless; treat as one second.
        let minutes = session_secs.max(1) as f64 / 60.0;
        Self {
            clicks: counts.clicks,
            keystrokes: counts.keystrokes,
            clicks_per_minute: counts.clicks as f64 / minutes,
            keystrokes_per_minute: counts.keystrokes as f64 / minutes,
        }
    }
}

/// Facts gathered only after the user opted in. Every probe is best-effort,
/// so each field stays `None` until its probe succeeds once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedData {
    pub location: Option<Location>,
    pub session_duration_secs: Option<u64>,
    pub interaction: Option<InteractionMetrics>,
    pub device_capabilities: Option<DeviceCapabilities>,
    pub battery: Option<BatteryStatus>,
    pub connection_type: Option<String>,
    pub user_agent: Option<String>,
    pub operating_system: Option<String>,
    pub plugins: Option<Vec<String>>,
}
