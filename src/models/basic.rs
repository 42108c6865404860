use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::or_unknown;

/// Sentinel for facts the host does not expose.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
    #[default]
    Unknown,
}

impl DeviceClass {
    /// Viewports narrower than this are phones.
    pub const TABLET_MIN_WIDTH: u32 = 768;
    /// Viewports at least this wide are desktops.
    pub const DESKTOP_MIN_WIDTH: u32 = 1024;

    pub fn from_viewport_width(width: u32) -> Self {
        if width < Self::TABLET_MIN_WIDTH {
            DeviceClass::Mobile
        } else if width < Self::DESKTOP_MIN_WIDTH {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Desktop => "desktop",
            DeviceClass::Unknown => UNKNOWN,
        }
    }
}

/// Coarse speed tier derived from the latency of the speed-test fetch.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionSpeed {
    VeryFast,
    Fast,
    Moderate,
    Slow,
    VerySlow,
    #[default]
    Unknown,
}

impl ConnectionSpeed {
    pub fn classify(elapsed_ms: u64) -> Self {
        match elapsed_ms {
            0..=99 => ConnectionSpeed::VeryFast,
            100..=299 => ConnectionSpeed::Fast,
            300..=799 => ConnectionSpeed::Moderate,
            800..=1499 => ConnectionSpeed::Slow,
            _ => ConnectionSpeed::VerySlow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionSpeed::VeryFast => "very fast",
            ConnectionSpeed::Fast => "fast",
            ConnectionSpeed::Moderate => "moderate",
            ConnectionSpeed::Slow => "slow",
            ConnectionSpeed::VerySlow => "very slow",
            ConnectionSpeed::Unknown => UNKNOWN,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

impl BrowserInfo {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.into(),
            version: UNKNOWN.into(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.name != UNKNOWN
    }
}

impl fmt::Display for BrowserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_known(), self.version.as_str()) {
            (false, _) => f.write_str("Unknown"),
            (true, UNKNOWN) | (true, "") => f.write_str(&self.name),
            (true, version) => write!(f, "{} {}", self.name, version),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    #[serde(serialize_with = "or_unknown")]
    pub width: Option<u32>,
    #[serde(serialize_with = "or_unknown")]
    pub height: Option<u32>,
    #[serde(serialize_with = "or_unknown")]
    pub pixel_ratio: Option<f64>,
}

impl ScreenInfo {
    pub fn size_label(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(format!("{width}x{height}")),
            _ => None,
        }
    }
}

/// Facts gathered on every collection, without consent gating.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasicData {
    pub device_type: DeviceClass,
    pub browser: BrowserInfo,
    pub screen: ScreenInfo,
    pub time_zone: String,
    pub language: String,
    #[serde(serialize_with = "or_unknown")]
    pub dark_mode: Option<bool>,
    /// Filled in asynchronously by the speed probe; lags the other fields.
    pub connection_speed: ConnectionSpeed,
    pub visit_time: DateTime<Utc>,
    pub referrer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_thresholds() {
        assert_eq!(DeviceClass::from_viewport_width(0), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_viewport_width(767), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_viewport_width(768), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_viewport_width(1023), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_viewport_width(1024), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_viewport_width(2560), DeviceClass::Desktop);
    }

    #[test]
    fn test_defaults_are_unknown() {
        assert_eq!(DeviceClass::default(), DeviceClass::Unknown);
        assert_eq!(ConnectionSpeed::default(), ConnectionSpeed::Unknown);
        assert_eq!(ConnectionSpeed::default().as_str(), UNKNOWN);
    }

    #[test]
    fn test_speed_thresholds() {
        assert_eq!(ConnectionSpeed::classify(0), ConnectionSpeed::VeryFast);
        assert_eq!(ConnectionSpeed::classify(99), ConnectionSpeed::VeryFast);
        assert_eq!(ConnectionSpeed::classify(100), ConnectionSpeed::Fast);
        assert_eq!(ConnectionSpeed::classify(299), ConnectionSpeed::Fast);
        assert_eq!(ConnectionSpeed::classify(300), ConnectionSpeed::Moderate);
        assert_eq!(ConnectionSpeed::classify(799), ConnectionSpeed::Moderate);
        assert_eq!(ConnectionSpeed::classify(800), ConnectionSpeed::Slow);
        assert_eq!(ConnectionSpeed::classify(1499), ConnectionSpeed::Slow);
        assert_eq!(ConnectionSpeed::classify(1500), ConnectionSpeed::VerySlow);
        assert_eq!(ConnectionSpeed::classify(60_000), ConnectionSpeed::VerySlow);
    }

    #[test]
    fn test_unknown_screen_serializes_sentinel() {
        let screen = ScreenInfo {
            width: Some(390),
            height: None,
            pixel_ratio: None,
        };
        let json = serde_json::to_value(&screen).unwrap();
        assert_eq!(json["width"], 390);
        assert_eq!(json["height"], "unknown");
        assert_eq!(json["pixelRatio"], "unknown");
        assert_eq!(screen.size_label(), None);
    }

    #[test]
    fn test_browser_display() {
        let chrome = BrowserInfo {
            name: "Chrome".into(),
            version: "120.0".into(),
        };
        assert_eq!(chrome.to_string(), "Chrome 120.0");
        assert_eq!(BrowserInfo::unknown().to_string(), "Unknown");
    }
}
