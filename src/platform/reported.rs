use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::Path,
    sync::{RwLock, RwLockReadGuard},
};

use super::Platform;
use crate::error::{ProbeError, ProbeResult};
use crate::models::{BatteryStatus, DeviceCapabilities, GeoFix, ScreenInfo};

/// Raw environment facts posted by the browser-side shim. Anything the page
/// could not read is simply left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientReport {
    pub viewport_width: Option<u32>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub pixel_ratio: Option<f64>,
    pub time_zone: Option<String>,
    pub language: Option<String>,
    pub prefers_dark_mode: Option<bool>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub plugins: Vec<String>,
    pub geolocation: Option<GeoFix>,
    pub geolocation_denied: bool,
    pub media_devices: Option<DeviceCapabilities>,
    pub battery: Option<BatteryStatus>,
    pub connection_type: Option<String>,
}

impl ClientReport {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read client report from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse client report in {}", path.display()))
    }
}

pub struct ReportedPlatform {
    report: RwLock<ClientReport>,
}

impl ReportedPlatform {
    pub fn new(report: ClientReport) -> Self {
        Self {
            report: RwLock::new(report),
        }
    }

    /// Swap in a fresher report; the next collection picks it up.
    pub fn update(&self, report: ClientReport) {
        let mut guard = match self.report.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = report;
    }

    fn report(&self) -> RwLockReadGuard<'_, ClientReport> {
        match self.report.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[async_trait]
impl Platform for ReportedPlatform {
    fn viewport_width(&self) -> Option<u32> {
        self.report().viewport_width
    }

    fn screen(&self) -> ScreenInfo {
        let report = self.report();
        ScreenInfo {
            width: report.screen_width,
            height: report.screen_height,
            pixel_ratio: report.pixel_ratio,
        }
    }

    fn time_zone(&self) -> Option<String> {
        non_empty(&self.report().time_zone)
    }

    fn language(&self) -> Option<String> {
        non_empty(&self.report().language)
    }

    fn prefers_dark_mode(&self) -> Option<bool> {
        self.report().prefers_dark_mode
    }

    fn referrer(&self) -> Option<String> {
        non_empty(&self.report().referrer)
    }

    fn user_agent(&self) -> Option<String> {
        non_empty(&self.report().user_agent)
    }

    fn plugins(&self) -> Vec<String> {
        self.report().plugins.clone()
    }

    async fn geolocation(&self) -> ProbeResult<GeoFix> {
        let report = self.report();
        if report.geolocation_denied {
            return Err(ProbeError::PermissionDenied("geolocation"));
        }
        report
            .geolocation
            .clone()
            .ok_or(ProbeError::Unavailable("geolocation"))
    }

    async fn media_devices(&self) -> ProbeResult<DeviceCapabilities> {
        self.report()
            .media_devices
            .ok_or(ProbeError::Unavailable("media devices"))
    }

    async fn battery(&self) -> ProbeResult<BatteryStatus> {
        self.report()
            .battery
            .clone()
            .ok_or(ProbeError::Unavailable("battery"))
    }

    async fn connection_type(&self) -> ProbeResult<String> {
        non_empty(&self.report().connection_type).ok_or(ProbeError::Unavailable("connection type"))
    }
}
