use async_trait::async_trait;
use chrono::Local;
use sysinfo::System;

use super::Platform;
use crate::error::{ProbeError, ProbeResult};
use crate::models::{BatteryStatus, DeviceCapabilities, GeoFix, ScreenInfo};

/// Describes the machine the collector runs on. Browser-only facts (viewport,
/// plugins, permission-gated sensors) are reported as unavailable.
pub struct HostPlatform {
    operating_system: Option<String>,
    language: Option<String>,
    time_zone: Option<String>,
}

impl HostPlatform {
    pub fn detect() -> Self {
        let operating_system = System::long_os_version().or_else(System::name);
        let language = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(|v| locale_to_language(&v)));
        let time_zone = std::env::var("TZ")
            .ok()
            .filter(|tz| !tz.trim().is_empty())
            .or_else(|| Some(format!("UTC{}", Local::now().format("%:z"))));

        Self {
            operating_system,
            language,
            time_zone,
        }
    }
}

/// `en_US.UTF-8` -> `en-US`. `C`/`POSIX` carry no language.
fn locale_to_language(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next()?.trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

#[async_trait]
impl Platform for HostPlatform {
    fn viewport_width(&self) -> Option<u32> {
        None
    }

    fn screen(&self) -> ScreenInfo {
        ScreenInfo::default()
    }

    fn time_zone(&self) -> Option<String> {
        self.time_zone.clone()
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn prefers_dark_mode(&self) -> Option<bool> {
        None
    }

    fn referrer(&self) -> Option<String> {
        None
    }

    fn user_agent(&self) -> Option<String> {
        Some(format!(
            "lola/{} ({})",
            env!("CARGO_PKG_VERSION"),
            self.operating_system.as_deref().unwrap_or("unknown OS")
        ))
    }

    fn plugins(&self) -> Vec<String> {
        Vec::new()
    }

    fn operating_system(&self) -> Option<String> {
        self.operating_system.clone()
    }

    async fn geolocation(&self) -> ProbeResult<GeoFix> {
        Err(ProbeError::Unavailable("geolocation"))
    }

    async fn media_devices(&self) -> ProbeResult<DeviceCapabilities> {
        Err(ProbeError::Unavailable("media devices"))
    }

    async fn battery(&self) -> ProbeResult<BatteryStatus> {
        Err(ProbeError::Unavailable("battery"))
    }

    async fn connection_type(&self) -> ProbeResult<String> {
        Err(ProbeError::Unavailable("connection type"))
    }
}
