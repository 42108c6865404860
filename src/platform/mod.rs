//! Where collected facts come from. A browser page reports its environment
//! through [`ReportedPlatform`]; [`HostPlatform`] describes the local machine.

mod host;
mod reported;

pub use host::HostPlatform;
pub use reported::{ClientReport, ReportedPlatform};

use async_trait::async_trait;

use crate::error::ProbeResult;
use crate::models::{BatteryStatus, DeviceCapabilities, GeoFix, ScreenInfo};
use crate::user_agent;

#[async_trait]
pub trait Platform: Send + Sync {
    fn viewport_width(&self) -> Option<u32>;
    fn screen(&self) -> ScreenInfo;
    fn time_zone(&self) -> Option<String>;
    fn language(&self) -> Option<String>;
    fn prefers_dark_mode(&self) -> Option<bool>;
    /// `None` for direct visits.
    fn referrer(&self) -> Option<String>;
    fn user_agent(&self) -> Option<String>;
    fn plugins(&self) -> Vec<String>;

    fn operating_system(&self) -> Option<String> {
        self.user_agent()
            .and_then(|ua| user_agent::parse_os(&ua))
    }

    // Permission-gated or otherwise asynchronous probes. Each may fail on its
    // own without affecting the others.
    async fn geolocation(&self) -> ProbeResult<GeoFix>;
    async fn media_devices(&self) -> ProbeResult<DeviceCapabilities>;
    async fn battery(&self) -> ProbeResult<BatteryStatus>;
    async fn connection_type(&self) -> ProbeResult<String>;
}
