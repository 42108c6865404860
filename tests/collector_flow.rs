use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use lola_lib::collector::FixedConsent;
use lola_lib::models::{IpLocation, Location};
use lola_lib::network::{IpLocator, LatencyProbe};
use lola_lib::preferences::{ENHANCED_EXPERIENCE, SESSION_START};
use lola_lib::{
    generate_system_prompt, ChatRequest, ClientReport, CollectorConfig, CollectorOptions,
    ConsentDecision, DataCollector, PersonaProfile, PreferenceStore, ProbeError, ProbeResult,
    Probes, ReportedPlatform,
};

struct SlowLink;

#[async_trait]
impl LatencyProbe for SlowLink {
    async fn measure(&self) -> ProbeResult<Duration> {
        Ok(Duration::from_millis(900))
    }
}

struct OfflineLocator;

#[async_trait]
impl IpLocator for OfflineLocator {
    async fn locate(&self) -> ProbeResult<IpLocation> {
        Err(ProbeError::Network("offline".into()))
    }
}

fn desktop_report() -> ClientReport {
    serde_json::from_value(serde_json::json!({
        "viewportWidth": 1440,
        "screenWidth": 2560,
        "screenHeight": 1440,
        "pixelRatio": 2.0,
        "timeZone": "America/Denver",
        "language": "en-US",
        "prefersDarkMode": false,
        "referrer": "https://news.ycombinator.com/",
        "userAgent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.109 Safari/537.36",
        "geolocation": {
            "latitude": 39.74,
            "longitude": -104.99,
            "accuracy": 30.0,
            "timestamp": "2024-05-01T12:00:00Z"
        },
        "mediaDevices": {"hasCamera": true, "hasMicrophone": true},
        "connectionType": "wifi"
    }))
    .unwrap()
}

fn collector(store: PreferenceStore, platform: Arc<ReportedPlatform>) -> DataCollector {
    DataCollector::new(
        CollectorConfig::default(),
        store,
        platform,
        Probes::new(Arc::new(SlowLink), Arc::new(OfflineLocator)),
    )
}

#[tokio::test]
async fn test_visit_then_opt_in_then_prompt() {
    let dir = TempDir::new().unwrap();
    let store = PreferenceStore::new(dir.path().join("prefs.json"));
    let platform = Arc::new(ReportedPlatform::new(desktop_report()));
    let collector = collector(store, platform);

    collector.initialize(CollectorOptions::default()).await;
    collector.wait_for_probes().await;
    assert!(collector.get_stored_preference::<i64>(SESSION_START).is_some());

    let profile: PersonaProfile =
        serde_json::from_value(serde_json::json!({"name": "Brooks"})).unwrap();
    let prompt = generate_system_prompt(&profile, &collector);
    assert!(prompt.contains("- Location: the East Coast"));
    assert!(prompt.contains("# Visitor Context\n- Device: desktop\n- Browser: Chrome 120.0.6099.109\n"));
    assert!(prompt.contains("- Connection Speed: slow\n"));
    assert!(prompt.contains("- Referrer: https://news.ycombinator.com/\n"));
    assert!(!prompt.contains("Enhanced Visitor Context"));

    let accepted = collector
        .offer_enhanced_experience(&FixedConsent(ConsentDecision::Accepted), |_| {})
        .await;
    assert!(accepted);
    collector.wait_for_probes().await;

    let data = collector.get_all_data();
    let enhanced = data.enhanced.clone().unwrap();
    assert!(matches!(enhanced.location, Some(Location::Geolocation(_))));
    assert_eq!(enhanced.connection_type.as_deref(), Some("wifi"));

    let prompt = generate_system_prompt(&profile, &collector);
    let enhanced_block = prompt
        .split("# Enhanced Visitor Context\n")
        .nth(1)
        .expect("enhanced block present");
    assert!(enhanced_block.contains("- Operating System: macOS 10.15.7\n"));
    assert!(enhanced_block.contains("- Connection Type: wifi\n"));
    assert!(enhanced_block.contains("- Device Capabilities: Camera: Yes, Microphone: Yes\n"));
    assert!(enhanced_block.contains("- Battery Status: Unknown\n"));

    let request = serde_json::to_value(ChatRequest::new("hi there", Some(data))).unwrap();
    assert_eq!(request["user_input"], "hi there");
    assert_eq!(request["user_data"]["isEnhancedMode"], true);
    assert_eq!(request["user_data"]["basic"]["deviceType"], "desktop");

    collector.stop().await.unwrap();
}

#[tokio::test]
async fn test_sparse_report_degrades_to_unknown() {
    let platform = Arc::new(ReportedPlatform::new(ClientReport::default()));
    let collector = collector(PreferenceStore::in_memory(), platform.clone());

    let basic = collector.collect_basic_data();
    assert_eq!(basic.referrer, "direct");
    let json = serde_json::to_value(&basic).unwrap();
    assert_eq!(json["deviceType"], "unknown");
    assert_eq!(json["timeZone"], "unknown");
    assert_eq!(json["screen"]["width"], "unknown");

    collector
        .set_user_preference(ENHANCED_EXPERIENCE, &true)
        .unwrap();
    collector.wait_for_probes().await;

    // No fix and the IP service is down: location stays empty.
    let enhanced = collector.get_all_data().enhanced.unwrap();
    assert!(enhanced.location.is_none());

    let text = collector.get_formatted_data_for_prompt();
    assert!(text.contains("- Device: Unknown\n"));
    assert!(text.contains("- Location: Unknown\n"));
}
