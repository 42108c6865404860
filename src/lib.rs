pub mod collector;
pub mod error;
pub mod models;
pub mod network;
pub mod platform;
pub mod preferences;
pub mod prompt;
pub mod user_agent;
pub mod utils;

pub use collector::{
    CollectorConfig, CollectorOptions, ConsentDecision, ConsentPrompt, DataCollector,
};
pub use error::{ProbeError, ProbeResult};
pub use models::{AllData, BasicData, ChatRequest, ChatResponse, EnhancedData};
pub use network::Probes;
pub use platform::{ClientReport, HostPlatform, Platform, ReportedPlatform};
pub use preferences::PreferenceStore;
pub use prompt::{assemble_system_prompt, generate_system_prompt, PersonaProfile};

use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc, time::Duration};

use collector::TerminalConsentPrompt;

/// Longest the demo waits for the speed test and opt-in probes to settle.
const PROBE_WAIT: Duration = Duration::from_secs(15);

#[derive(Debug, Parser)]
#[command(name = "lola")]
#[command(about = "Collect visitor context and print the assembled system prompt", long_about = None)]
struct CliArgs {
    /// Client report JSON posted by the browser shim; describes this host when omitted
    #[arg(long)]
    report: Option<PathBuf>,

    /// Persona profile JSON
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Preference file (defaults to the system temp dir)
    #[arg(long, env = "LOLA_STORE_PATH")]
    store: Option<PathBuf>,

    /// Ask on the terminal whether to enable the enhanced experience
    #[arg(long)]
    offer: bool,
}

fn default_store_path() -> PathBuf {
    std::env::temp_dir().join("lola-preferences.json")
}

/// One collection pass: gather the snapshot, print it and the system prompt
/// it produces, then shut the timers down.
pub fn run() -> Result<()> {
    utils::init_logging();

    let args = CliArgs::parse();
    log::info!("Lola collector starting up...");

    let platform: Arc<dyn Platform> = match &args.report {
        Some(path) => Arc::new(ReportedPlatform::new(ClientReport::from_json_file(path)?)),
        None => Arc::new(HostPlatform::detect()),
    };
    let profile = match &args.profile {
        Some(path) => PersonaProfile::from_json_file(path)?,
        None => PersonaProfile::default(),
    };

    let config = CollectorConfig::from_env();
    let probes = Probes::http(&config.speed_test_url, &config.ip_lookup_url);
    let store = PreferenceStore::new(args.store.clone().unwrap_or_else(default_store_path));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(async move {
        let collector = DataCollector::new(config, store, platform, probes);
        collector.initialize(CollectorOptions::default()).await;

        if args.offer {
            let answered = collector
                .offer_enhanced_experience_once(&TerminalConsentPrompt, |accepted| {
                    let outcome = if accepted { "enabled" } else { "declined" };
                    log::info!("enhanced experience {outcome}");
                })
                .await;
            if answered.is_none() {
                log::info!("enhanced experience was already offered with this store");
            }
        }

        if tokio::time::timeout(PROBE_WAIT, collector.wait_for_probes())
            .await
            .is_err()
        {
            log::warn!(
                "probes still running after {}s; printing what we have",
                PROBE_WAIT.as_secs()
            );
        }

        let data = serde_json::to_string_pretty(&collector.get_all_data())
            .context("Failed to serialize collected data")?;
        println!("{data}");
        println!();
        println!("{}", generate_system_prompt(&profile, &collector));

        collector.stop().await
    })
}
