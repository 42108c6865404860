pub mod config;
pub mod consent;
pub mod controller;
pub mod format;
mod refresh_loop;
mod scheduler;

pub use config::{CollectorConfig, CollectorOptions};
pub use consent::{ConsentDecision, ConsentPrompt, FixedConsent, TerminalConsentPrompt};
pub use controller::{DataCollector, DIRECT_REFERRER};
pub use format::format_for_prompt;
