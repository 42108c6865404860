use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use super::config::{CollectorConfig, CollectorOptions};
use super::consent::ConsentPrompt;
use super::format::format_for_prompt;
use super::refresh_loop::{offer_after_delay, refresh_loop};
use super::scheduler::Scheduler;
use crate::error::{ProbeError, ProbeResult};
use crate::models::{
    AllData, BasicData, BrowserInfo, CollectorSnapshot, ConnectionSpeed, DeviceClass,
    EnhancedData, InteractionCounts, InteractionMetrics, Location, UNKNOWN,
};
use crate::network::Probes;
use crate::platform::Platform;
use crate::preferences::{
    PreferenceStore, ENHANCED_EXPERIENCE, ENHANCED_EXPERIENCE_SHOWN, INTERACTION_COUNTS,
    SESSION_START,
};
use crate::user_agent::parse_browser;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Referrer reported for visits that did not come from another page.
pub const DIRECT_REFERRER: &str = "direct";

struct CollectorState {
    config: CollectorConfig,
    snapshot: CollectorSnapshot,
    session_start: DateTime<Utc>,
    interactions: InteractionCounts,
}

struct CollectorInner {
    state: Mutex<CollectorState>,
    store: PreferenceStore,
    platform: Arc<dyn Platform>,
    probes: Probes,
    /// Probes launched outside a refresh (speed test, opt-in collection).
    tasks: TaskTracker,
    scheduler: tokio::sync::Mutex<Scheduler>,
}

/// Gathers basic and (after opt-in) enhanced facts about the visitor and owns
/// the consent preferences.
///
/// Cheap to clone; clones share the same snapshot. Timers started by
/// [`DataCollector::start`] hold only a weak reference and end with
/// [`DataCollector::stop`] or when the last handle is dropped.
#[derive(Clone)]
pub struct DataCollector {
    inner: Arc<CollectorInner>,
}

#[derive(Clone)]
pub(crate) struct WeakCollector {
    inner: Weak<CollectorInner>,
}

impl WeakCollector {
    pub fn upgrade(&self) -> Option<DataCollector> {
        self.inner.upgrade().map(|inner| DataCollector { inner })
    }
}

impl DataCollector {
    pub fn new(
        config: CollectorConfig,
        store: PreferenceStore,
        platform: Arc<dyn Platform>,
        probes: Probes,
    ) -> Self {
        Self {
            inner: Arc::new(CollectorInner {
                state: Mutex::new(CollectorState {
                    config,
                    snapshot: CollectorSnapshot::default(),
                    session_start: Utc::now(),
                    interactions: InteractionCounts::default(),
                }),
                store,
                platform,
                probes,
                tasks: TaskTracker::new(),
                scheduler: tokio::sync::Mutex::new(Scheduler::default()),
            }),
        }
    }

    fn downgrade(&self) -> WeakCollector {
        WeakCollector {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn state(&self) -> MutexGuard<'_, CollectorState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn config(&self) -> CollectorConfig {
        self.state().config.clone()
    }

    pub fn is_enhanced_mode(&self) -> bool {
        self.state().snapshot.is_enhanced_mode
    }

    /// Start a session: merge `options`, restore the opt-in decision, collect
    /// the basic tier (and the enhanced tier if opted in) and arm the refresh
    /// timer. Calling it again re-arms the timer, replacing the old one.
    pub async fn initialize(&self, options: CollectorOptions) {
        let opted_in = self
            .get_stored_preference::<bool>(ENHANCED_EXPERIENCE)
            .unwrap_or(false);
        let session_start = Utc::now();

        {
            let mut state = self.state();
            state.config = state.config.merged(&options);
            state.snapshot.is_enhanced_mode = opted_in;
            if !opted_in {
                state.snapshot.enhanced = EnhancedData::default();
            }
            state.session_start = session_start;
            state.interactions = InteractionCounts::default();
        }

        if let Err(err) = self
            .inner
            .store
            .set(SESSION_START, &session_start.timestamp_millis())
        {
            log_warn!("failed to persist session start: {err:?}");
        }
        self.persist_interactions();

        self.collect_basic_data();
        if opted_in {
            self.launch_enhanced_collection();
        }

        self.start().await;

        log_info!(
            "collector initialized (enhanced mode: {opted_in}, refresh every {}ms)",
            self.config().collection_interval.as_millis()
        );
    }

    /// Arm the periodic refresh with the current config.
    pub async fn start(&self) {
        let (interval, refresh_timeout) = {
            let state = self.state();
            (state.config.collection_interval, state.config.refresh_timeout)
        };
        let weak = self.downgrade();

        self.inner
            .scheduler
            .lock()
            .await
            .arm_refresh(move |token| refresh_loop(weak, interval, refresh_timeout, token))
            .await;
    }

    /// Cancel the refresh and offer timers. In-flight probes are left to
    /// settle; see [`DataCollector::wait_for_probes`].
    pub async fn stop(&self) -> Result<()> {
        self.inner.scheduler.lock().await.stop().await?;
        log_info!("collector stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.scheduler.lock().await.is_refresh_armed()
    }

    /// Wait until every launched probe has settled.
    pub async fn wait_for_probes(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Read the basic tier synchronously and launch the speed probe. Never
    /// fails: unavailable facts become `unknown`.
    pub fn collect_basic_data(&self) -> BasicData {
        let platform = &self.inner.platform;
        let browser = platform
            .user_agent()
            .map(|ua| parse_browser(&ua))
            .unwrap_or_else(BrowserInfo::unknown);

        let mut state = self.state();
        let previous_speed = state
            .snapshot
            .basic
            .as_ref()
            .map(|basic| basic.connection_speed)
            .unwrap_or_default();

        let basic = BasicData {
            device_type: platform
                .viewport_width()
                .map(DeviceClass::from_viewport_width)
                .unwrap_or_default(),
            browser,
            screen: platform.screen(),
            time_zone: platform.time_zone().unwrap_or_else(|| UNKNOWN.into()),
            language: platform.language().unwrap_or_else(|| UNKNOWN.into()),
            dark_mode: platform.prefers_dark_mode(),
            connection_speed: previous_speed,
            visit_time: state.session_start,
            referrer: platform
                .referrer()
                .unwrap_or_else(|| DIRECT_REFERRER.into()),
        };

        state.snapshot.basic = Some(basic.clone());
        state.snapshot.last_updated = Some(Utc::now());
        drop(state);

        self.launch_speed_probe();
        basic
    }

    fn launch_speed_probe(&self) {
        let Ok(handle) = Handle::try_current() else {
            log_warn!("no async runtime; connection speed stays unknown");
            return;
        };

        let collector = self.clone();
        self.inner.tasks.spawn_on(
            async move {
                let speed = match collector.inner.probes.latency.measure().await {
                    Ok(elapsed) => {
                        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                        log_debug!("speed probe took {ms}ms");
                        ConnectionSpeed::classify(ms)
                    }
                    Err(err) => {
                        log_warn!("speed probe failed: {err}");
                        ConnectionSpeed::Unknown
                    }
                };

                let mut state = collector.state();
                if let Some(basic) = state.snapshot.basic.as_mut() {
                    basic.connection_speed = speed;
                };
            },
            &handle,
        );
    }

    fn launch_enhanced_collection(&self) {
        let Ok(handle) = Handle::try_current() else {
            log_warn!("no async runtime; enhanced collection skipped");
            return;
        };

        let collector = self.clone();
        self.inner.tasks.spawn_on(
            async move {
                collector.collect_enhanced_data().await;
            },
            &handle,
        );
    }

    /// Run every enhanced probe concurrently. Each result is merged into the
    /// snapshot as soon as it settles, so one slow probe never holds back
    /// the others. Returns `None` (and logs a warning) when the user has not
    /// opted in, or opted out before the probes finished.
    pub async fn collect_enhanced_data(&self) -> Option<EnhancedData> {
        if !self.is_enhanced_mode() {
            log_warn!("enhanced collection requested without opt-in; ignoring");
            return None;
        }

        let platform = &self.inner.platform;
        let user_agent = platform.user_agent();
        let operating_system = platform.operating_system();
        let plugins = platform.plugins();
        {
            let mut state = self.state();
            if !state.snapshot.is_enhanced_mode {
                return None;
            }
            let session_secs =
                u64::try_from((Utc::now() - state.session_start).num_seconds()).unwrap_or(0);
            let interactions = state.interactions;

            let enhanced = &mut state.snapshot.enhanced;
            enhanced.session_duration_secs = Some(session_secs);
            enhanced.interaction = Some(InteractionMetrics::derive(interactions, session_secs));
            if user_agent.is_some() {
                enhanced.user_agent = user_agent;
            }
            if operating_system.is_some() {
                enhanced.operating_system = operating_system;
            }
            enhanced.plugins = Some(plugins);
        }

        tokio::join!(
            async {
                let location = self.resolve_location().await;
                self.merge_enhanced(|enhanced| {
                    merge_probe(&mut enhanced.location, location, "location")
                });
            },
            async {
                let capabilities = platform.media_devices().await;
                self.merge_enhanced(|enhanced| {
                    merge_probe(&mut enhanced.device_capabilities, capabilities, "media devices")
                });
            },
            async {
                let battery = platform.battery().await;
                self.merge_enhanced(|enhanced| {
                    merge_probe(&mut enhanced.battery, battery, "battery")
                });
            },
            async {
                let connection_type = platform.connection_type().await;
                self.merge_enhanced(|enhanced| {
                    merge_probe(&mut enhanced.connection_type, connection_type, "connection type")
                });
            },
        );

        let state = self.state();
        if !state.snapshot.is_enhanced_mode {
            log_info!("discarding enhanced results collected before opt-out");
            return None;
        }
        Some(state.snapshot.enhanced.clone())
    }

    /// Apply one settled result to the enhanced tier. Dropped when the user
    /// has opted out in the meantime.
    fn merge_enhanced<F: FnOnce(&mut EnhancedData)>(&self, apply: F) {
        let mut state = self.state();
        if !state.snapshot.is_enhanced_mode {
            return;
        }
        apply(&mut state.snapshot.enhanced);
        state.snapshot.last_updated = Some(Utc::now());
    }

    /// On-device geolocation first; the IP lookup when that fails or the
    /// permission prompt is not answered within `geolocation_timeout`.
    async fn resolve_location(&self) -> ProbeResult<Location> {
        let wait = self.state().config.geolocation_timeout;
        let fix = match tokio::time::timeout(wait, self.inner.platform.geolocation()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::TimedOut("geolocation")),
        };

        match fix {
            Ok(fix) => Ok(Location::Geolocation(fix)),
            Err(err) => {
                log_info!("geolocation unavailable ({err}); falling back to IP lookup");
                self.inner
                    .probes
                    .locator
                    .locate()
                    .await
                    .map(Location::IpLookup)
            }
        }
    }

    /// Re-collect the basic tier, and the enhanced tier when opted in.
    pub async fn refresh_data(&self) {
        self.collect_basic_data();
        if self.is_enhanced_mode() {
            self.collect_enhanced_data().await;
        }
        self.persist_interactions();
        self.state().snapshot.last_updated = Some(Utc::now());
    }

    pub fn get_stored_preference<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.store.get(key)
    }

    /// Persist a preference. Writing `enhancedExperience` also switches the
    /// enhanced mode; switching it on starts an enhanced collection at once,
    /// switching it off drops any cached enhanced data.
    pub fn set_user_preference<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let stored = self.inner.store.set(key, value);
        if let Err(err) = &stored {
            log_error!("failed to persist preference {key}: {err:?}");
        }

        if key == ENHANCED_EXPERIENCE {
            let enabled = serde_json::to_value(value)
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            self.apply_enhanced_mode(enabled);
        }

        stored
    }

    fn apply_enhanced_mode(&self, enabled: bool) {
        let newly_enabled = {
            let mut state = self.state();
            let was_enabled = state.snapshot.is_enhanced_mode;
            state.snapshot.is_enhanced_mode = enabled;
            if !enabled {
                state.snapshot.enhanced = EnhancedData::default();
            }
            enabled && !was_enabled
        };

        if newly_enabled {
            log_info!("enhanced mode enabled; collecting enhanced data");
            self.launch_enhanced_collection();
        }
    }

    /// The public view of the snapshot; enhanced data only while opted in.
    pub fn get_all_data(&self) -> AllData {
        self.state().snapshot.all_data()
    }

    pub fn get_formatted_data_for_prompt(&self) -> String {
        format_for_prompt(&self.get_all_data())
    }

    /// Ask the user, persist the answer and report it to `on_decision`.
    pub async fn offer_enhanced_experience<F>(
        &self,
        prompt: &dyn ConsentPrompt,
        on_decision: F,
    ) -> bool
    where
        F: FnOnce(bool),
    {
        let decision = prompt.ask().await;
        let accepted = decision.accepted();
        log_info!("enhanced experience decision: {decision:?}");

        // Failure is already logged; the in-memory decision still applies.
        let _ = self.set_user_preference(ENHANCED_EXPERIENCE, &accepted);
        on_decision(accepted);
        accepted
    }

    /// Offer unless this browser has already seen the offer. The offer is
    /// marked as shown before the user answers. Returns `None` when skipped.
    pub async fn offer_enhanced_experience_once<F>(
        &self,
        prompt: &dyn ConsentPrompt,
        on_decision: F,
    ) -> Option<bool>
    where
        F: FnOnce(bool),
    {
        match self.inner.store.set_flag_once(ENHANCED_EXPERIENCE_SHOWN) {
            Ok(true) => {}
            Ok(false) => return None,
            // Only the write to disk failed; this call still holds the flag.
            Err(err) => log_warn!("failed to persist {ENHANCED_EXPERIENCE_SHOWN}: {err:?}"),
        }
        Some(self.offer_enhanced_experience(prompt, on_decision).await)
    }

    /// Arm the one-shot offer timer (`offer_delay` from the config).
    pub async fn schedule_enhanced_offer<F>(&self, prompt: Arc<dyn ConsentPrompt>, on_decision: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let delay = self.state().config.offer_delay;
        let weak = self.downgrade();

        self.inner
            .scheduler
            .lock()
            .await
            .arm_offer(move |token| offer_after_delay(weak, delay, prompt, on_decision, token))
            .await;
    }

    pub fn record_click(&self) {
        self.state().interactions.clicks += 1;
    }

    pub fn record_keystroke(&self) {
        self.state().interactions.keystrokes += 1;
    }

    pub fn interaction_counts(&self) -> InteractionCounts {
        self.state().interactions
    }

    fn persist_interactions(&self) {
        let counts = self.interaction_counts();
        if let Err(err) = self.inner.store.set(INTERACTION_COUNTS, &counts) {
            log_warn!("failed to persist interaction counters: {err:?}");
        }
    }
}

fn merge_probe<T>(slot: &mut Option<T>, result: ProbeResult<T>, probe: &str) {
    match result {
        Ok(value) => *slot = Some(value),
        Err(err) => log_info!("{probe} probe produced nothing: {err}"),
    }
}
