use std::sync::Arc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::consent::ConsentPrompt;
use super::controller::WeakCollector;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Refreshes the snapshot every `interval` until cancelled or until the
/// collector itself is dropped. The first tick fires one interval after start
/// since `initialize` has just collected.
pub(crate) async fn refresh_loop(
    collector: WeakCollector,
    interval: Duration,
    refresh_timeout: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(collector) = collector.upgrade() else {
                    log_info!("collector dropped; refresh loop exiting");
                    break;
                };

                let started = Instant::now();
                match tokio::time::timeout(refresh_timeout, collector.refresh_data()).await {
                    Ok(()) => log_debug!("refresh completed in {}ms", started.elapsed().as_millis()),
                    Err(_) => log_warn!("refresh timed out (> {}ms); outstanding probes dropped", refresh_timeout.as_millis()),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("refresh loop shutting down");
                break;
            }
        }
    }
}

/// Waits `delay`, then offers the enhanced experience unless it was offered
/// before in this browser.
pub(crate) async fn offer_after_delay<F>(
    collector: WeakCollector,
    delay: Duration,
    prompt: Arc<dyn ConsentPrompt>,
    on_decision: F,
    cancel_token: CancellationToken,
) where
    F: FnOnce(bool) + Send + 'static,
{
    let offer = async move {
        tokio::time::sleep(delay).await;
        let Some(collector) = collector.upgrade() else {
            return;
        };
        match collector
            .offer_enhanced_experience_once(prompt.as_ref(), on_decision)
            .await
        {
            Some(accepted) => log_info!("enhanced experience offer answered: accepted={accepted}"),
            None => log_debug!("enhanced experience already offered; skipping"),
        }
    };

    tokio::select! {
        _ = offer => {}
        _ = cancel_token.cancelled() => {
            log_info!("enhanced experience offer cancelled");
        }
    }
}
