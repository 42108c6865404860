use anyhow::{Context, Result};
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// A background task that stops when its token is cancelled.
struct ScheduledTask {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl ScheduledTask {
    fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(task(cancel_token.clone()));
        Self {
            handle,
            cancel_token,
        }
    }

    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    async fn stop(self) -> Result<()> {
        self.cancel_token.cancel();
        self.handle
            .await
            .context("scheduled task failed to join")
    }
}

/// Owns the collector's timers: the periodic refresh and the one-shot
/// enhanced-experience offer. Arming a timer replaces the previous one.
#[derive(Default)]
pub(crate) struct Scheduler {
    refresh: Option<ScheduledTask>,
    offer: Option<ScheduledTask>,
}

impl Scheduler {
    pub async fn arm_refresh<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.refresh.take() {
            log_info!("replacing armed refresh timer");
            if let Err(err) = previous.stop().await {
                log_warn!("previous refresh timer ended badly: {err:?}");
            }
        }
        self.refresh = Some(ScheduledTask::spawn(task));
    }

    pub async fn arm_offer<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.offer.take() {
            if let Err(err) = previous.stop().await {
                log_warn!("previous offer timer ended badly: {err:?}");
            }
        }
        self.offer = Some(ScheduledTask::spawn(task));
    }

    pub fn is_refresh_armed(&self) -> bool {
        self.refresh.as_ref().is_some_and(ScheduledTask::is_running)
    }

    pub async fn stop(&mut self) -> Result<()> {
        let refresh = self.refresh.take();
        let offer = self.offer.take();

        let offer_result = match offer {
            Some(task) => task.stop().await,
            None => Ok(()),
        };
        let refresh_result = match refresh {
            Some(task) => task.stop().await,
            None => Ok(()),
        };
        offer_result.and(refresh_result)
    }
}
