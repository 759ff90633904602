//! 后台轮询循环
//!
//! 按固定间隔触发一轮对账。start/stop 幂等：重复 start 不会起第二个
//! 循环，stop 通过 CancellationToken 优雅退出并等待任务结束。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::tracking::reconciler::TrackingReconciler;

struct RunningPoller {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

pub struct TrackingPoller {
    reconciler: Arc<TrackingReconciler>,
    poll_interval: Duration,
    running: tokio::sync::Mutex<Option<RunningPoller>>,
}

impl TrackingPoller {
    pub fn new(reconciler: Arc<TrackingReconciler>, poll_interval: Duration) -> Self {
        Self {
            reconciler,
            poll_interval,
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// 启动后台循环，已在运行时返回 false
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref()
            && !current.handle.is_finished()
        {
            tracing::info!("tracking poller already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let reconciler = self.reconciler.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            // 第一个 tick 立即返回，先等一个完整间隔再开始
            ticker.tick().await;
            tracing::info!(interval_secs = poll_interval.as_secs(), "tracking poller started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("tracking poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        reconciler.poll_once().await;
                    }
                }
            }
        });

        *running = Some(RunningPoller { handle, cancel });
        true
    }

    /// 停止后台循环并等待退出，未在运行时返回 false
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(current) = running.take() else {
            return false;
        };

        current.cancel.cancel();
        if let Err(e) = current.handle.await {
            tracing::warn!(error = %e, "tracking poller task join failed");
        }
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    pub fn interval_secs(&self) -> u64 {
        self.poll_interval.as_secs()
    }
}
