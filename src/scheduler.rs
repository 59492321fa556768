use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::app::App;

enum Message {
    Shutdown,
}

/// Handle for the background refresh loop.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<Message>,
}

impl SchedulerHandle {
    /// Signal the loop to stop. A cycle already in flight finishes first.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(Message::Shutdown).await;
    }
}

struct RefreshScheduler {
    app: Arc<App>,
    interval: Duration,
    receiver: mpsc::Receiver<Message>,
}

impl RefreshScheduler {
    async fn run(mut self) {
        loop {
            self.app.refresh_all().await;

            // The delay is measured from cycle completion, so slow
            // cycles space themselves out instead of overlapping.
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                msg = self.receiver.recv() => {
                    match msg {
                        Some(Message::Shutdown) | None => {
                            info!("Refresh scheduler stopped");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Spawn the refresh loop on the runtime.
///
/// The first cycle starts immediately; every later cycle starts
/// `interval` after the previous one completed. The loop runs until a
/// handle signals shutdown or every handle has been dropped.
pub fn spawn(app: Arc<App>, interval: Duration) -> SchedulerHandle {
    let (sender, receiver) = mpsc::channel(8);
    let scheduler = RefreshScheduler {
        app,
        interval,
        receiver,
    };
    tokio::spawn(scheduler.run());

    SchedulerHandle { sender }
}
