// Offline liveness watchdog.
//
// Gateway connections drop and resume routinely, so a disconnect alone is
// not worth an alert. Each disconnect arms a single delayed check; any
// reconnect disarms it. Only a disconnect that outlives the alert window
// posts a status embed to the log channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tokio::task::JoinHandle;

/// How long a disconnect may last before the alert fires.
const ALERT_DELAY: Duration = Duration::from_secs(60);

pub struct OfflineWatchdog {
    log_channel: serenity::ChannelId,
    connected: AtomicBool,
    /// The armed alert task. At most one is live at a time; a new
    /// disconnect replaces it and a reconnect cancels it.
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl OfflineWatchdog {
    pub fn new(log_channel_id: u64) -> Self {
        Self {
            log_channel: serenity::ChannelId::new(log_channel_id),
            connected: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    /// Called on Ready/Resume: record the connection and disarm any
    /// pending alert.
    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let mut pending = self.pending.lock().expect("watchdog lock poisoned");
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// Called on gateway disconnect: arm a fresh alert.
    pub fn mark_disconnected(self: &Arc<Self>, http: Arc<serenity::Http>) {
        self.connected.store(false, Ordering::SeqCst);

        let watchdog = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ALERT_DELAY).await;
            if !watchdog.connected.load(Ordering::SeqCst) {
                watchdog.post_offline_alert(&http).await;
            }
        });

        let mut pending = self.pending.lock().expect("watchdog lock poisoned");
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    async fn post_offline_alert(&self, http: &serenity::Http) {
        let embed = serenity::CreateEmbed::new()
            .title("Bot Status")
            .description("Planner bridge is offline")
            .colour(0xFF0000);

        let message = serenity::CreateMessage::new().embed(embed);
        if let Err(e) = self.log_channel.send_message(http, message).await {
            tracing::error!("Failed to post offline alert to the log channel: {e}");
        }
    }
}
