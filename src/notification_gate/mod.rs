//! NotificationGate - Rate-Limited Alert Dispatch
//!
//! ## Responsibilities
//!
//! - On each motion event, dispatch an alert through the injected
//!   capability if the cooldown window has elapsed
//! - Update the throttle timestamp on dispatch attempt (a failed attempt
//!   still arms the cooldown; there is no retry contract)
//! - Log dispatch failures as non-fatal

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Pushover message endpoint
const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

/// Outbound motion alert
#[derive(Debug, Clone)]
pub struct Alert {
    pub message: String,
    pub title: Option<String>,
    /// Link to the live view, shown on the alert
    pub link: Option<String>,
}

/// External alert capability; success/failure only, no retry contract
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Deliver one alert
    async fn dispatch(&self, alert: &Alert) -> Result<()>;
}

/// Pushover-backed dispatcher
pub struct PushoverDispatcher {
    client: reqwest::Client,
    token: String,
    user: String,
}

impl PushoverDispatcher {
    /// Create a dispatcher with application token and user key
    pub fn new(token: String, user: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            token,
            user,
        }
    }
}

#[async_trait]
impl AlertDispatcher for PushoverDispatcher {
    async fn dispatch(&self, alert: &Alert) -> Result<()> {
        let mut form: Vec<(&str, &str)> = vec![
            ("token", self.token.as_str()),
            ("user", self.user.as_str()),
            ("message", alert.message.as_str()),
        ];
        if let Some(ref title) = alert.title {
            form.push(("title", title.as_str()));
        }
        if let Some(ref link) = alert.link {
            form.push(("url", link.as_str()));
            form.push(("url_title", "View Stream"));
        }

        let resp = self.client.post(PUSHOVER_URL).form(&form).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Notification(format!(
                "pushover returned {}",
                resp.status()
            )));
        }

        tracing::debug!("Alert dispatched");
        Ok(())
    }
}

/// Dispatcher used when no alert credentials are configured; logs the
/// alert instead of delivering it
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn dispatch(&self, alert: &Alert) -> Result<()> {
        tracing::info!(
            message = %alert.message,
            title = ?alert.title,
            "Alert (no dispatcher configured)"
        );
        Ok(())
    }
}

/// NotificationGate instance.
///
/// Owned by the pipeline task; the throttle state is not shared.
pub struct NotificationGate {
    dispatcher: Arc<dyn AlertDispatcher>,
    cooldown: Duration,
    last_attempt: Option<Instant>,
}

impl NotificationGate {
    /// Create a gate over the given dispatcher and cooldown window
    pub fn new(dispatcher: Arc<dyn AlertDispatcher>, cooldown: Duration) -> Self {
        Self {
            dispatcher,
            cooldown,
            last_attempt: None,
        }
    }

    /// Whether a dispatch at `now` would pass the throttle
    fn ready(&self, now: Instant) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => now.duration_since(last) >= self.cooldown,
        }
    }

    /// Handle a motion event at `now`; returns whether a dispatch was
    /// attempted.
    ///
    /// The throttle timestamp is updated on attempt, so a failed dispatch
    /// still suppresses alerts for a full cooldown window.
    pub async fn on_motion(&mut self, now: Instant, alert: Alert) -> bool {
        if !self.ready(now) {
            return false;
        }
        self.last_attempt = Some(now);

        if let Err(e) = self.dispatcher.dispatch(&alert).await {
            tracing::warn!(error = %e, "Alert dispatch failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDispatcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingDispatcher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AlertDispatcher for CountingDispatcher {
        async fn dispatch(&self, _alert: &Alert) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Notification("refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn alert() -> Alert {
        Alert {
            message: "Movement detected!".to_string(),
            title: Some("Security Alert".to_string()),
            link: None,
        }
    }

    #[tokio::test]
    async fn test_at_most_one_dispatch_per_window() {
        let dispatcher = CountingDispatcher::new(false);
        let mut gate = NotificationGate::new(dispatcher.clone(), Duration::from_secs(30));
        let t0 = Instant::now();

        // Continuous motion inside one cooldown window
        for i in 0..29u64 {
            gate.on_motion(t0 + Duration::from_secs(i), alert()).await;
        }
        assert_eq!(dispatcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_dispatches_again_after_window_elapses() {
        let dispatcher = CountingDispatcher::new(false);
        let mut gate = NotificationGate::new(dispatcher.clone(), Duration::from_secs(30));
        let t0 = Instant::now();

        assert!(gate.on_motion(t0, alert()).await);
        assert!(!gate.on_motion(t0 + Duration::from_secs(29), alert()).await);
        assert!(gate.on_motion(t0 + Duration::from_secs(30), alert()).await);
        assert_eq!(dispatcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_two_bursts_forty_five_seconds_apart() {
        let dispatcher = CountingDispatcher::new(false);
        let mut gate = NotificationGate::new(dispatcher.clone(), Duration::from_secs(30));
        let t0 = Instant::now();

        // First burst: ten frames of motion
        for i in 0..10u64 {
            gate.on_motion(t0 + Duration::from_millis(i * 100), alert())
                .await;
        }
        // Second burst 45 seconds later
        let t1 = t0 + Duration::from_secs(45);
        for i in 0..10u64 {
            gate.on_motion(t1 + Duration::from_millis(i * 100), alert())
                .await;
        }
        assert_eq!(dispatcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_attempt_still_arms_throttle() {
        let dispatcher = CountingDispatcher::new(true);
        let mut gate = NotificationGate::new(dispatcher.clone(), Duration::from_secs(30));
        let t0 = Instant::now();

        // Failure is non-fatal and counts as the attempt
        assert!(gate.on_motion(t0, alert()).await);
        assert!(!gate.on_motion(t0 + Duration::from_secs(10), alert()).await);
        assert_eq!(dispatcher.calls(), 1);
    }
}
