//! Connection monitor: presence tracking, on-demand probes and the heartbeat.

use crate::{ConnectionState, Presence, ProbeVerdict, ReachabilityProbe};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tracks network presence and backend reachability.
///
/// State is published through a `watch` channel; every mutation goes
/// through this type.
pub struct ConnectionMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    state: watch::Sender<ConnectionState>,
    probes_in_flight: AtomicUsize,
    pulse_interval: Duration,
}

/// Clears the connecting flag once the last in-flight probe finishes.
struct ProbeGuard<'a> {
    monitor: &'a ConnectionMonitor,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.monitor.probes_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.monitor.state.send_modify(|s| s.is_connecting = false);
        }
    }
}

impl ConnectionMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, pulse_interval: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::default());
        Arc::new(Self {
            probe,
            state,
            probes_in_flight: AtomicUsize::new(0),
            pulse_interval,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Probe the backend once and record the outcome.
    ///
    /// Returns true only when the probe succeeded. While offline no probe is
    /// issued. Failures that do not indicate a network problem leave the
    /// pulse state unchanged.
    pub async fn check_pulse(&self) -> bool {
        if !self.state.borrow().is_online {
            debug!("Offline, skipping pulse check");
            return false;
        }

        let _probing = self.begin_probe();

        match self.probe.probe().await {
            Ok(()) => {
                let now = Utc::now();
                let mut recovered = false;
                self.state.send_modify(|s| {
                    recovered = !s.is_pulse_healthy;
                    s.is_pulse_healthy = true;
                    s.last_pulse_at = Some(now);
                });
                if recovered {
                    info!("Backend reachable again");
                }
                true
            }
            Err(err) => {
                match err.verdict() {
                    ProbeVerdict::Unreachable => {
                        warn!(error = %err, "Backend unreachable");
                        self.state.send_modify(|s| s.is_pulse_healthy = false);
                    }
                    ProbeVerdict::Inconclusive => {
                        warn!(error = %err, "Pulse check inconclusive");
                    }
                }
                false
            }
        }
    }

    fn begin_probe(&self) -> ProbeGuard<'_> {
        self.probes_in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| s.is_connecting = true);
        ProbeGuard { monitor: self }
    }

    /// Apply a platform presence change. Coming online triggers one probe.
    pub async fn handle_presence(&self, presence: Presence) {
        match presence {
            Presence::Online => {
                info!("Network online");
                self.state.send_modify(|s| s.is_online = true);
                self.check_pulse().await;
            }
            Presence::Offline => {
                info!("Network offline");
                self.state.send_modify(|s| {
                    s.is_online = false;
                    s.is_pulse_healthy = false;
                });
            }
        }
    }

    /// Consume presence events until the channel closes or `cancel` fires.
    pub fn spawn_presence_listener(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<Presence>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(presence) => monitor.handle_presence(presence).await,
                        None => break,
                    },
                }
            }
            debug!("Presence listener stopped");
        })
    }

    /// Probe the backend every pulse interval until `cancel` fires.
    ///
    /// The first probe runs one full interval after spawning.
    pub fn spawn_heartbeat(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let monitor = self.clone();
        let period = self.pulse_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.check_pulse().await;
                    }
                }
            }
            debug!("Heartbeat stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use bounded_fetch::FetchError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Probe that replays scripted outcomes, then succeeds.
    #[derive(Default)]
    struct ScriptedProbe {
        outcomes: Mutex<VecDeque<ProbeResult<()>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn with(outcomes: Vec<ProbeResult<()>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReachabilityProbe for ScriptedProbe {
        async fn probe(&self) -> ProbeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.outcomes.lock().pop_front();
            next.unwrap_or(Ok(()))
        }
    }

    fn monitor_with(probe: ScriptedProbe) -> (Arc<ConnectionMonitor>, Arc<ScriptedProbe>) {
        let probe = Arc::new(probe);
        let monitor = ConnectionMonitor::new(probe.clone(), Duration::from_millis(60_000));
        (monitor, probe)
    }

    #[tokio::test]
    async fn test_successful_probe_records_timestamp() {
        let (monitor, _probe) = monitor_with(ScriptedProbe::default());

        assert!(monitor.check_pulse().await);

        let state = monitor.state();
        assert!(state.is_pulse_healthy);
        assert!(!state.is_connecting);
        assert!(state.last_pulse_at.is_some());
    }

    #[tokio::test]
    async fn test_zombie_connection_detected() {
        let (monitor, _probe) = monitor_with(ScriptedProbe::with(vec![Err(
            FetchError::Network("dns error".to_string()).into(),
        )]));

        assert!(!monitor.check_pulse().await);

        let state = monitor.state();
        assert!(state.is_online);
        assert!(!state.is_pulse_healthy);
        assert!(state.is_zombie());
        assert!(!state.is_connecting);
    }

    #[tokio::test]
    async fn test_timeout_marks_unhealthy() {
        let (monitor, _probe) = monitor_with(ScriptedProbe::with(vec![Err(
            FetchError::Timeout { after_ms: 15_000 }.into(),
        )]));

        monitor.check_pulse().await;
        assert!(!monitor.state().is_pulse_healthy);
    }

    #[tokio::test]
    async fn test_inconclusive_error_leaves_state_unchanged() {
        let (monitor, _probe) = monitor_with(ScriptedProbe::with(vec![
            Err(FetchError::Network("connection reset".to_string()).into()),
            Err(ProbeError::Rejected {
                status: 401,
                message: "JWT expired".to_string(),
            }),
        ]));

        monitor.check_pulse().await;
        assert!(!monitor.state().is_pulse_healthy);

        assert!(!monitor.check_pulse().await);
        assert!(!monitor.state().is_pulse_healthy);

        assert!(monitor.check_pulse().await);
        assert!(monitor.state().is_pulse_healthy);
    }

    #[tokio::test]
    async fn test_offline_skips_probe() {
        let (monitor, probe) = monitor_with(ScriptedProbe::default());

        monitor.handle_presence(Presence::Offline).await;
        assert!(!monitor.check_pulse().await);

        assert_eq!(probe.calls(), 0);
        let state = monitor.state();
        assert!(!state.is_online);
        assert!(!state.is_pulse_healthy);
    }

    #[tokio::test]
    async fn test_coming_online_triggers_probe() {
        let (monitor, probe) = monitor_with(ScriptedProbe::default());
        monitor.handle_presence(Presence::Offline).await;

        monitor.handle_presence(Presence::Online).await;

        assert_eq!(probe.calls(), 1);
        let state = monitor.state();
        assert!(state.is_online);
        assert!(state.is_pulse_healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connecting_flag_only_while_probing() {
        let (monitor, _probe) = monitor_with(ScriptedProbe {
            delay: Duration::from_millis(500),
            ..ScriptedProbe::default()
        });
        let mut updates = monitor.subscribe();

        let task = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.check_pulse().await })
        };

        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().is_connecting);

        assert!(task.await.unwrap());
        assert!(!monitor.state().is_connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_probes_every_interval() {
        let (monitor, probe) = monitor_with(ScriptedProbe::default());
        let cancel = CancellationToken::new();
        let handle = monitor.spawn_heartbeat(cancel.clone());

        tokio::time::sleep(Duration::from_millis(59_000)).await;
        assert_eq!(probe.calls(), 0);

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(probe.calls(), 1);

        tokio::time::sleep(Duration::from_millis(60_000)).await;
        assert_eq!(probe.calls(), 2);

        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_millis(120_000)).await;
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_presence_listener_applies_events() {
        let (monitor, probe) = monitor_with(ScriptedProbe::default());
        let (tx, rx) = mpsc::channel(4);
        let handle = monitor.spawn_presence_listener(rx, CancellationToken::new());

        tx.send(Presence::Offline).await.unwrap();
        tx.send(Presence::Online).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(probe.calls(), 1);
        assert!(monitor.state().is_online);
    }

    #[test]
    fn test_state_serializes_for_display() {
        let json = serde_json::to_value(ConnectionState::default()).unwrap();
        assert_eq!(json["is_online"], true);
        assert_eq!(json["last_pulse_at"], serde_json::Value::Null);
    }
}
