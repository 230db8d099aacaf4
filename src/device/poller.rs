use std::future::Future;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::config::SettingsStore;
use crate::serial::protocol::{unix_seconds, StatusCode};
use crate::serial::{BeaconSession, Result, SerialError};
use super::{SessionState, NO_CONNECTION};

/// Delay between the end of one tick and the start of the next
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Delay before the first status poll after startup
pub const INITIAL_POLL_DELAY: Duration = Duration::from_secs(2);
/// Clock skew tolerated before the beacon clock is reset
pub const CLOCK_SKEW_LIMIT_SECS: u64 = 10;

/// Run one poll tick and return the next state.
///
/// While disconnected this resolves `address` and tries to open it. While connected it reads
/// the beacon clock (resetting it when it drifted too far), reads the status
/// and, on the first tick after connecting, the hardware id, band and
/// interval. Any failed query drops the session back to disconnected.
pub async fn poll_once(
    mut state: SessionState,
    session: &mut BeaconSession,
    address: impl FnOnce() -> String,
    now: DateTime<Utc>,
) -> SessionState {
    state.pc_time = Some(now);

    if !state.is_connected() {
        state.mark_disconnected();
        let address = address();
        match session.connect(&address) {
            Ok(()) => {
                log::info!("Connected to beacon on {}", address);
                state.mark_connected();
            }
            Err(e) => log::debug!("Beacon connect failed: {}", e),
        }
        return state;
    }

    match refresh(&mut state, session, now).await {
        Ok(()) => state.alert = false,
        Err(e) => {
            log::warn!("Lost contact with beacon: {}", e);
            session.close();
            state.mark_disconnected();
        }
    }
    state
}

async fn refresh(state: &mut SessionState, session: &mut BeaconSession, now: DateTime<Utc>) -> Result<()> {
    let beacon_seconds = session.query_time().await?;
    let local_seconds = unix_seconds(now);
    let beacon_time = DateTime::from_timestamp(beacon_seconds, 0)
        .ok_or_else(|| SerialError::ProtocolError(format!("Beacon time out of range: {}", beacon_seconds)))?;
    let skew = local_seconds
        .checked_sub(beacon_seconds)
        .ok_or_else(|| SerialError::ProtocolError(format!("Beacon time out of range: {}", beacon_seconds)))?;

    state.beacon_time = Some(beacon_time);
    state.clock_skew_secs = Some(skew);

    if skew.unsigned_abs() > CLOCK_SKEW_LIMIT_SECS {
        log::info!("Beacon clock off by {}s, resynchronising", skew);
        session.set_time(now).await?;
        state.last_time_sync = Some(now);
    }

    let status = session.query_status().await?;

    if !state.seeded {
        let hardware = session.query_hardware().await?;
        log::info!("Beacon hardware: {}", hardware.description());
        state.hardware = Some(hardware);
        state.band = Some(status.band);
        state.interval = Some(status.interval);
        state.seeded = true;
    }

    state.status_text = status.code.display_text();
    state.progress = progress(&status.code, status.interval, now.timestamp());
    state.status = Some(status.code);
    Ok(())
}

/// Position of the slot progress bar
///
/// Counts down to the next slot while waiting and up through the
/// transmission while on air.
pub fn progress(code: &StatusCode, interval: u32, now_secs: i64) -> Option<u32> {
    if interval == 0 {
        return None;
    }
    let period = i64::from(interval) * 60;
    let into_period = now_secs.rem_euclid(period);

    match code {
        StatusCode::WaitingForSlot => {
            let remaining = period - into_period;
            u32::try_from(remaining * 2 / i64::from(interval)).ok()
        }
        StatusCode::OnAir => u32::try_from(into_period).ok(),
        _ => None,
    }
}

/// Drives [`poll_once`] on a fixed delay and publishes every new state
pub struct Poller {
    session: BeaconSession,
    store: SettingsStore,
    address_override: Option<String>,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
}

impl Poller {
    pub fn new(session: BeaconSession, store: SettingsStore) -> Self {
        let state = SessionState {
            status_text: NO_CONNECTION.to_string(),
            ..SessionState::default()
        };
        let (state_tx, _state_rx) = watch::channel(state.clone());
        Self {
            session,
            store,
            address_override: None,
            state,
            state_tx,
        }
    }

    /// Use `address` instead of the stored serial device
    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address_override = address;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_mut(&mut self) -> &mut BeaconSession {
        &mut self.session
    }

    /// One tick against the wall clock
    pub async fn tick(&mut self) -> &SessionState {
        self.tick_at(Utc::now()).await
    }

    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> &SessionState {
        let address_override = &self.address_override;
        let store = &self.store;
        let state = std::mem::take(&mut self.state);
        self.state = poll_once(
            state,
            &mut self.session,
            || resolve_address(address_override.as_deref(), store),
            now,
        )
        .await;
        self.state_tx.send_replace(self.state.clone());
        &self.state
    }

    /// Poll until `shutdown` resolves
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.tick().await;
        let mut delay = INITIAL_POLL_DELAY;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {
                    self.tick().await;
                    delay = POLL_INTERVAL;
                }
            }
        }

        self.session.close();
        log::info!("Poller stopped");
    }
}

fn resolve_address(address_override: Option<&str>, store: &SettingsStore) -> String {
    if let Some(address) = address_override {
        return address.to_string();
    }
    store.get().unwrap_or_else(|e| {
        log::warn!("Could not read serial device from {}: {}", store.path().display(), e);
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_waiting_counts_down() {
        // 30s into a 4 minute period: 210s left, scaled by interval/2
        let now = 1_700_000_040 - (1_700_000_040 % 240) + 30;
        assert_eq!(progress(&StatusCode::WaitingForSlot, 4, now), Some(105));
    }

    #[test]
    fn test_progress_on_air_counts_up() {
        let now = 1_700_000_040 - (1_700_000_040 % 120) + 75;
        assert_eq!(progress(&StatusCode::OnAir, 2, now), Some(75));
    }

    #[test]
    fn test_progress_other_states() {
        assert_eq!(progress(&StatusCode::Disabled, 4, 1_700_000_000), None);
        assert_eq!(progress(&StatusCode::OnAir, 0, 1_700_000_000), None);
    }
}
