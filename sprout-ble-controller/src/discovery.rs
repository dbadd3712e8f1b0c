//! Finding plant monitors in setup mode
//!
//! A scan is a [`ScanSession`]: it hands out devices as their advertisements
//! arrive and ends on its own once the timeout passes. Devices are keyed by
//! the transport hardware id, never by the short id parsed from the name.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use sprout_proto::{ErrorKind, ble};
use tokio::time::Instant;

use crate::transport::{AdvertisementStream, BleCentral, BoxError, RadioState};

/// Scan length used by the pairing flow
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Reading assumed for advertisements that carry no RSSI
pub const DEFAULT_RSSI: i16 = -80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalStrength {
    Weak,
    Fair,
    Good,
    Strong,
    Excellent,
}

impl SignalStrength {
    pub fn from_rssi(rssi: i16) -> Self {
        match rssi {
            r if r >= -50 => SignalStrength::Excellent,
            r if r >= -60 => SignalStrength::Strong,
            r if r >= -70 => SignalStrength::Good,
            r if r >= -80 => SignalStrength::Fair,
            _ => SignalStrength::Weak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalStrength::Excellent => "Excellent",
            SignalStrength::Strong => "Strong",
            SignalStrength::Good => "Good",
            SignalStrength::Fair => "Fair",
            SignalStrength::Weak => "Weak",
        }
    }
}

impl std::fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A plant monitor seen during a scan. Holds no transport handle; the
/// hardware id is enough to open a link later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub hardware_id: String,
    /// Parsed from the advertised name, for display only: not unique
    pub short_id: String,
    pub advertised_name: String,
    pub rssi: i16,
    pub signal_strength: SignalStrength,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("bluetooth permissions were not granted")]
    PermissionDenied,
    #[error("bluetooth adapter is unavailable or powered off")]
    AdapterUnavailable,
    #[error("scan failed: {0}")]
    ScanError(#[source] BoxError),
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::PermissionDenied => ErrorKind::PermissionDenied,
            DiscoveryError::AdapterUnavailable => ErrorKind::AdapterUnavailable,
            DiscoveryError::ScanError(_) => ErrorKind::ScanError,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            DiscoveryError::PermissionDenied => {
                "Please grant the required permissions to scan for Bluetooth devices."
            }
            DiscoveryError::AdapterUnavailable => "Please turn on Bluetooth to scan for devices.",
            DiscoveryError::ScanError(_) => "An error occurred while scanning for devices.",
        }
    }
}

/// How a completed scan ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Strongest signal first
    Found(Vec<DiscoveredDevice>),
    NoDevicesFound,
}

impl ScanOutcome {
    pub fn devices(&self) -> &[DiscoveredDevice] {
        match self {
            ScanOutcome::Found(devices) => devices,
            ScanOutcome::NoDevicesFound => &[],
        }
    }

    pub const NO_DEVICES_HINT: &'static str =
        "Make sure your Plant Monitor device is in setup mode and Bluetooth is enabled.";
}

/// Start a scan that ends after `timeout`.
///
/// Fails before touching the radio when permissions are missing or the
/// adapter is off.
pub async fn scan<C: BleCentral>(
    central: &C,
    timeout: Duration,
) -> Result<ScanSession<C>, DiscoveryError> {
    if !central.request_permissions().await {
        return Err(DiscoveryError::PermissionDenied);
    }

    match central.radio_state().await {
        RadioState::PoweredOn => {}
        state => {
            tracing::warn!(?state, "bluetooth radio not ready");
            return Err(DiscoveryError::AdapterUnavailable);
        }
    }

    let events = central
        .start_scan()
        .await
        .map_err(|e| DiscoveryError::ScanError(Box::new(e)))?;

    tracing::info!(timeout_ms = timeout.as_millis() as u64, "scan started");

    Ok(ScanSession {
        central: central.clone(),
        events: Some(events),
        deadline: Instant::now() + timeout,
        devices: HashMap::new(),
    })
}

/// An in-flight scan. Not restartable: call [`scan`] again for a new one.
pub struct ScanSession<C: BleCentral> {
    central: C,
    /// `None` once the scan has stopped, for whatever reason
    events: Option<AdvertisementStream<C::Error>>,
    deadline: Instant,
    devices: HashMap<String, DiscoveredDevice>,
}

impl<C: BleCentral> ScanSession<C> {
    /// Next accepted advertisement, or `None` once the scan is over.
    ///
    /// A device that advertises again is yielded again with its refreshed
    /// reading; [`ScanSession::devices`] holds one entry per hardware id.
    pub async fn next(&mut self) -> Result<Option<DiscoveredDevice>, DiscoveryError> {
        loop {
            if Instant::now() >= self.deadline {
                self.stop().await;
                return Ok(None);
            }

            let Some(events) = self.events.as_mut() else {
                return Ok(None);
            };

            match tokio::time::timeout_at(self.deadline, events.next()).await {
                Err(_elapsed) => {
                    self.stop().await;
                    return Ok(None);
                }
                Ok(None) => {
                    tracing::debug!("advertisement feed closed before the timeout");
                    self.stop().await;
                    return Ok(None);
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "scan aborted");
                    self.stop().await;
                    return Err(DiscoveryError::ScanError(Box::new(e)));
                }
                Ok(Some(Ok(adv))) => {
                    let Some(name) = adv.local_name.filter(|n| ble::is_plant_monitor(n)) else {
                        continue;
                    };
                    let rssi = adv.rssi.unwrap_or(DEFAULT_RSSI);
                    let device = DiscoveredDevice {
                        short_id: ble::short_id(&name).to_string(),
                        advertised_name: name,
                        hardware_id: adv.hardware_id,
                        rssi,
                        signal_strength: SignalStrength::from_rssi(rssi),
                    };
                    tracing::debug!(
                        hardware_id = %device.hardware_id,
                        name = %device.advertised_name,
                        rssi,
                        "plant monitor advertised"
                    );
                    self.devices
                        .insert(device.hardware_id.clone(), device.clone());
                    return Ok(Some(device));
                }
            }
        }
    }

    /// Run the scan to its end
    pub async fn finish(mut self) -> Result<ScanOutcome, DiscoveryError> {
        while self.next().await?.is_some() {}
        Ok(self.outcome())
    }

    /// Devices seen so far, strongest signal first
    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        let mut devices: Vec<_> = self.devices.values().cloned().collect();
        devices.sort_by(|a, b| {
            b.rssi
                .cmp(&a.rssi)
                .then_with(|| a.advertised_name.cmp(&b.advertised_name))
                .then_with(|| a.hardware_id.cmp(&b.hardware_id))
        });
        devices
    }

    pub fn outcome(&self) -> ScanOutcome {
        if self.devices.is_empty() {
            ScanOutcome::NoDevicesFound
        } else {
            ScanOutcome::Found(self.devices())
        }
    }

    pub fn is_finished(&self) -> bool {
        self.events.is_none()
    }

    /// Stop scanning now. Safe to call more than once.
    pub async fn stop(&mut self) {
        if self.events.take().is_none() {
            return;
        }
        if let Err(e) = self.central.stop_scan().await {
            tracing::warn!(error = %e, "failed to stop scan");
        }
        tracing::info!(found = self.devices.len(), "scan stopped");
    }
}

impl<C: BleCentral> Drop for ScanSession<C> {
    fn drop(&mut self) {
        if self.events.take().is_none() {
            return;
        }
        // abandoned mid-scan; release the radio if a runtime is around
        let central = self.central.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = central.stop_scan().await {
                        tracing::warn!(error = %e, "failed to stop abandoned scan");
                    }
                });
            }
            Err(_) => tracing::warn!("scan abandoned outside a runtime, not stopped"),
        }
    }
}
