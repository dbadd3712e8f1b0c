//! Pairing a discovered plant monitor
//!
//! The flow is linear:
//!
//! ```text
//! Discovered -> Connecting -> Connected -> ReadingInfo -> AwaitingWifiInput
//!   -> SendingWifiConfig -> WifiConfigured -> AwaitingPlantInput
//!   -> Finalizing -> Complete
//! ```
//!
//! A [`Provisioning`] owns the link to the monitor for its whole lifetime.
//! Every step takes `&mut self`, so only one step runs at a time. A failed
//! step leaves the workflow where it was; nothing is retried.

use std::time::Duration;

use sprout_proto::{
    DeviceInfo, DeviceStatus, ErrorKind, PlantProfile, PlantRegistry, ValidationError,
    WifiConfigPayload, ble, codec, validation,
};

use crate::discovery::DiscoveredDevice;
use crate::transport::{BleCentral, BleLink, BoxError};

/// Upper bound for connect plus service discovery
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    Discovered,
    Connecting,
    Connected,
    ReadingInfo,
    AwaitingWifiInput,
    SendingWifiConfig,
    WifiConfigured,
    AwaitingPlantInput,
    Finalizing,
    Complete,
}

/// WiFi network the monitor should join, plus the account it belongs to.
/// Lives only for one provisioning attempt.
#[derive(Clone)]
pub struct WifiCredential {
    pub ssid: String,
    pub password: String,
    pub account_email: String,
}

impl WifiCredential {
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
        account_email: impl Into<String>,
    ) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            account_email: account_email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_wifi(&self.ssid, &self.password)
    }

    fn payload(&self) -> WifiConfigPayload {
        WifiConfigPayload {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            email: self.account_email.clone(),
        }
    }
}

impl std::fmt::Debug for WifiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiCredential")
            .field("ssid", &self.ssid)
            .field("password", &"********")
            .field("account_email", &self.account_email)
            .finish()
    }
}

/// Identity of the paired monitor as shown on the summary screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub hardware_id: String,
    pub short_id: String,
    pub advertised_name: String,
}

impl From<&DiscoveredDevice> for DeviceRef {
    fn from(d: &DiscoveredDevice) -> Self {
        Self {
            hardware_id: d.hardware_id.clone(),
            short_id: d.short_id.clone(),
            advertised_name: d.advertised_name.clone(),
        }
    }
}

/// Everything the "setup complete" view needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSummary {
    pub device: DeviceRef,
    pub plant: PlantProfile,
    pub wifi_ssid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to connect to {device}: {source}")]
    ConnectionFailed {
        device: String,
        #[source]
        source: BoxError,
    },
    #[error("connecting to {device} timed out after {after:?}")]
    ConnectTimeout { device: String, after: Duration },
    #[error("device is no longer connected")]
    DeviceNotConnected,
    #[error("failed to write WiFi configuration: {0}")]
    ConfigWriteFailed(#[source] BoxError),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("cannot {step} while {state:?}")]
    InvalidState {
        step: &'static str,
        state: ProvisioningState,
    },
    #[error("failed to save plant details: {0}")]
    FinalizeFailed(#[source] BoxError),
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::ConnectionFailed { .. } | ProvisionError::ConnectTimeout { .. } => {
                ErrorKind::ConnectionFailed
            }
            ProvisionError::DeviceNotConnected => ErrorKind::DeviceNotConnected,
            ProvisionError::ConfigWriteFailed(_) => ErrorKind::ConfigWriteFailed,
            ProvisionError::Validation(_) => ErrorKind::ValidationError,
            ProvisionError::InvalidState { .. } => ErrorKind::InvalidState,
            ProvisionError::FinalizeFailed(_) => ErrorKind::FinalizeFailed,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ProvisionError::ConnectionFailed { .. } | ProvisionError::ConnectTimeout { .. } => {
                "Could not connect to the device. Please try again.".to_string()
            }
            ProvisionError::DeviceNotConnected => {
                "The device appears to be disconnected. Please go back and reconnect.".to_string()
            }
            ProvisionError::ConfigWriteFailed(_) => "Could not send data to the device. Please \
                make sure the device is still in setup mode and try again."
                .to_string(),
            ProvisionError::Validation(e) => e
                .errors()
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| e.to_string()),
            ProvisionError::InvalidState { .. } => {
                "This step is not available right now. Please go back and try again.".to_string()
            }
            ProvisionError::FinalizeFailed(_) => {
                "Failed to save your plant details. Please try again.".to_string()
            }
        }
    }
}

/// One pairing attempt, from an open link to a finished setup
pub struct Provisioning<L: BleLink> {
    link: L,
    device: DeviceRef,
    state: ProvisioningState,
    device_info: Option<DeviceInfo>,
    wifi_ssid: Option<String>,
    summary: Option<SetupSummary>,
    /// whether we still hold an open link that needs releasing
    linked: bool,
}

impl<L: BleLink> Provisioning<L> {
    /// Connect to a device found by discovery and discover its services.
    ///
    /// On failure the caller goes back to discovery; nothing is retried.
    pub async fn connect<C>(
        central: &C,
        device: &DiscoveredDevice,
        timeout: Duration,
    ) -> Result<Self, ProvisionError>
    where
        C: BleCentral<Link = L>,
    {
        let device_ref = DeviceRef::from(device);
        tracing::info!(
            hardware_id = %device.hardware_id,
            name = %device.advertised_name,
            "connecting"
        );

        let link = central
            .link(&device.hardware_id)
            .await
            .map_err(|e| ProvisionError::ConnectionFailed {
                device: device.advertised_name.clone(),
                source: Box::new(e),
            })?;

        let attempt = async {
            link.connect().await?;
            link.discover_services().await
        };

        let failure = match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(ProvisionError::ConnectionFailed {
                device: device.advertised_name.clone(),
                source: Box::new(e),
            }),
            Err(_elapsed) => Some(ProvisionError::ConnectTimeout {
                device: device.advertised_name.clone(),
                after: timeout,
            }),
        };

        if let Some(err) = failure {
            tracing::warn!(error = %err, "connect failed");
            if let Err(e) = link.disconnect().await {
                tracing::debug!(error = %e, "disconnect after failed connect");
            }
            return Err(err);
        }

        tracing::info!(hardware_id = %device.hardware_id, "connected");

        Ok(Self {
            link,
            device: device_ref,
            state: ProvisioningState::Connected,
            device_info: None,
            wifi_ssid: None,
            summary: None,
            linked: true,
        })
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    /// Last status read from the monitor, if any
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn summary(&self) -> Option<&SetupSummary> {
        self.summary.as_ref()
    }

    /// Read the monitor's status. Best-effort: never fails, falls back to
    /// [`DeviceInfo::ReadyForConfiguration`] and logs why.
    pub async fn read_device_info(&mut self) -> DeviceInfo {
        let entered_from_connected = self.state == ProvisioningState::Connected;
        if entered_from_connected {
            self.state = ProvisioningState::ReadingInfo;
        }

        let info = match self.read_status().await {
            Ok(status) => {
                tracing::debug!(?status, "device info read");
                DeviceInfo::Reported(status)
            }
            Err(e) => {
                tracing::warn!(error = %e, "device info unavailable, assuming ready for configuration");
                DeviceInfo::ReadyForConfiguration
            }
        };

        if entered_from_connected {
            self.state = ProvisioningState::AwaitingWifiInput;
        }
        self.device_info = Some(info.clone());
        info
    }

    async fn read_status(&self) -> Result<DeviceStatus, BoxError> {
        let raw = self.link.read(ble::DEVICE_INFO_UUID).await?;
        Ok(codec::decode(&raw)?)
    }

    /// Validate the credential, make sure the link is still up, then write
    /// the encoded configuration with response.
    pub async fn send_wifi_config(
        &mut self,
        credential: &WifiCredential,
    ) -> Result<(), ProvisionError> {
        let prior = self.state;
        match prior {
            ProvisioningState::Connected
            | ProvisioningState::AwaitingWifiInput
            | ProvisioningState::WifiConfigured => {}
            state => {
                return Err(ProvisionError::InvalidState {
                    step: "send WiFi configuration",
                    state,
                });
            }
        }

        credential.validate()?;

        self.state = ProvisioningState::SendingWifiConfig;
        match self.write_wifi_config(credential).await {
            Ok(()) => {
                tracing::info!(ssid = %credential.ssid, "WiFi configuration sent");
                self.wifi_ssid = Some(credential.ssid.clone());
                self.state = ProvisioningState::WifiConfigured;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "WiFi configuration not sent");
                if matches!(e, ProvisionError::DeviceNotConnected) {
                    self.linked = false;
                }
                self.state = prior;
                Err(e)
            }
        }
    }

    async fn write_wifi_config(&self, credential: &WifiCredential) -> Result<(), ProvisionError> {
        match self.link.is_connected().await {
            Ok(true) => {}
            Ok(false) => return Err(ProvisionError::DeviceNotConnected),
            Err(e) => {
                tracing::debug!(error = %e, "liveness check failed");
                return Err(ProvisionError::DeviceNotConnected);
            }
        }

        let value = codec::encode(&credential.payload())
            .map_err(|e| ProvisionError::ConfigWriteFailed(Box::new(e)))?;

        self.link
            .write(ble::WIFI_CONFIG_UUID, &value)
            .await
            .map_err(|e| ProvisionError::ConfigWriteFailed(Box::new(e)))
    }

    /// The user moved on to the plant details form
    pub fn begin_plant_details(&mut self) -> Result<(), ProvisionError> {
        match self.state {
            ProvisioningState::WifiConfigured | ProvisioningState::AwaitingPlantInput => {
                self.state = ProvisioningState::AwaitingPlantInput;
                Ok(())
            }
            state => Err(ProvisionError::InvalidState {
                step: "enter plant details",
                state,
            }),
        }
    }

    /// Attach the plant to the monitor and record it with `registry`.
    ///
    /// The registry's error is propagated; the workflow then stays on the
    /// plant details step.
    pub async fn finalize<R: PlantRegistry>(
        &mut self,
        profile: PlantProfile,
        registry: &R,
    ) -> Result<SetupSummary, ProvisionError> {
        let prior = self.state;
        let wifi_ssid = match (prior, &self.wifi_ssid) {
            (
                ProvisioningState::WifiConfigured | ProvisioningState::AwaitingPlantInput,
                Some(ssid),
            ) => ssid.clone(),
            (state, _) => {
                return Err(ProvisionError::InvalidState {
                    step: "finalize setup",
                    state,
                });
            }
        };

        profile.validate()?;

        self.state = ProvisioningState::Finalizing;
        if let Err(e) = registry
            .register_plant(&self.device.short_id, &profile)
            .await
        {
            tracing::warn!(error = %e, "plant registration failed");
            self.state = prior;
            return Err(ProvisionError::FinalizeFailed(Box::new(e)));
        }

        let summary = SetupSummary {
            device: self.device.clone(),
            plant: profile,
            wifi_ssid,
        };
        tracing::info!(
            device = %summary.device.short_id,
            plant = %summary.plant.display_name,
            "setup complete"
        );
        self.state = ProvisioningState::Complete;
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    /// Run `steps`, then release the link whether they succeeded or not
    pub async fn run_then_disconnect<T, E>(
        mut self,
        steps: impl AsyncFnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let result = steps(&mut self).await;
        self.disconnect().await;
        result
    }

    /// Release the link. The workflow state is kept for display.
    pub async fn disconnect(&mut self) {
        if !self.linked {
            return;
        }
        self.linked = false;
        if let Err(e) = self.link.disconnect().await {
            tracing::debug!(error = %e, "disconnect failed");
        }
    }
}

impl<L: BleLink> Drop for Provisioning<L> {
    fn drop(&mut self) {
        if !self.linked {
            return;
        }
        let link = self.link.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = link.disconnect().await {
                    tracing::debug!(error = %e, "disconnect of abandoned link failed");
                }
            });
        }
    }
}
