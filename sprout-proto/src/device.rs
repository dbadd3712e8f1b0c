//! Payloads carried by the plant monitor characteristics

use serde::{Deserialize, Serialize};

/// Status snapshot published on the device-info characteristic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "wifiStatus", default, skip_serializing_if = "Option::is_none")]
    pub wifi_status: Option<WifiLinkStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiLinkStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
}

/// Value written to the WiFi-config characteristic
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfigPayload {
    pub ssid: String,
    pub password: String,
    pub email: String,
}

impl std::fmt::Debug for WifiConfigPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiConfigPayload")
            .field("ssid", &self.ssid)
            .field("password", &"********")
            .field("email", &self.email)
            .finish()
    }
}

/// What the pairing flow knows about a connected monitor.
///
/// Reading device info is best-effort: when it fails the flow carries on
/// with `ReadyForConfiguration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInfo {
    Reported(DeviceStatus),
    ReadyForConfiguration,
}

impl DeviceInfo {
    /// Human readable status lines, one per line of the status panel
    pub fn status_lines(&self) -> Vec<String> {
        match self {
            DeviceInfo::ReadyForConfiguration => {
                vec!["Device is ready for configuration".to_string()]
            }
            DeviceInfo::Reported(status) => {
                let mut lines = vec![format!(
                    "State: {}",
                    status.state.as_deref().unwrap_or("Unknown")
                )];
                if let Some(wifi) = &status.wifi_status {
                    lines.push(match (wifi.connected, wifi.ssid.as_deref()) {
                        (true, Some(ssid)) => format!("WiFi: Connected to {ssid}"),
                        (true, None) => "WiFi: Connected".to_string(),
                        (false, _) => "WiFi: Not connected".to_string(),
                    });
                }
                lines
            }
        }
    }
}
