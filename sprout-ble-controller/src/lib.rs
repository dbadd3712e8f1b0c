//! Sprout BLE Controller
//!
//! BLE client for discovering Sprout plant monitors in setup mode and
//! handing them WiFi credentials.
//!
//! # Example
//!
//! ```ignore
//! use sprout_ble_controller::{BtleCentral, Provisioning, WifiCredential, discovery};
//! use sprout_proto::{LocalRegistry, PlantProfile, PlantType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let central = BtleCentral::new().await?;
//!
//!     // Scan for monitors
//!     let outcome = discovery::scan(&central, discovery::DEFAULT_SCAN_TIMEOUT)
//!         .await?
//!         .finish()
//!         .await?;
//!     let Some(device) = outcome.devices().first() else {
//!         return Ok(());
//!     };
//!
//!     // Provision the strongest one
//!     let mut setup =
//!         Provisioning::connect(&central, device, sprout_ble_controller::DEFAULT_CONNECT_TIMEOUT)
//!             .await?;
//!     setup.read_device_info().await;
//!     setup
//!         .send_wifi_config(&WifiCredential::new("MySSID", "MyPassword", "me@example.com"))
//!         .await?;
//!     setup
//!         .finalize(PlantProfile::new("Fern", PlantType::Monstera, "Office"), &LocalRegistry)
//!         .await?;
//!     setup.disconnect().await;
//!
//!     Ok(())
//! }
//! ```

pub mod discovery;
pub mod platform;
pub mod provision;
pub mod transport;

#[cfg(test)]
mod fake;

pub use discovery::{
    DiscoveredDevice, DiscoveryError, ScanOutcome, ScanSession, SignalStrength, scan,
};
pub use platform::{BtleCentral, BtleLink, PlatformError};
pub use provision::{
    DEFAULT_CONNECT_TIMEOUT, DeviceRef, ProvisionError, Provisioning, ProvisioningState,
    SetupSummary, WifiCredential,
};
pub use transport::{Advertisement, BleCentral, BleLink, RadioState};
