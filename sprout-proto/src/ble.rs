//! BLE GATT Service Protocol Constants for Sprout Plant Monitors
//!
//! This module defines the BLE service and characteristic UUIDs used for
//! WiFi provisioning, and the advertised-name convention of the monitors.

use uuid::Uuid;

/// BLE Service UUID: 4fafc201-1fb5-459e-8fcc-c5c9c331914b
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// Device Info Characteristic UUID (read)
///
/// Value is base64(UTF-8(JSON)) of [`crate::DeviceStatus`].
pub const DEVICE_INFO_UUID: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// WiFi Config Characteristic UUID (write with response)
///
/// Accepts base64(UTF-8(JSON)) of [`crate::WifiConfigPayload`].
pub const WIFI_CONFIG_UUID: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a9);

/// Every plant monitor in setup mode advertises as `PlantMonitor-<id>`
pub const NAME_PREFIX: &str = "PlantMonitor-";

/// Short id shown for monitors whose name carries no suffix
pub const UNKNOWN_SHORT_ID: &str = "Unknown";

/// Is this advertised name a plant monitor?
pub fn is_plant_monitor(name: &str) -> bool {
    name.starts_with(NAME_PREFIX)
}

/// Parse the short id out of an advertised name.
///
/// `PlantMonitor-A1B2` gives `A1B2`; anything after a second `-` is dropped.
pub fn short_id(name: &str) -> &str {
    match name.split('-').nth(1) {
        Some(id) if !id.is_empty() => id,
        _ => UNKNOWN_SHORT_ID,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn short_id() {
        assert_eq!(super::short_id("PlantMonitor-A1B2"), "A1B2");
        assert_eq!(super::short_id("PlantMonitor-A1B2-rev2"), "A1B2");
        assert_eq!(super::short_id("PlantMonitor-"), "Unknown");
        assert_eq!(super::short_id("PlantMonitor"), "Unknown");
    }

    #[test]
    fn prefix_match() {
        assert!(super::is_plant_monitor("PlantMonitor-01"));
        assert!(!super::is_plant_monitor("plantmonitor-01"));
        assert!(!super::is_plant_monitor("Speaker-01"));
        assert!(!super::is_plant_monitor("My PlantMonitor-01"));
    }
}
