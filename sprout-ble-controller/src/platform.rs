//! btleplug backed transport
//!
//! Uses the first Bluetooth adapter the OS reports.

use btleplug::api::{
    Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use uuid::Uuid;

use crate::discovery::DiscoveryError;
use crate::transport::{Advertisement, AdvertisementStream, BleCentral, BleLink, RadioState};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("peripheral {0} is no longer known to the adapter")]
    UnknownPeripheral(String),
    #[error("characteristic {0} not found")]
    MissingCharacteristic(Uuid),
    #[error(transparent)]
    Btle(#[from] btleplug::Error),
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, PlatformError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(PlatformError::NoAdapter)
}

/// The host's Bluetooth adapter
#[derive(Debug, Clone)]
pub struct BtleCentral {
    adapter: Adapter,
}

impl BtleCentral {
    /// Open the first adapter. A host without a usable adapter fails with
    /// [`DiscoveryError::AdapterUnavailable`].
    pub async fn new() -> Result<Self, DiscoveryError> {
        let adapter = get_adapter().await.map_err(adapter_error)?;
        Ok(Self { adapter })
    }

    pub fn from_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }
}

/// Sort a failure to open the adapter into the discovery taxonomy
fn adapter_error(e: PlatformError) -> DiscoveryError {
    match e {
        PlatformError::Btle(btleplug::Error::PermissionDenied) => DiscoveryError::PermissionDenied,
        e => {
            tracing::warn!(error = %e, "no usable bluetooth adapter");
            DiscoveryError::AdapterUnavailable
        }
    }
}

/// Some backends cannot tell, so an unknown state counts as powered on and
/// a failed scan start reports the rest
fn radio_from(state: Result<CentralState, btleplug::Error>) -> RadioState {
    match state {
        Ok(CentralState::PoweredOff) => RadioState::PoweredOff,
        Ok(_) => RadioState::PoweredOn,
        Err(e) => {
            tracing::debug!(error = %e, "adapter state unavailable");
            RadioState::Unavailable
        }
    }
}

async fn advertisement(
    adapter: &Adapter,
    id: &PeripheralId,
) -> Result<Option<Advertisement>, btleplug::Error> {
    let peripheral = match adapter.peripheral(id).await {
        Ok(p) => p,
        // gone between the event and the lookup
        Err(btleplug::Error::DeviceNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let props = peripheral.properties().await?;
    Ok(Some(Advertisement {
        hardware_id: peripheral.id().to_string(),
        local_name: props.as_ref().and_then(|p| p.local_name.clone()),
        rssi: props.and_then(|p| p.rssi),
    }))
}

impl BleCentral for BtleCentral {
    type Error = PlatformError;
    type Link = BtleLink;

    async fn radio_state(&self) -> RadioState {
        radio_from(self.adapter.adapter_state().await)
    }

    async fn start_scan(&self) -> Result<AdvertisementStream<PlatformError>, PlatformError> {
        // subscribe before starting so no early advertisement is missed
        let events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let adapter = self.adapter.clone();
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };
                advertisement(&adapter, &id)
                    .await
                    .map_err(PlatformError::from)
                    .transpose()
            }
        });
        Ok(Box::pin(stream))
    }

    async fn stop_scan(&self) -> Result<(), PlatformError> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn link(&self, hardware_id: &str) -> Result<BtleLink, PlatformError> {
        for peripheral in self.adapter.peripherals().await? {
            if peripheral.id().to_string() == hardware_id {
                return Ok(BtleLink { peripheral });
            }
        }
        Err(PlatformError::UnknownPeripheral(hardware_id.to_string()))
    }
}

/// A plant monitor peripheral
#[derive(Debug, Clone)]
pub struct BtleLink {
    peripheral: Peripheral,
}

impl BtleLink {
    fn characteristic(&self, uuid: Uuid) -> Result<btleplug::api::Characteristic, PlatformError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(PlatformError::MissingCharacteristic(uuid))
    }
}

impl BleLink for BtleLink {
    type Error = PlatformError;

    async fn connect(&self) -> Result<(), PlatformError> {
        self.peripheral.connect().await?;
        Ok(())
    }

    async fn discover_services(&self) -> Result<(), PlatformError> {
        self.peripheral.discover_services().await?;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, PlatformError> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, PlatformError> {
        let c = self.characteristic(characteristic)?;
        Ok(self.peripheral.read(&c).await?)
    }

    async fn write(&self, characteristic: Uuid, value: &[u8]) -> Result<(), PlatformError> {
        let c = self.characteristic(characteristic)?;
        self.peripheral
            .write(&c, value, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PlatformError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sprout_proto::ErrorKind;

    use super::*;

    #[test]
    fn radio_state_mapping() {
        assert_eq!(radio_from(Ok(CentralState::PoweredOn)), RadioState::PoweredOn);
        assert_eq!(radio_from(Ok(CentralState::PoweredOff)), RadioState::PoweredOff);
        assert_eq!(radio_from(Ok(CentralState::Unknown)), RadioState::PoweredOn);
        assert_eq!(
            radio_from(Err(btleplug::Error::RuntimeError("bluetoothd gone".into()))),
            RadioState::Unavailable
        );
    }

    #[test]
    fn missing_adapter_is_adapter_unavailable() {
        let err = adapter_error(PlatformError::NoAdapter);
        assert!(matches!(err, DiscoveryError::AdapterUnavailable));
        assert_eq!(err.kind(), ErrorKind::AdapterUnavailable);
        assert_eq!(err.user_message(), "Please turn on Bluetooth to scan for devices.");

        let err = adapter_error(PlatformError::Btle(btleplug::Error::NotSupported(
            "no bluez".into(),
        )));
        assert_eq!(err.kind(), ErrorKind::AdapterUnavailable);
    }

    #[test]
    fn adapter_permission_denied() {
        let err = adapter_error(PlatformError::Btle(btleplug::Error::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
}
