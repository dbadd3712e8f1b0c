//! BLE transport traits
//!
//! Discovery and provisioning are written against these traits. The
//! btleplug implementation lives in [`crate::platform`]; tests drive the
//! workflows with in-memory fakes.

use std::pin::Pin;

use futures::Stream;
use uuid::Uuid;

/// Boxed error used where a transport error is carried as a source
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One advertisement (or advertisement update) seen while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Transport-assigned identifier, stable for the scan session
    pub hardware_id: String,
    pub local_name: Option<String>,
    pub rssi: Option<i16>,
}

/// Advertisements in arrival order. An `Err` item is a radio/transport
/// failure and ends the scan.
pub type AdvertisementStream<E> = Pin<Box<dyn Stream<Item = Result<Advertisement, E>> + Send>>;

/// Power state of the local radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    PoweredOn,
    PoweredOff,
    Unavailable,
}

/// The local BLE adapter in its central role
pub trait BleCentral: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type Link: BleLink;

    /// Ask the platform for scan/connect permissions (location, bluetooth).
    ///
    /// Desktop stacks have no runtime permission model, hence the default.
    fn request_permissions(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }

    fn radio_state(&self) -> impl Future<Output = RadioState> + Send;

    /// Start scanning and return the advertisement feed
    fn start_scan(
        &self,
    ) -> impl Future<Output = Result<AdvertisementStream<Self::Error>, Self::Error>> + Send;

    fn stop_scan(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Resolve a peripheral seen during a scan into a link that can connect
    fn link(
        &self,
        hardware_id: &str,
    ) -> impl Future<Output = Result<Self::Link, Self::Error>> + Send;
}

/// A link to one peripheral, exclusively owned by a provisioning workflow
pub trait BleLink: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn connect(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Service and characteristic discovery, required before read/write
    fn discover_services(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn is_connected(&self) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn read(&self, characteristic: Uuid)
    -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send;

    /// Write with response: resolves once the peripheral acknowledged
    fn write(
        &self,
        characteristic: Uuid,
        value: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
