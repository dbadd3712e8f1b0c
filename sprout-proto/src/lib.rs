//! Sprout protocol types shared by the BLE controller, the API client and
//! front-ends: characteristic UUIDs, the payload codec, the plant catalog,
//! form validation and the error taxonomy.

pub mod ble;
pub mod codec;
mod device;
mod error;
mod plant;
pub mod validation;

pub use codec::CodecError;
pub use device::{DeviceInfo, DeviceStatus, WifiConfigPayload, WifiLinkStatus};
pub use error::ErrorKind;
pub use plant::{
    DEFAULT_LOCATION, LOCATION_SUGGESTIONS, LocalRegistry, PlantProfile, PlantRegistry, PlantType,
    UnknownPlantType, WaterNeeds,
};
pub use validation::{Field, FieldError, ValidationError};
