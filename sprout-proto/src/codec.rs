//! Characteristic payload codec
//!
//! Every JSON value exchanged over a plant monitor characteristic travels as
//! base64(UTF-8(JSON)). This is the only place that knows about that layering.

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] data_encoding::DecodeError),
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("payload is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("payload is empty")]
    Empty,
}

/// Encode a value into the bytes written to a characteristic
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let json = serde_json::to_string(value).map_err(CodecError::Serialize)?;
    Ok(data_encoding::BASE64.encode(json.as_bytes()).into_bytes())
}

/// Decode the bytes read from a characteristic.
///
/// Peripherals pad fixed-size attribute values with NULs and some firmware
/// appends a newline, so both are stripped before base64 decoding.
pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, CodecError> {
    let end = raw
        .iter()
        .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    let start = raw[..end]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(end);
    let trimmed = &raw[start..end];

    if trimmed.is_empty() {
        return Err(CodecError::Empty);
    }

    let bytes = data_encoding::BASE64.decode(trimmed)?;
    let text = String::from_utf8(bytes)?;
    serde_json::from_str(&text).map_err(CodecError::Json)
}

#[cfg(test)]
mod tests {
    use crate::{DeviceStatus, WifiConfigPayload};

    #[test]
    fn wifi_config_survives_peripheral_decode() {
        let sent = WifiConfigPayload {
            ssid: "Home Network ☘".to_string(),
            password: "pa\"ss word1".to_string(),
            email: "u@e.com".to_string(),
        };
        let wire = super::encode(&sent).unwrap();

        // what the monitor firmware does with the written value
        let json = data_encoding::BASE64.decode(&wire).unwrap();
        let received: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(received["ssid"], "Home Network ☘");
        assert_eq!(received["password"], "pa\"ss word1");
        assert_eq!(received["email"], "u@e.com");

        let decoded: WifiConfigPayload = super::decode(&wire).unwrap();
        assert_eq!(decoded, sent);
    }

    #[test]
    fn wire_is_plain_base64_json() {
        let payload = WifiConfigPayload {
            ssid: "home".to_string(),
            password: "password1".to_string(),
            email: "u@e.com".to_string(),
        };
        let wire = super::encode(&payload).unwrap();
        assert_eq!(
            String::from_utf8(wire).unwrap(),
            data_encoding::BASE64
                .encode(br#"{"ssid":"home","password":"password1","email":"u@e.com"}"#)
        );
    }

    #[test]
    fn device_status_with_padding() {
        let json = r#"{"state":"setup","wifiStatus":{"connected":true,"ssid":"home"}}"#;
        let mut raw = data_encoding::BASE64.encode(json.as_bytes()).into_bytes();
        raw.extend_from_slice(b"\n\0\0\0");

        let status: DeviceStatus = super::decode(&raw).unwrap();
        assert_eq!(status.state.as_deref(), Some("setup"));
        let wifi = status.wifi_status.unwrap();
        assert!(wifi.connected);
        assert_eq!(wifi.ssid.as_deref(), Some("home"));
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            super::decode::<DeviceStatus>(b"\0\0"),
            Err(super::CodecError::Empty)
        ));
        assert!(matches!(
            super::decode::<DeviceStatus>(b"not base64!"),
            Err(super::CodecError::Base64(_))
        ));
        let not_utf8 = data_encoding::BASE64.encode(&[0xff, 0xfe, 0xfd]);
        assert!(matches!(
            super::decode::<DeviceStatus>(not_utf8.as_bytes()),
            Err(super::CodecError::Utf8(_))
        ));
        let not_json = data_encoding::BASE64.encode(b"{state:");
        assert!(matches!(
            super::decode::<DeviceStatus>(not_json.as_bytes()),
            Err(super::CodecError::Json(_))
        ));
    }
}
