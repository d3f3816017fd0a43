//! # Polling Frames
//!
//! Radio observations delivered while the field is on, before any reader
//! selects an application.

use serde::{Deserialize, Serialize};

/// Kind of a polling-loop observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollingFrameType {
    FieldOn,
    FieldOff,
    NfcA,
    NfcB,
    NfcF,
    /// Custom or unrecognized frame. Only these carry filterable payloads.
    Unknown,
}

impl PollingFrameType {
    /// Single-byte wire code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::FieldOn => b'O',
            Self::FieldOff => b'X',
            Self::NfcA => b'A',
            Self::NfcB => b'B',
            Self::NfcF => b'F',
            Self::Unknown => b'U',
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            b'O' => Self::FieldOn,
            b'X' => Self::FieldOff,
            b'A' => Self::NfcA,
            b'B' => Self::NfcB,
            b'F' => Self::NfcF,
            _ => Self::Unknown,
        }
    }
}

/// Gain value reported when the radio did not measure one.
pub const GAIN_UNKNOWN: i8 = -1;

/// One polling-loop observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingFrame {
    pub frame_type: PollingFrameType,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub gain: i8,
    /// Microseconds, radio clock.
    pub timestamp_us: u64,
    /// Set by the dispatcher when this frame made it leave observe mode.
    #[serde(default)]
    pub triggered_autotransact: bool,
}

impl PollingFrame {
    pub fn new(frame_type: PollingFrameType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            frame_type,
            data: data.into(),
            gain: GAIN_UNKNOWN,
            timestamp_us: 0,
            triggered_autotransact: false,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    #[must_use]
    pub fn with_gain(mut self, gain: i8) -> Self {
        self.gain = gain;
        self
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Uppercase hex of the payload, the key used for filter matching.
    #[must_use]
    pub fn data_hex(&self) -> String {
        hex::encode_upper(&self.data)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_hex_is_uppercase() {
        let frame = PollingFrame::new(PollingFrameType::Unknown, b"filter".to_vec());
        assert_eq!(frame.data_hex(), "66696C746572");
        assert!(frame.has_data());
    }

    #[test]
    fn test_frame_type_codes() {
        for t in [
            PollingFrameType::FieldOn,
            PollingFrameType::FieldOff,
            PollingFrameType::NfcA,
            PollingFrameType::NfcB,
            PollingFrameType::NfcF,
            PollingFrameType::Unknown,
        ] {
            assert_eq!(PollingFrameType::from_code(t.code()), t);
        }
        assert_eq!(PollingFrameType::from_code(b'?'), PollingFrameType::Unknown);
    }

    #[test]
    fn test_frame_json_uses_hex_payload() {
        let frame = PollingFrame::new(PollingFrameType::NfcA, vec![0x52]).with_timestamp(7);
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"52\""));
        let back: PollingFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}
