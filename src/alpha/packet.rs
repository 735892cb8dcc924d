//! Telemetry packet codec
//!
//! Every notification on the Nordic UART TX characteristic carries exactly one
//! big-endian packet of eleven 16-bit fields, no padding:
//!
//! | offset | field          | type |
//! |--------|----------------|------|
//! | 0      | accel x/y/z    | i16  |
//! | 6      | gyro x/y/z     | i16  |
//! | 12     | mag x/y/z      | i16  |
//! | 18     | temp           | i16  |
//! | 20     | activation raw | u16  |

use thiserror::Error;

use crate::alpha::constants::PACKET_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed packet: expected {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },
}

/// One decoded telemetry sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryPacket {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,

    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,

    pub mag_x: i16,
    pub mag_y: i16,
    pub mag_z: i16,

    pub temp: i16,

    /// Raw activation (muscle) reading
    pub activation_raw: u16,
}

impl TelemetryPacket {
    /// Decode one notification payload
    ///
    /// The payload must be exactly [`PACKET_LEN`] bytes; anything else is
    /// rejected, never truncated or padded.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; PACKET_LEN] = data
            .try_into()
            .map_err(|_| DecodeError::MalformedPacket {
                expected: PACKET_LEN,
                actual: data.len(),
            })?;

        let field = |index: usize| [bytes[index * 2], bytes[index * 2 + 1]];

        Ok(Self {
            accel_x: i16::from_be_bytes(field(0)),
            accel_y: i16::from_be_bytes(field(1)),
            accel_z: i16::from_be_bytes(field(2)),
            gyro_x: i16::from_be_bytes(field(3)),
            gyro_y: i16::from_be_bytes(field(4)),
            gyro_z: i16::from_be_bytes(field(5)),
            mag_x: i16::from_be_bytes(field(6)),
            mag_y: i16::from_be_bytes(field(7)),
            mag_z: i16::from_be_bytes(field(8)),
            temp: i16::from_be_bytes(field(9)),
            activation_raw: u16::from_be_bytes(field(10)),
        })
    }

    /// Encode back into the wire layout
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let signed = [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.gyro_x,
            self.gyro_y,
            self.gyro_z,
            self.mag_x,
            self.mag_y,
            self.mag_z,
            self.temp,
        ];

        let mut bytes = [0u8; PACKET_LEN];
        for (chunk, value) in bytes.chunks_exact_mut(2).zip(signed) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        bytes[PACKET_LEN - 2..].copy_from_slice(&self.activation_raw.to_be_bytes());
        bytes
    }

    /// Whether this sample counts as triggered (strictly above `threshold`)
    pub fn is_activated(&self, threshold: u16) -> bool {
        self.activation_raw > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpha::constants::ACTIVATION_THRESHOLD;

    fn sample() -> TelemetryPacket {
        TelemetryPacket {
            accel_x: -1,
            accel_y: 2,
            accel_z: i16::MIN,
            gyro_x: i16::MAX,
            gyro_y: -300,
            gyro_z: 0,
            mag_x: 1234,
            mag_y: -1234,
            mag_z: 7,
            temp: 25,
            activation_raw: u16::MAX,
        }
    }

    #[test]
    fn test_decode_field_order() {
        let data: Vec<u8> = (1..=22).collect();
        let packet = TelemetryPacket::decode(&data).unwrap();

        assert_eq!(packet.accel_x, 0x0102);
        assert_eq!(packet.accel_y, 0x0304);
        assert_eq!(packet.gyro_x, 0x0708);
        assert_eq!(packet.mag_z, 0x1112);
        assert_eq!(packet.temp, 0x1314);
        assert_eq!(packet.activation_raw, 0x1516);
    }

    #[test]
    fn test_decode_big_endian_signed() {
        let mut data = [0u8; PACKET_LEN];
        data[0] = 0xFF;
        data[1] = 0xFE;
        data[20] = 0x80;
        data[21] = 0x00;

        let packet = TelemetryPacket::decode(&data).unwrap();
        assert_eq!(packet.accel_x, -2);
        assert_eq!(packet.activation_raw, 0x8000);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        for len in [0, 1, 20, 21, 23, 44] {
            let data = vec![0xAB; len];
            assert_eq!(
                TelemetryPacket::decode(&data),
                Err(DecodeError::MalformedPacket { expected: PACKET_LEN, actual: len })
            );
        }
    }

    #[test]
    fn test_packet_len_matches_layout() {
        // Ten i16 fields plus the u16 activation reading
        assert_eq!(PACKET_LEN, 10 * 2 + 2);
        assert_eq!(sample().encode().len(), PACKET_LEN);
    }

    #[test]
    fn test_round_trip() {
        let packet = sample();
        assert_eq!(TelemetryPacket::decode(&packet.encode()), Ok(packet));
    }

    #[test]
    fn test_activation_boundary() {
        let at = |raw: u16| TelemetryPacket { activation_raw: raw, ..Default::default() };

        assert!(!at(0).is_activated(ACTIVATION_THRESHOLD));
        assert!(!at(100).is_activated(ACTIVATION_THRESHOLD));
        assert!(at(101).is_activated(ACTIVATION_THRESHOLD));
        assert!(at(32767).is_activated(ACTIVATION_THRESHOLD));
    }
}
