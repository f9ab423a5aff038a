//! Channel snapshots and the status frame sent to an external controller.
//!
//! Frame layout, all fields little endian:
//!
//! | bytes | field           |
//! |-------|-----------------|
//! | 0..4  | timer           |
//! | 4     | voltage code    |
//! | 5..7  | current code    |
//! | 7..9  | temperature raw |
//! | 9..11 | light raw       |
//! | 11    | error code      |
//! | 12    | checksum        |
//!
//! The checksum is the wrapping sum of bytes `0..12`.

use heapless::Vec;

use crate::channel::State;
use crate::{ChannelId, ErrorCode};

pub const FRAME_LEN: usize = 13;

pub type Frame = Vec<u8, FRAME_LEN>;

/// Read-only view of a channel's active operating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelSnapshot {
    pub channel: ChannelId,
    pub state: State,
    pub timer: u32,
    pub voltage: u8,
    pub current: u16,
    pub error: ErrorCode,
}

/// Board-level readings shared by both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ambient {
    pub temperature_raw: u16,
    pub light_raw: u16,
}

/// Contents of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameData {
    pub timer: u32,
    pub voltage: u8,
    pub current: u16,
    pub ambient: Ambient,
    pub error: ErrorCode,
}

#[derive(Debug, PartialEq)]
pub enum FrameError {
    /// The frame is not `FRAME_LEN` bytes long
    Length,
    /// The trailing checksum does not match the payload
    Checksum,
    /// The error code byte is unknown
    ErrorCode(u8),
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

#[must_use]
pub fn encode_frame(snapshot: &ChannelSnapshot, ambient: &Ambient) -> Frame {
    let mut frame = Frame::new();
    let timer = snapshot.timer.to_le_bytes();
    let current = snapshot.current.to_le_bytes();
    let temperature = ambient.temperature_raw.to_le_bytes();
    let light = ambient.light_raw.to_le_bytes();
    let voltage = [snapshot.voltage];
    let error = [u8::from(snapshot.error)];
    let fields: [&[u8]; 6] = [&timer, &voltage, &current, &temperature, &light, &error];

    for field in fields {
        // fields add up to FRAME_LEN - 1 bytes
        let _ = frame.extend_from_slice(field);
    }

    let sum = checksum(&frame);
    let _ = frame.push(sum);

    frame
}

pub fn decode_frame(bytes: &[u8]) -> Result<FrameData, FrameError> {
    if bytes.len() != FRAME_LEN {
        return Err(FrameError::Length);
    }

    let (payload, sum) = bytes.split_at(FRAME_LEN - 1);

    if checksum(payload) != sum[0] {
        return Err(FrameError::Checksum);
    }

    let error = ErrorCode::try_from(payload[11]).map_err(FrameError::ErrorCode)?;

    Ok(FrameData {
        timer: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        voltage: payload[4],
        current: u16::from_le_bytes([payload[5], payload[6]]),
        ambient: Ambient {
            temperature_raw: u16::from_le_bytes([payload[7], payload[8]]),
            light_raw: u16::from_le_bytes([payload[9], payload[10]]),
        },
        error,
    })
}
