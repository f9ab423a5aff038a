#![no_std]
#[macro_use]
mod fmt;

mod channel;
pub mod config;
mod data;
mod flasher;
pub mod scan;
pub mod telemetry;
pub mod track;

pub use channel::{Channel, Mode, State};
pub use config::{ConfigError, TrackerConfig, TrackerConfigBuilder};
pub use data::{MeasurementData, Point};
pub use flasher::{Flasher, FlasherBuilder, LedCallback, LedState};
pub use telemetry::{Ambient, ChannelSnapshot, Frame, FrameData, FrameError};

/// Selects one of the two independent measurement channels.
///
/// Each channel is bound to one voltage source output and one current reader
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelId {
    A,
    B,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::A, ChannelId::B];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            ChannelId::A => 0,
            ChannelId::B => 1,
        }
    }
}

/// Error code carried by every channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// No fault
    #[default]
    Ok,
    /// Tracking current below the minimum allowed current
    LowCurrent,
    /// Current reading at or above the reader's saturation level
    CurrentLimit,
    /// Short-circuit current below the threshold required to start measuring
    CurrentThreshold,
    /// The scanned power-voltage curve is not hill shaped
    InvalidScan,
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Ok => 0,
            ErrorCode::LowCurrent => 1,
            ErrorCode::CurrentLimit => 2,
            ErrorCode::CurrentThreshold => 3,
            ErrorCode::InvalidScan => 4,
        }
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Ok),
            1 => Ok(ErrorCode::LowCurrent),
            2 => Ok(ErrorCode::CurrentLimit),
            3 => Ok(ErrorCode::CurrentThreshold),
            4 => Ok(ErrorCode::InvalidScan),
            other => Err(other),
        }
    }
}

/// Monotonic millisecond counter. Wraps silently.
pub trait Clock {
    fn now_millis(&self) -> u32;
}

/// Output device that sets the voltage applied to each channel as a DAC code.
pub trait VoltageSource {
    fn set_output(&mut self, code: u8, channel: ChannelId);
    /// Readback of the last code applied to `channel`.
    fn last_output(&self, channel: ChannelId) -> u8;
}

/// Input device returning one (possibly internally averaged) current sample.
pub trait CurrentReader {
    fn read_sample(&mut self, channel: ChannelId) -> u16;
}

/// Temperature sensor returning its raw reading.
pub trait TemperatureReader {
    fn read_raw(&mut self) -> u16;
}

/// Operator feedback LED. Never read back by the state machine.
pub trait Indicator {
    /// Change the on and off durations in milliseconds.
    fn set_timing(&mut self, on_ms: u32, off_ms: u32);
    /// Flash until told otherwise.
    fn blink_constant(&mut self);
    /// Flash `n` times then stay off.
    fn blink_n_times(&mut self, n: u16);
    /// Switch the LED off and stop flashing.
    fn off(&mut self);
    /// Advance the blink schedule.
    fn tick(&mut self, now_ms: u32);
}

/// Drives both measurement channels from one cooperative loop.
pub struct DualChannelTracker<L: Indicator> {
    channels: [Channel<L>; 2],
}

impl<L: Indicator> DualChannelTracker<L> {
    #[must_use]
    pub fn new(config: TrackerConfig, indicator_a: L, indicator_b: L) -> Self {
        Self {
            channels: [
                Channel::new(ChannelId::A, config, indicator_a),
                Channel::new(ChannelId::B, config, indicator_b),
            ],
        }
    }

    /// Advances every channel by one tick.
    pub fn tick<C, V, R>(&mut self, clock: &C, source: &mut V, reader: &mut R)
    where
        C: Clock,
        V: VoltageSource,
        R: CurrentReader,
    {
        for channel in &mut self.channels {
            channel.tick(clock, source, reader);
        }
    }

    #[must_use]
    pub fn channel(&self, id: ChannelId) -> &Channel<L> {
        &self.channels[id.index()]
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut Channel<L> {
        &mut self.channels[id.index()]
    }

    pub fn reset(&mut self, id: ChannelId) {
        self.channels[id.index()].reset();
    }

    pub fn reconfigure(&mut self, id: ChannelId, config: TrackerConfig) {
        self.channels[id.index()].reconfigure(config);
    }

    #[must_use]
    pub fn snapshots(&self) -> [ChannelSnapshot; 2] {
        [self.channels[0].snapshot(), self.channels[1].snapshot()]
    }

    /// Builds one telemetry frame per channel, sampling the temperature once.
    pub fn frames<T: TemperatureReader>(&self, temperature: &mut T, light_raw: u16) -> [Frame; 2] {
        let ambient = Ambient {
            temperature_raw: temperature.read_raw(),
            light_raw,
        };
        let [a, b] = self.snapshots();

        [
            telemetry::encode_frame(&a, &ambient),
            telemetry::encode_frame(&b, &ambient),
        ]
    }
}
