//! Perturb-and-observe tracking.

use crate::ErrorCode;
use crate::config::TrackerConfig;
use crate::data::MeasurementData;

/// Direction the operating point moved after one tracking cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Uphill,
    Downhill,
}

impl Direction {
    /// Number of indicator flashes reporting this direction.
    pub fn blinks(self) -> u16 {
        match self {
            Direction::Uphill => 2,
            Direction::Downhill => 1,
        }
    }
}

/// Seeds tracking from the scan result.
pub(crate) fn seed(data: &mut MeasurementData, config: &TrackerConfig) {
    data.v_this = data.v_scan_mpp.min(config.v_track_max());
    arm_next(data, config);
}

/// Places the neighbouring point one tracking step above the operating point.
pub(crate) fn arm_next(data: &mut MeasurementData, config: &TrackerConfig) {
    data.v_next = data.v_this.saturating_add(config.dv_mppt);
}

/// Moves the operating point towards higher power.
///
/// `v_this` stays within `[0, 255 - dv_mppt]` so the neighbouring point is
/// always a valid code.
pub fn perturb_and_observe(data: &mut MeasurementData, config: &TrackerConfig) -> Direction {
    let direction = if data.p_next > data.p_this {
        data.v_this = data
            .v_this
            .saturating_add(config.dv_mppt)
            .min(config.v_track_max());
        Direction::Uphill
    } else {
        data.v_this = data.v_this.saturating_sub(config.dv_mppt);
        Direction::Downhill
    };

    arm_next(data, config);

    direction
}

/// Classifies a tracked current reading.
pub fn classify_current(current: u16, config: &TrackerConfig) -> ErrorCode {
    if current < config.min_current {
        ErrorCode::LowCurrent
    } else if current >= config.max_current {
        ErrorCode::CurrentLimit
    } else {
        ErrorCode::Ok
    }
}
