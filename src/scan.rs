//! IV scan bookkeeping used while the channel sweeps from `v_scan_min` to
//! `v_scan_max`.

use crate::config::TrackerConfig;
use crate::data::MeasurementData;

/// Records the scanned point held in `data`.
///
/// The maximum power point candidate only moves on a strictly higher power,
/// so on a tie the earliest voltage wins. Powers at the sweep endpoints are
/// kept for the shape check.
pub fn record_point(data: &mut MeasurementData, config: &TrackerConfig) {
    data.p_scan = u32::from(data.v_scan) * u32::from(data.i_scan);

    if data.p_scan > data.p_scan_mpp {
        data.p_scan_mpp = data.p_scan;
        data.i_scan_mpp = data.i_scan;
        data.v_scan_mpp = data.v_scan;
    }

    if data.v_scan == config.v_scan_min {
        data.p_scan_initial = data.p_scan;
    } else if data.v_scan == config.v_scan_max {
        data.p_scan_final = data.p_scan;
    }
}

/// True when the last scanned current reached the reader's limit.
pub fn saturated(data: &MeasurementData, config: &TrackerConfig) -> bool {
    data.i_scan >= config.max_current
}

pub fn sweep_done(data: &MeasurementData, config: &TrackerConfig) -> bool {
    data.v_scan > config.v_scan_max
}

/// A usable device has its power maximum strictly inside the sweep.
pub fn hill_shape_ok(data: &MeasurementData) -> bool {
    data.p_scan_initial < data.p_scan_mpp && data.p_scan_final < data.p_scan_mpp
}

pub(crate) fn advance(data: &mut MeasurementData, config: &TrackerConfig) {
    data.v_scan = data.v_scan.saturating_add(config.dv_scan);
}
