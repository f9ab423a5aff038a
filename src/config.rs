//! Measurement parameters shared by the scan and tracking algorithms.
//!
//! Voltages are DAC codes, currents are ADC codes and times are milliseconds.

use core::marker::PhantomData;

pub const V_SCAN_MIN: u8 = 0;
pub const V_SCAN_MAX: u8 = 100;
/// Voltage step between scanned points
pub const DV_SCAN: u8 = 1;
/// Perturbation step used while tracking. Needs to be large enough for the
/// power difference between neighbouring points to be observable.
pub const DV_MPPT: u8 = 1;
pub const SETTLE_TIME: u32 = 200;
pub const SAMPLING_TIME: u32 = 200;
pub const TRACK_DELAY_TIME: u32 = 200;
/// Wait after switching the output off before the short-circuit current check
pub const POST_DELAY_TIME: u32 = 500;

pub const MAX_ERROR_READS: u16 = 20;
pub const MAX_CURRENT: u16 = 0xFFFF;
pub const MIN_CURRENT: u16 = 200;
pub const THRESHOLD_CURRENT: u16 = 1000;

pub const SCAN_LED_ON_TIME: u32 = 50;
pub const SCAN_LED_OFF_TIME: u32 = 500;
pub const ERROR_LED_ON_TIME: u32 = 500;
pub const ERROR_LED_OFF_TIME: u32 = 500;
pub const INIT_LED_ON_TIME: u32 = 100;
pub const INIT_LED_OFF_TIME: u32 = 100;

/// Errors reported while validating a configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The scan start voltage is not below the scan end voltage
    InvalidScanRange,
    /// The scan step is zero, overflows the DAC range or does not divide the range
    InvalidScanStep,
    /// The tracking step is zero or larger than half the DAC range
    InvalidTrackingStep,
    /// The sampling window is empty or settle plus sampling time overflows
    InvalidTiming,
    /// Minimum, threshold and maximum currents are inconsistent
    InvalidCurrentLimits,
    /// A required callback was not provided
    MissingCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerConfig {
    pub(crate) v_scan_min: u8,
    pub(crate) v_scan_max: u8,
    pub(crate) dv_scan: u8,
    pub(crate) dv_mppt: u8,
    pub(crate) settle_time_ms: u32,
    pub(crate) sampling_time_ms: u32,
    pub(crate) track_delay_ms: u32,
    pub(crate) post_delay_ms: u32,
    pub(crate) max_error_reads: u16,
    pub(crate) max_current: u16,
    pub(crate) min_current: u16,
    pub(crate) threshold_current: u16,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            v_scan_min: V_SCAN_MIN,
            v_scan_max: V_SCAN_MAX,
            dv_scan: DV_SCAN,
            dv_mppt: DV_MPPT,
            settle_time_ms: SETTLE_TIME,
            sampling_time_ms: SAMPLING_TIME,
            track_delay_ms: TRACK_DELAY_TIME,
            post_delay_ms: POST_DELAY_TIME,
            max_error_reads: MAX_ERROR_READS,
            max_current: MAX_CURRENT,
            min_current: MIN_CURRENT,
            threshold_current: THRESHOLD_CURRENT,
        }
    }
}

impl TrackerConfig {
    #[must_use]
    pub fn builder() -> TrackerConfigBuilder<ScanRangeBuildState> {
        TrackerConfigBuilder {
            config: TrackerConfig::default(),
            _phantom: PhantomData,
        }
    }

    pub fn v_scan_min(&self) -> u8 {
        self.v_scan_min
    }

    pub fn v_scan_max(&self) -> u8 {
        self.v_scan_max
    }

    pub fn dv_scan(&self) -> u8 {
        self.dv_scan
    }

    pub fn dv_mppt(&self) -> u8 {
        self.dv_mppt
    }

    pub fn settle_time_ms(&self) -> u32 {
        self.settle_time_ms
    }

    pub fn sampling_time_ms(&self) -> u32 {
        self.sampling_time_ms
    }

    /// End of the sampling window measured from the start of a settle phase.
    pub fn sampling_end_ms(&self) -> u32 {
        self.settle_time_ms + self.sampling_time_ms
    }

    pub fn track_delay_ms(&self) -> u32 {
        self.track_delay_ms
    }

    pub fn post_delay_ms(&self) -> u32 {
        self.post_delay_ms
    }

    pub fn max_error_reads(&self) -> u16 {
        self.max_error_reads
    }

    pub fn max_current(&self) -> u16 {
        self.max_current
    }

    pub fn min_current(&self) -> u16 {
        self.min_current
    }

    pub fn threshold_current(&self) -> u16 {
        self.threshold_current
    }

    /// Highest tracked voltage that still leaves room for the neighbouring point.
    pub(crate) fn v_track_max(&self) -> u8 {
        u8::MAX - self.dv_mppt
    }
}

pub struct ScanRangeBuildState {}
pub struct TimingBuildState {}
pub struct FinalizedBuildState {}

pub struct TrackerConfigBuilder<T> {
    config: TrackerConfig,
    _phantom: PhantomData<T>,
}

impl<T> TrackerConfigBuilder<T> {
    pub fn tracking_step(mut self, dv_mppt: u8) -> Self {
        self.config.dv_mppt = dv_mppt;
        self
    }

    pub fn post_delay_ms(mut self, post_delay_ms: u32) -> Self {
        self.config.post_delay_ms = post_delay_ms;
        self
    }

    pub fn max_error_reads(mut self, max_error_reads: u16) -> Self {
        self.config.max_error_reads = max_error_reads;
        self
    }

    pub fn current_limits(mut self, min_current: u16, max_current: u16) -> Self {
        self.config.min_current = min_current;
        self.config.max_current = max_current;
        self
    }

    pub fn threshold_current(mut self, threshold_current: u16) -> Self {
        self.config.threshold_current = threshold_current;
        self
    }
}

impl TrackerConfigBuilder<ScanRangeBuildState> {
    pub fn scan_range(
        self,
        v_min: u8,
        v_max: u8,
        dv: u8,
    ) -> Result<TrackerConfigBuilder<TimingBuildState>, ConfigError> {
        if v_min >= v_max {
            return Err(ConfigError::InvalidScanRange);
        }

        // the sweep ends once the scan voltage passes v_max, so v_max + dv
        // must still be a valid code and v_max must be hit exactly
        if dv == 0 || v_max.checked_add(dv).is_none() || (v_max - v_min) % dv != 0 {
            return Err(ConfigError::InvalidScanStep);
        }

        let mut config = self.config;
        config.v_scan_min = v_min;
        config.v_scan_max = v_max;
        config.dv_scan = dv;

        Ok(TrackerConfigBuilder {
            config,
            _phantom: PhantomData,
        })
    }
}

impl TrackerConfigBuilder<TimingBuildState> {
    pub fn timing(
        self,
        settle_time_ms: u32,
        sampling_time_ms: u32,
        track_delay_ms: u32,
    ) -> Result<TrackerConfigBuilder<FinalizedBuildState>, ConfigError> {
        if sampling_time_ms == 0 || settle_time_ms.checked_add(sampling_time_ms).is_none() {
            return Err(ConfigError::InvalidTiming);
        }

        let mut config = self.config;
        config.settle_time_ms = settle_time_ms;
        config.sampling_time_ms = sampling_time_ms;
        config.track_delay_ms = track_delay_ms;

        Ok(TrackerConfigBuilder {
            config,
            _phantom: PhantomData,
        })
    }
}

impl TrackerConfigBuilder<FinalizedBuildState> {
    pub fn build(self) -> Result<TrackerConfig, ConfigError> {
        let config = self.config;

        if config.dv_mppt == 0 || config.dv_mppt > u8::MAX / 2 {
            return Err(ConfigError::InvalidTrackingStep);
        }

        if config.min_current >= config.max_current
            || config.threshold_current > config.max_current
        {
            return Err(ConfigError::InvalidCurrentLimits);
        }

        Ok(config)
    }
}
