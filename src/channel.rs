use crate::config::{self, TrackerConfig};
use crate::data::{MeasurementData, Point};
use crate::telemetry::ChannelSnapshot;
use crate::{ChannelId, Clock, CurrentReader, ErrorCode, Indicator, VoltageSource, scan, track};

/// Parent state grouping the child states of one algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Scanning,
    Tracking,
}

/// States of the channel state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Output at zero, waiting to check the short-circuit current
    Initialise,
    /// Scan parent: starts the next point or evaluates the finished sweep
    ScanningMode,
    /// Settles and samples the point at `v_scan`
    MeasureScanPoint,
    /// Idle period between tracking cycles
    TrackingDelay,
    /// Settles and samples the operating point at `v_this`
    MeasureThisPoint,
    /// Settles and samples the neighbouring point at `v_next`
    MeasureNextPoint,
    /// Runs the perturb-and-observe decision once
    AnalyseMeasurement,
    /// Output at zero until an external reset
    Error,
}

impl State {
    #[must_use]
    pub const fn mode(self) -> Option<Mode> {
        match self {
            State::ScanningMode | State::MeasureScanPoint => Some(Mode::Scanning),
            State::TrackingDelay
            | State::MeasureThisPoint
            | State::MeasureNextPoint
            | State::AnalyseMeasurement => Some(Mode::Tracking),
            State::Initialise | State::Error => None,
        }
    }

    /// The point sampled by a measuring state.
    #[must_use]
    pub const fn measured_point(self) -> Option<Point> {
        match self {
            State::MeasureScanPoint => Some(Point::Scan),
            State::MeasureThisPoint => Some(Point::This),
            State::MeasureNextPoint => Some(Point::Next),
            _ => None,
        }
    }
}

/// One measurement channel: scans for the maximum power point then tracks it.
///
/// Every wait is expressed as a comparison of `now - timer` against a
/// threshold on each [`Channel::tick`], so a tick never blocks. At most one
/// state transition happens per tick.
pub struct Channel<L: Indicator> {
    id: ChannelId,
    config: TrackerConfig,
    indicator: L,
    data: MeasurementData,
    timer: u32,
    error: ErrorCode,
    error_read_count: u16,
    state: State,
    entry_pending: bool,
}

impl<L: Indicator> Channel<L> {
    /// Creates a channel in `Initialise`. Its entry action runs on the first tick.
    #[must_use]
    pub fn new(id: ChannelId, config: TrackerConfig, indicator: L) -> Self {
        Self {
            id,
            config,
            indicator,
            data: MeasurementData::default(),
            timer: 0,
            error: ErrorCode::Ok,
            error_read_count: 0,
            state: State::Initialise,
            entry_pending: true,
        }
    }

    /// Drops any measurement in flight and re-enters `Initialise`.
    pub fn reset(&mut self) {
        self.data = MeasurementData::default();
        self.error = ErrorCode::Ok;
        self.error_read_count = 0;
        self.state = State::Initialise;
        self.entry_pending = true;
    }

    /// Applies new parameters and restarts the channel from `Initialise`.
    pub fn reconfigure(&mut self, config: TrackerConfig) {
        self.config = config;
        self.reset();
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn error_read_count(&self) -> u16 {
        self.error_read_count
    }

    /// Baseline of the wait in progress.
    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn data(&self) -> &MeasurementData {
        &self.data
    }

    pub fn indicator(&self) -> &L {
        &self.indicator
    }

    /// Read-only view of the active point for telemetry.
    pub fn snapshot(&self) -> ChannelSnapshot {
        let point = match self.state {
            State::ScanningMode | State::MeasureScanPoint => Point::Scan,
            State::MeasureNextPoint => Point::Next,
            _ => Point::This,
        };

        ChannelSnapshot {
            channel: self.id,
            state: self.state,
            timer: self.timer,
            voltage: self.data.voltage(point),
            current: self.data.current(point),
            error: self.error,
        }
    }

    pub fn tick<C, V, R>(&mut self, clock: &C, source: &mut V, reader: &mut R)
    where
        C: Clock,
        V: VoltageSource,
        R: CurrentReader,
    {
        let now = clock.now_millis();
        self.indicator.tick(now);

        if self.entry_pending {
            self.entry_pending = false;
            debug!("channel {}: entering {}", self.id, self.state);
            self.enter(self.state, now, source);
            return;
        }

        let next = match self.state {
            State::Initialise => self.initialise_step(now, reader),
            State::ScanningMode => self.scanning_mode_step(now),
            State::MeasureScanPoint | State::MeasureThisPoint | State::MeasureNextPoint => {
                self.measure_point_step(now, source, reader)
            }
            State::TrackingDelay => self.tracking_delay_step(now),
            State::AnalyseMeasurement => self.analyse_step(now),
            State::Error => None,
        };

        if let Some(target) = next {
            self.transition_to(target, now, source);
        }
    }

    fn transition_to<V: VoltageSource>(&mut self, target: State, now: u32, source: &mut V) {
        let current = self.state;

        if current == target {
            return;
        }

        debug!("channel {}: {} -> {}", self.id, current, target);

        // child to sibling or child to parent stays inside the mode
        if current.mode() != target.mode() {
            if let Some(mode) = current.mode() {
                self.exit_mode(mode);
            }
            if let Some(mode) = target.mode() {
                self.enter_mode(mode);
            }
        }

        self.state = target;
        self.enter(target, now, source);
    }

    fn enter_mode(&mut self, mode: Mode) {
        match mode {
            Mode::Scanning => {
                info!("channel {}: scanning for MPP", self.id);
                self.indicator
                    .set_timing(config::SCAN_LED_ON_TIME, config::SCAN_LED_OFF_TIME);
                self.indicator.blink_constant();
                self.data.v_scan = self.config.v_scan_min;
            }
            Mode::Tracking => {
                info!("channel {}: tracking max power point", self.id);
            }
        }
    }

    fn exit_mode(&mut self, mode: Mode) {
        if mode == Mode::Scanning {
            self.indicator.off();
        }
    }

    fn enter<V: VoltageSource>(&mut self, state: State, now: u32, source: &mut V) {
        match state {
            State::Initialise => {
                self.data = MeasurementData::default();
                self.error = ErrorCode::Ok;
                self.error_read_count = 0;
                self.timer = now;
                source.set_output(0, self.id);
                self.indicator
                    .set_timing(config::INIT_LED_ON_TIME, config::INIT_LED_OFF_TIME);
                self.indicator.blink_constant();
            }
            State::ScanningMode | State::TrackingDelay => self.timer = now,
            State::MeasureScanPoint => self.start_point(Point::Scan, now, source),
            State::MeasureThisPoint => self.start_point(Point::This, now, source),
            State::MeasureNextPoint => {
                track::arm_next(&mut self.data, &self.config);
                self.start_point(Point::Next, now, source);
            }
            State::AnalyseMeasurement => {}
            State::Error => {
                error!("channel {}: disabled with {}", self.id, self.error);
                source.set_output(0, self.id);
                self.indicator
                    .set_timing(config::ERROR_LED_ON_TIME, config::ERROR_LED_OFF_TIME);
                self.indicator.blink_constant();
            }
        }
    }

    /// Commands the point's voltage if needed and begins its settle phase.
    fn start_point<V: VoltageSource>(&mut self, point: Point, now: u32, source: &mut V) {
        let voltage = self.data.voltage(point);

        if source.last_output(self.id) != voltage {
            source.set_output(voltage, self.id);
        }

        self.data.reset_samples();
        self.timer = now;
    }

    fn initialise_step<R: CurrentReader>(&mut self, now: u32, reader: &mut R) -> Option<State> {
        if now.wrapping_sub(self.timer) < self.config.post_delay_ms {
            return None;
        }

        let short_circuit = reader.read_sample(self.id);

        if short_circuit < self.config.threshold_current {
            warn!(
                "channel {}: short-circuit current {} below threshold {}",
                self.id,
                short_circuit,
                self.config.threshold_current
            );
            self.error = ErrorCode::CurrentThreshold;
            return Some(State::Error);
        }

        Some(State::ScanningMode)
    }

    fn scanning_mode_step(&mut self, now: u32) -> Option<State> {
        let aborted = self.error == ErrorCode::CurrentLimit;

        if !aborted && !scan::sweep_done(&self.data, &self.config) {
            return Some(State::MeasureScanPoint);
        }

        if !scan::hill_shape_ok(&self.data) {
            self.error = ErrorCode::InvalidScan;
        }

        info!(
            "channel {}: scan done at {}, vMpp = {}, iMpp = {}, error = {}",
            self.id,
            now,
            self.data.v_scan_mpp,
            self.data.i_scan_mpp,
            self.error
        );

        if self.error != ErrorCode::Ok {
            return Some(State::Error);
        }

        track::seed(&mut self.data, &self.config);
        Some(State::TrackingDelay)
    }

    fn measure_point_step<V, R>(&mut self, now: u32, source: &mut V, reader: &mut R) -> Option<State>
    where
        V: VoltageSource,
        R: CurrentReader,
    {
        let point = self.state.measured_point()?;
        let voltage = self.data.voltage(point);

        if source.last_output(self.id) != voltage {
            warn!(
                "channel {}: output readback {} != {}, restarting point",
                self.id,
                source.last_output(self.id),
                voltage
            );
            self.start_point(point, now, source);
            return None;
        }

        let elapsed = now.wrapping_sub(self.timer);

        if elapsed < self.config.settle_time_ms {
            None
        } else if elapsed < self.config.sampling_end_ms() {
            let sample = reader.read_sample(self.id);
            trace!("channel {}: sample {} at {}", self.id, sample, voltage);
            self.data.add_sample(point, sample);
            None
        } else if self.data.n_samples == 0 {
            debug!("channel {}: no samples taken at {}, retrying", self.id, voltage);
            self.timer = now;
            None
        } else {
            self.data.finalize(point);
            Some(self.complete_point(point))
        }
    }

    fn complete_point(&mut self, point: Point) -> State {
        match point {
            Point::Scan => {
                scan::record_point(&mut self.data, &self.config);

                if scan::saturated(&self.data, &self.config) {
                    warn!("channel {}: current limit at {}, aborting scan", self.id, self.data.v_scan);
                    self.error = ErrorCode::CurrentLimit;
                }

                debug!(
                    "channel {}: scan {}, {}, {}, {}",
                    self.id,
                    self.data.v_scan,
                    self.data.i_scan,
                    self.data.p_scan,
                    self.error
                );

                if self.error == ErrorCode::Ok {
                    scan::advance(&mut self.data, &self.config);
                }

                State::ScanningMode
            }
            Point::This => {
                self.data.this_done = true;
                State::MeasureNextPoint
            }
            Point::Next => {
                self.data.next_done = true;
                State::AnalyseMeasurement
            }
        }
    }

    fn tracking_delay_step(&mut self, now: u32) -> Option<State> {
        if now.wrapping_sub(self.timer) < self.config.track_delay_ms {
            return None;
        }

        Some(State::MeasureThisPoint)
    }

    fn analyse_step(&mut self, now: u32) -> Option<State> {
        let direction = track::perturb_and_observe(&mut self.data, &self.config);
        self.indicator.blink_n_times(direction.blinks());

        self.error = track::classify_current(self.data.i_this, &self.config);
        self.error_read_count = match self.error {
            ErrorCode::Ok => 0,
            _ => self.error_read_count.saturating_add(1),
        };

        info!(
            "channel {}: {}, {}, {}, {}",
            self.id,
            self.data.v_this,
            self.data.i_this,
            self.data.p_this,
            self.error
        );

        self.data.this_done = false;
        self.data.next_done = false;
        self.timer = now;

        if self.error_read_count > self.config.max_error_reads {
            return Some(State::Error);
        }

        Some(State::TrackingDelay)
    }
}
