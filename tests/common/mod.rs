#![allow(dead_code)]

use pv_mppt::{
    Channel, ChannelId, Clock, CurrentReader, Indicator, State, TemperatureReader, TrackerConfig,
    VoltageSource,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub const TICK_MS: u32 = 5;

/// Settle 20 ms, sample 20 ms, track delay 20 ms, post delay 50 ms.
pub fn fast_config() -> TrackerConfig {
    TrackerConfig::builder()
        .post_delay_ms(50)
        .max_error_reads(3)
        .scan_range(0, 100, 1)
        .unwrap()
        .timing(20, 20, 20)
        .unwrap()
        .build()
        .unwrap()
}

pub struct MockClock {
    now: Cell<u32>,
}

impl MockClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn now(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u32 {
        self.now.get()
    }
}

/// Current code drawn by a device at a given voltage code.
pub type DeviceModel = Box<dyn Fn(u8) -> u16>;

/// Flat current up to `peak`, then falling 2000 codes per step. The power
/// maximum sits at `peak` for any peak above 19.
pub fn hill_device(peak: u8) -> DeviceModel {
    Box::new(move |v| {
        let drop = u32::from(v.saturating_sub(peak)) * 2000;
        40_000u32.saturating_sub(drop) as u16
    })
}

pub fn constant_current(current: u16) -> DeviceModel {
    Box::new(move |_| current)
}

/// Returns the listed current at each voltage and `default` elsewhere.
pub fn fixed_points(points: &[(u8, u16)], default: u16) -> DeviceModel {
    let points = points.to_vec();
    Box::new(move |v| {
        points
            .iter()
            .find(|(code, _)| *code == v)
            .map_or(default, |(_, current)| *current)
    })
}

struct BenchChannel {
    output: u8,
    model: DeviceModel,
    script: VecDeque<u16>,
    dropped_writes: u32,
    writes: Vec<u8>,
    reads: u32,
}

impl BenchChannel {
    fn new() -> Self {
        Self {
            output: 0,
            model: constant_current(0),
            script: VecDeque::new(),
            dropped_writes: 0,
            writes: Vec::new(),
            reads: 0,
        }
    }
}

/// Two devices wired to one voltage source and one current reader.
#[derive(Clone)]
pub struct Bench {
    channels: Rc<RefCell<[BenchChannel; 2]>>,
}

impl Bench {
    pub fn new() -> Self {
        Self {
            channels: Rc::new(RefCell::new([BenchChannel::new(), BenchChannel::new()])),
        }
    }

    pub fn set_model(&self, channel: ChannelId, model: DeviceModel) {
        self.channels.borrow_mut()[channel.index()].model = model;
    }

    /// Samples returned ahead of the device model.
    pub fn script(&self, channel: ChannelId, samples: &[u16]) {
        self.channels.borrow_mut()[channel.index()]
            .script
            .extend(samples.iter().copied());
    }

    /// Ignores the next `count` writes to `channel`.
    pub fn drop_writes(&self, channel: ChannelId, count: u32) {
        self.channels.borrow_mut()[channel.index()].dropped_writes = count;
    }

    /// Overwrites the applied output behind the state machine's back.
    pub fn force_output(&self, channel: ChannelId, code: u8) {
        self.channels.borrow_mut()[channel.index()].output = code;
    }

    pub fn output(&self, channel: ChannelId) -> u8 {
        self.channels.borrow()[channel.index()].output
    }

    /// Applied writes in order.
    pub fn writes(&self, channel: ChannelId) -> Vec<u8> {
        self.channels.borrow()[channel.index()].writes.clone()
    }

    pub fn reads(&self, channel: ChannelId) -> u32 {
        self.channels.borrow()[channel.index()].reads
    }
}

impl VoltageSource for Bench {
    fn set_output(&mut self, code: u8, channel: ChannelId) {
        let mut channels = self.channels.borrow_mut();
        let bench = &mut channels[channel.index()];

        if bench.dropped_writes > 0 {
            bench.dropped_writes -= 1;
            return;
        }

        bench.output = code;
        bench.writes.push(code);
    }

    fn last_output(&self, channel: ChannelId) -> u8 {
        self.channels.borrow()[channel.index()].output
    }
}

impl CurrentReader for Bench {
    fn read_sample(&mut self, channel: ChannelId) -> u16 {
        let mut channels = self.channels.borrow_mut();
        let bench = &mut channels[channel.index()];
        bench.reads += 1;

        match bench.script.pop_front() {
            Some(sample) => sample,
            None => (bench.model)(bench.output),
        }
    }
}

pub struct MockTemperature(pub u16);

impl TemperatureReader for MockTemperature {
    fn read_raw(&mut self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorCall {
    Timing(u32, u32),
    Constant,
    Blinks(u16),
    Off,
}

#[derive(Default)]
pub struct MockIndicator {
    pub calls: Vec<IndicatorCall>,
    pub ticks: u32,
}

impl MockIndicator {
    pub fn last_blinks(&self) -> Option<u16> {
        self.calls.iter().rev().find_map(|call| match call {
            IndicatorCall::Blinks(n) => Some(*n),
            _ => None,
        })
    }
}

impl Indicator for MockIndicator {
    fn set_timing(&mut self, on_ms: u32, off_ms: u32) {
        self.calls.push(IndicatorCall::Timing(on_ms, off_ms));
    }

    fn blink_constant(&mut self) {
        self.calls.push(IndicatorCall::Constant);
    }

    fn blink_n_times(&mut self, n: u16) {
        self.calls.push(IndicatorCall::Blinks(n));
    }

    fn off(&mut self) {
        self.calls.push(IndicatorCall::Off);
    }

    fn tick(&mut self, _now_ms: u32) {
        self.ticks += 1;
    }
}

/// Clock, bench and the list of states visited after each tick.
pub struct Rig {
    pub clock: MockClock,
    pub bench: Bench,
    source: Bench,
    reader: Bench,
    pub visited: Vec<State>,
}

impl Rig {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(start: u32) -> Self {
        let bench = Bench::new();

        Self {
            clock: MockClock::new(start),
            source: bench.clone(),
            reader: bench.clone(),
            bench,
            visited: Vec::new(),
        }
    }

    pub fn channel(&self, id: ChannelId, config: TrackerConfig) -> Channel<MockIndicator> {
        Channel::new(id, config, MockIndicator::default())
    }

    pub fn tick(&mut self, channel: &mut Channel<MockIndicator>) {
        self.tick_by(channel, TICK_MS);
    }

    pub fn tick_by(&mut self, channel: &mut Channel<MockIndicator>, ms: u32) {
        self.clock.advance(ms);
        channel.tick(&self.clock, &mut self.source, &mut self.reader);
        self.visited.push(channel.state());
    }

    /// Ticks until `done` holds, giving up after `max_ticks`.
    pub fn run_until<F>(
        &mut self,
        channel: &mut Channel<MockIndicator>,
        max_ticks: usize,
        done: F,
    ) -> bool
    where
        F: Fn(&Channel<MockIndicator>) -> bool,
    {
        for _ in 0..max_ticks {
            self.tick(channel);

            if done(channel) {
                return true;
            }
        }

        false
    }

    /// Runs initialise and the full scan, leaving the channel in `TrackingDelay`.
    pub fn scan_to_tracking(&mut self, channel: &mut Channel<MockIndicator>) {
        let reached = self.run_until(channel, 5_000, |c| c.state() == State::TrackingDelay);
        assert!(reached, "scan did not finish, stuck in {:?}", channel.state());
    }

    /// Ticks the source and reader of a dual tracker.
    pub fn tick_tracker(&mut self, tracker: &mut pv_mppt::DualChannelTracker<MockIndicator>) {
        self.clock.advance(TICK_MS);
        tracker.tick(&self.clock, &mut self.source, &mut self.reader);
    }
}
