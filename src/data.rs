/// One of the three operating points a channel measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Point {
    /// Point currently being swept during the IV scan
    Scan,
    /// Operating point being tracked
    This,
    /// Neighbouring point at `v_this + dv_mppt`
    Next,
}

/// Running numeric state of one channel.
///
/// Voltages are DAC codes, currents ADC codes and powers their product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementData {
    pub v_scan: u8,
    pub i_scan: u16,
    pub p_scan: u32,

    pub v_this: u8,
    pub i_this: u16,
    pub p_this: u32,

    pub v_next: u8,
    pub i_next: u16,
    pub p_next: u32,

    pub v_scan_mpp: u8,
    pub i_scan_mpp: u16,
    pub p_scan_mpp: u32,
    pub p_scan_initial: u32,
    pub p_scan_final: u32,

    pub i_sample_sum: u32,
    pub n_samples: u16,

    pub this_done: bool,
    pub next_done: bool,
}

impl MeasurementData {
    pub fn voltage(&self, point: Point) -> u8 {
        match point {
            Point::Scan => self.v_scan,
            Point::This => self.v_this,
            Point::Next => self.v_next,
        }
    }

    pub fn current(&self, point: Point) -> u16 {
        match point {
            Point::Scan => self.i_scan,
            Point::This => self.i_this,
            Point::Next => self.i_next,
        }
    }

    pub fn power(&self, point: Point) -> u32 {
        match point {
            Point::Scan => self.p_scan,
            Point::This => self.p_this,
            Point::Next => self.p_next,
        }
    }

    /// Clears the sample aggregates ahead of a new settle phase.
    pub(crate) fn reset_samples(&mut self) {
        self.i_sample_sum = 0;
        self.n_samples = 0;
    }

    /// Adds one sample to the window and refreshes the running mean of `point`.
    ///
    /// Once `n_samples` saturates further samples are dropped so the sum
    /// cannot overflow.
    pub(crate) fn add_sample(&mut self, point: Point, sample: u16) {
        if self.n_samples == u16::MAX {
            return;
        }

        self.i_sample_sum += u32::from(sample);
        self.n_samples += 1;
        *self.current_mut(point) = self.mean_current();
    }

    /// Stores the window average of `point` and its power.
    pub(crate) fn finalize(&mut self, point: Point) {
        let current = self.mean_current();
        let power = u32::from(self.voltage(point)) * u32::from(current);

        *self.current_mut(point) = current;
        *self.power_mut(point) = power;
    }

    fn mean_current(&self) -> u16 {
        if self.n_samples == 0 {
            return 0;
        }

        // the mean of u16 samples always fits in a u16
        (self.i_sample_sum / u32::from(self.n_samples)) as u16
    }

    fn current_mut(&mut self, point: Point) -> &mut u16 {
        match point {
            Point::Scan => &mut self.i_scan,
            Point::This => &mut self.i_this,
            Point::Next => &mut self.i_next,
        }
    }

    fn power_mut(&mut self, point: Point) -> &mut u32 {
        match point {
            Point::Scan => &mut self.p_scan,
            Point::This => &mut self.p_this,
            Point::Next => &mut self.p_next,
        }
    }
}
