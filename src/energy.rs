//! Energy model (§4.2, energised variant only). Converts activity-time
//! deltas from an external [`EnergySource`] into battery debits once per
//! energy tick, plus the event-driven debits listed in §4.2, and recharges
//! the battery stepwise while asleep.

use crate::config::{
    BATTERY_MAX, COST_FORWARD_SENSOR, COST_HELLO, COST_RECEIVE_OPEN_VALVE, COST_SEND_COMMAND,
    COST_SENSOR_SEND, DEEP_LPM_RECHARGE_EVERY_TICKS, LPM_RECHARGE_EVERY_TICKS, RECHARGE_AMOUNT,
};
use crate::ports::EnergySource;
use crate::power::PowerState;

/// Per-tick activity-time costs, clock-ticks-per-second-normalised (§4.2).
const CPU_COST_PER_SEC: f64 = 0.2;
const LPM_COST_PER_SEC: f64 = 0.02;
const TX_COST_PER_SEC: f64 = 1.0;
const RX_COST_PER_SEC: f64 = 1.0;

pub struct EnergyModel {
    battery: f64,
    last_cpu: u32,
    last_lpm: u32,
    last_tx: u32,
    last_rx: u32,
    lpm_tick_count: u32,
    deep_tick_count: u32,
}

impl EnergyModel {
    pub fn new(source: &dyn EnergySource) -> Self {
        EnergyModel {
            battery: BATTERY_MAX,
            last_cpu: source.cpu_ticks(),
            last_lpm: source.lpm_ticks(),
            last_tx: source.tx_ticks(),
            last_rx: source.rx_ticks(),
            lpm_tick_count: 0,
            deep_tick_count: 0,
        }
    }

    pub fn battery(&self) -> f64 {
        self.battery
    }

    /// Debits activity-time deltas since the last tick, then applies the
    /// sleep-state recharge bonus for `state`. Returns the battery level
    /// after both adjustments; the caller evaluates [`PowerState::step`]
    /// against it separately.
    pub fn tick(&mut self, source: &dyn EnergySource, state: PowerState) -> f64 {
        let ticks_per_sec = source.ticks_per_second() as f64;
        let d_cpu = source.cpu_ticks().wrapping_sub(self.last_cpu);
        let d_lpm = source.lpm_ticks().wrapping_sub(self.last_lpm);
        let d_tx = source.tx_ticks().wrapping_sub(self.last_tx);
        let d_rx = source.rx_ticks().wrapping_sub(self.last_rx);
        self.last_cpu = source.cpu_ticks();
        self.last_lpm = source.lpm_ticks();
        self.last_tx = source.tx_ticks();
        self.last_rx = source.rx_ticks();

        let debit = (d_cpu as f64 * CPU_COST_PER_SEC
            + d_lpm as f64 * LPM_COST_PER_SEC
            + d_tx as f64 * TX_COST_PER_SEC
            + d_rx as f64 * RX_COST_PER_SEC)
            / ticks_per_sec;
        self.battery -= debit;

        match state {
            PowerState::Lpm => {
                self.lpm_tick_count += 1;
                if self.lpm_tick_count >= LPM_RECHARGE_EVERY_TICKS {
                    self.recharge(RECHARGE_AMOUNT);
                    self.lpm_tick_count = 0;
                }
            }
            PowerState::DeepLpm => {
                self.deep_tick_count += 1;
                if self.deep_tick_count >= DEEP_LPM_RECHARGE_EVERY_TICKS {
                    self.recharge(RECHARGE_AMOUNT);
                    self.deep_tick_count = 0;
                }
            }
            PowerState::Active => {}
        }

        self.clamp();
        self.battery
    }

    pub fn debit_hello(&mut self) {
        self.battery -= COST_HELLO;
        self.clamp();
    }

    pub fn debit_forward_sensor(&mut self) {
        self.battery -= COST_FORWARD_SENSOR;
        self.clamp();
    }

    pub fn debit_send_command(&mut self) {
        self.battery -= COST_SEND_COMMAND;
        self.clamp();
    }

    pub fn debit_receive_open_valve(&mut self) {
        self.battery -= COST_RECEIVE_OPEN_VALVE;
        self.clamp();
    }

    pub fn debit_sensor_send(&mut self) {
        self.battery -= COST_SENSOR_SEND;
        self.clamp();
    }

    fn recharge(&mut self, amount: f64) {
        self.battery += amount;
    }

    /// Battery may reach 0 but never go negative (open question 4), and
    /// never exceeds `BATTERY_MAX`.
    fn clamp(&mut self) {
        self.battery = self.battery.clamp(0.0, BATTERY_MAX);
    }
}
