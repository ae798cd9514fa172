//! Port traits — the boundary between the sans-IO control-plane core
//! (`crate::node`) and everything §1 calls "out of scope": the radio
//! driver, the timer/clock source, the energy-measurement source
//! ("energest"), the LED driver, and the serial line to the PC.
//!
//! The core never touches a thread, a channel, or `Instant` directly; it
//! only emits [`crate::node::event::Effect`] values naming what it *wants*
//! done. An adapter — [`crate::sim::network`] (virtual time) or
//! [`crate::sim::live`] (real threads) — is the thing that actually owns a
//! radio, a clock, and energest counters and turns effects into action.
//!
//! This module still names the interfaces a real embedded port would
//! implement, for two reasons: it documents the external contract precisely
//! (§6), and [`EnergySource`] is consumed directly by [`crate::energy`],
//! which is domain logic, not an adapter.

/// External energy-measurement source ("energest", §4.2, §6). Cumulative
/// activity-time counters in clock ticks; must be flushed (by the caller's
/// platform) before being read here.
pub trait EnergySource {
    /// Ticks of CPU-active time accumulated so far.
    fn cpu_ticks(&self) -> u32;
    /// Ticks of low-power-mode time accumulated so far.
    fn lpm_ticks(&self) -> u32;
    /// Ticks of radio-transmit time accumulated so far.
    fn tx_ticks(&self) -> u32;
    /// Ticks of radio-receive time accumulated so far.
    fn rx_ticks(&self) -> u32;
    /// Platform clock rate, ticks per second.
    fn ticks_per_second(&self) -> u32;
}

/// Red LED, the only actuation indicator named in §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Red,
}
