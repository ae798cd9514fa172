//! Power-state machine (§4.3, energised variant only). Evaluated once per
//! energy tick, after debit/recharge, with the first matching rule in this
//! list firing:
//!
//! 1. `Active ∧ battery ≤ 30.0` → `LPM`
//! 2. `LPM ∧ battery ≤ 10.0` → `Deep-LPM`
//! 3. `Deep-LPM ∧ battery ≥ 90.0` → `Active`
//!
//! There is deliberately no `LPM → Active` rule (open question 3) and no
//! direct `Active ↔ Deep-LPM` transition.

use crate::config::{ACTIVE_RESUME_AT, DEEP_LPM_ENTER_AT, LPM_ENTER_AT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerState {
    #[default]
    Active,
    Lpm,
    DeepLpm,
}

impl PowerState {
    pub fn to_wire(self) -> u8 {
        match self {
            PowerState::Active => 0,
            PowerState::Lpm => 1,
            PowerState::DeepLpm => 2,
        }
    }

    /// Any wire value other than 1 or 2 decodes to `Active`, matching the C
    /// source's plain `enum` cast (it never validates the byte either).
    pub fn from_wire(byte: u8) -> PowerState {
        match byte {
            1 => PowerState::Lpm,
            2 => PowerState::DeepLpm,
            _ => PowerState::Active,
        }
    }

    /// Applies the one rule that matches `battery`, if any. Returns the new
    /// state (unchanged if no rule fires).
    pub fn step(self, battery: f64) -> PowerState {
        match self {
            PowerState::Active if battery <= LPM_ENTER_AT => PowerState::Lpm,
            PowerState::Lpm if battery <= DEEP_LPM_ENTER_AT => PowerState::DeepLpm,
            PowerState::DeepLpm if battery >= ACTIVE_RESUME_AT => PowerState::Active,
            other => other,
        }
    }
}
