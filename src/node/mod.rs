//! The sans-IO control-plane core. Each role (`border`, `computation`,
//! `sensor`) is a plain struct whose only public entry point is
//! `handle(now, event, rng, energy_source) -> Vec<Effect>` — no thread, no
//! channel, no real clock. `Common` holds the ~70% of per-node state and
//! behavior the three roles share (§2): rank/parent, beaconing, and, on the
//! energised dialect, the battery and power state.

pub mod border;
pub mod computation;
pub mod event;
pub mod sensor;

use std::time::Duration;

use crate::config::{Dialect, BORDER_NODE_ID, HELLO_INTERVAL_OTHER, HELLO_INTERVAL_ROOT};
use crate::energy::EnergyModel;
use crate::frame::{battery_to_wire, Frame};
use crate::ports::EnergySource;
use crate::power::PowerState;
use crate::rng::NodeRng;
use crate::tree::TreeState;

use event::{Effect, NodeId, TimerKind};

/// State and behavior shared by every role.
#[derive(Debug, Clone)]
pub struct Common {
    pub id: NodeId,
    pub dialect: Dialect,
    pub tree: TreeState,
    pub power: PowerState,
}

impl Common {
    pub fn new(id: NodeId, dialect: Dialect) -> Self {
        let tree = if id == BORDER_NODE_ID { TreeState::root() } else { TreeState::unjoined() };
        Common { id, dialect, tree, power: PowerState::Active }
    }

    pub fn is_root(&self) -> bool {
        self.id == BORDER_NODE_ID
    }

    fn hello_interval(&self) -> Duration {
        if self.is_root() { HELLO_INTERVAL_ROOT } else { HELLO_INTERVAL_OTHER }
    }

    /// Effect that arms the very first HELLO timer at a uniform random
    /// offset in `[0, HELLO_INTERVAL)` (§4.4).
    pub fn arm_initial_hello(&self, rng: &mut dyn NodeRng) -> Effect {
        let bound_ms = self.hello_interval().as_millis() as u64;
        Effect::ArmTimer {
            timer: TimerKind::Hello,
            after: Duration::from_millis(rng.jitter(bound_ms)),
        }
    }

    fn rearm_hello(&self) -> Effect {
        Effect::ArmTimer { timer: TimerKind::Hello, after: self.hello_interval() }
    }

    /// Builds and broadcasts this tick's HELLO (§4.4) and re-arms the
    /// timer. The log line is the one piece of HELLO handling that is
    /// *not* shared: the energy-unaware sensor role logs `"HELLO Node"`
    /// where computation/border log `"Node ...: broadcast"` (ground truth:
    /// `no_energised/sensor-node.c` vs `no_energised/{computation,border}-node.c`),
    /// so callers append their own [`Effect::Log`] after this call.
    pub fn send_hello(&self, battery: f64, effects: &mut Vec<Effect>) {
        let energy_field = if self.dialect.is_energised() {
            Some((battery_to_wire(battery), self.power))
        } else {
            None
        };
        let frame = Frame::Hello { rank: self.tree.rank, energy: energy_field };
        effects.push(Effect::Broadcast(frame.encode(self.dialect)));
        effects.push(self.rearm_hello());
    }

    pub fn format_hello_sent_energised(&self, battery: f64) -> String {
        format!(
            "TREE : Node {}: HELLO rank={} bat={} state={}\n",
            self.id,
            self.tree.rank,
            battery_to_wire(battery),
            self.power.to_wire()
        )
    }

    /// Applies a received HELLO to the rank/parent state, logging a
    /// `TREE : ... new parent ->` line on any change (§4.4).
    pub fn on_hello(&mut self, src: NodeId, rank: u16, energy: Option<(u8, PowerState)>, effects: &mut Vec<Effect>) {
        let recv_energy = energy.map(|(battery, _)| battery as f64);
        if self.tree.on_hello(src, rank, recv_energy) {
            let line = if self.dialect.is_energised() {
                format!(
                    "TREE : Node {}: new parent -> {} (rank={}, bat={})\n",
                    self.id,
                    src,
                    self.tree.rank,
                    recv_energy.unwrap_or(0.0) as u8
                )
            } else {
                format!("TREE : Node {}: new parent -> {} (rank {})\n", self.id, src, self.tree.rank)
            };
            effects.push(Effect::Log(line));
        }
    }

    /// Runs the once-per-second energy tick: debit, recharge, power-state
    /// transition, and a `MODE` log line on any state change (§4.2, §4.3).
    /// A no-op on the energy-unaware dialect.
    pub fn energy_tick(
        &mut self,
        model: &mut EnergyModel,
        source: &dyn EnergySource,
        effects: &mut Vec<Effect>,
    ) {
        if !self.dialect.is_energised() {
            return;
        }
        let battery = model.tick(source, self.power);
        let next = self.power.step(battery);
        if next != self.power {
            self.power = next;
            let line = match next {
                PowerState::Lpm => format!("MODE : Node {}: LPM, battery={:.1}%\n", self.id, battery),
                PowerState::DeepLpm => {
                    format!("MODE : Node {}: DEEP LPM, battery={:.1}%\n", self.id, battery)
                }
                PowerState::Active => format!("MODE : Node {}: WAKE, battery={:.1}%\n", self.id, battery),
            };
            effects.push(Effect::Log(line));
        }
    }

    pub fn is_deep_lpm(&self) -> bool {
        self.power == PowerState::DeepLpm
    }
}

/// Helper shared by `computation` and `border`: both roles forward a
/// decoded `SENSOR` frame upstream verbatim on certain conditions.
pub fn forward_sensor_frame(dialect: Dialect, source_id: NodeId, value: u16, parent: NodeId) -> Effect {
    let frame = Frame::Sensor { source_id, value };
    Effect::Unicast { dst: parent, bytes: frame.encode(dialect) }
}
