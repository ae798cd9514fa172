//! Leaf role: samples readings and reacts to `COMMAND` (§4.5, §4.6).
//! Grounded on `no_energised/sensor-node.c` and `energised/e-sensor-node.c`.

use std::time::Duration;

use crate::config::{Dialect, ENERGY_TICK_INTERVAL, SENSOR_INTERVAL, VALVE_DURATION};
use crate::energy::EnergyModel;
use crate::frame::Frame;
use crate::ports::EnergySource;
use crate::rng::NodeRng;
use crate::valve::Valve;

use super::event::{Effect, NodeEvent, NodeId, TimerKind};
use super::Common;

pub struct SensorNode {
    common: Common,
    energy: Option<EnergyModel>,
    valve: Valve,
    sensor_timer_armed: bool,
}

impl SensorNode {
    pub fn new(id: NodeId, dialect: Dialect, energy_source: &dyn EnergySource) -> Self {
        let energy = dialect.is_energised().then(|| EnergyModel::new(energy_source));
        SensorNode {
            common: Common::new(id, dialect),
            energy,
            valve: Valve::new(),
            sensor_timer_armed: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.common.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.common.tree.parent
    }

    pub fn rank(&self) -> u16 {
        self.common.tree.rank
    }

    pub fn valve_open(&self) -> bool {
        self.valve.is_open()
    }

    pub fn power_state(&self) -> crate::power::PowerState {
        self.common.power
    }

    fn battery(&self) -> f64 {
        self.energy.as_ref().map(EnergyModel::battery).unwrap_or(0.0)
    }

    /// Effects to run once before any event arrives: arm the jittered
    /// initial HELLO, and, on the energised dialect, the energy tick.
    pub fn on_start(&mut self, rng: &mut dyn NodeRng) -> Vec<Effect> {
        let mut effects = vec![self.common.arm_initial_hello(rng)];
        if self.common.dialect.is_energised() {
            effects.push(Effect::ArmTimer { timer: TimerKind::Energy, after: ENERGY_TICK_INTERVAL });
        }
        effects
    }

    pub fn handle(
        &mut self,
        _now: Duration,
        event: NodeEvent,
        rng: &mut dyn NodeRng,
        energy_source: &dyn EnergySource,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            NodeEvent::TimerFired(TimerKind::Hello) => {
                let battery = self.battery();
                self.common.send_hello(battery, &mut effects);
                let line = if self.common.dialect.is_energised() {
                    self.common.format_hello_sent_energised(battery)
                } else {
                    format!("TREE : HELLO Node {}: broadcast rank {}\n", self.common.id, self.common.tree.rank)
                };
                effects.push(Effect::Log(line));
                if let Some(model) = &mut self.energy {
                    model.debit_hello();
                }
            }
            NodeEvent::TimerFired(TimerKind::Energy) => {
                if let Some(model) = &mut self.energy {
                    self.common.energy_tick(model, energy_source, &mut effects);
                }
                effects.push(Effect::ArmTimer { timer: TimerKind::Energy, after: ENERGY_TICK_INTERVAL });
            }
            NodeEvent::TimerFired(TimerKind::Sensor) => self.on_sensor_tick(rng, &mut effects),
            NodeEvent::TimerFired(TimerKind::Valve) => {
                self.valve.close();
                effects.push(Effect::LedOff);
                effects.push(Effect::Log(format!("PROCESS : Node {}: valve CLOSED\n", self.common.id)));
            }
            NodeEvent::FrameReceived { src, bytes } => self.on_frame(src, &bytes, &mut effects),
            NodeEvent::SerialLine(_) => {}
        }
        effects
    }

    fn on_frame(&mut self, src: NodeId, bytes: &[u8], effects: &mut Vec<Effect>) {
        let Ok(frame) = Frame::decode(self.common.dialect, bytes) else { return };
        match frame {
            Frame::Hello { rank, energy } => {
                let was_joined = self.common.tree.is_joined();
                self.common.on_hello(src, rank, energy, effects);
                if !was_joined && !self.sensor_timer_armed && self.common.tree.is_joined() {
                    self.sensor_timer_armed = true;
                    effects.push(Effect::ArmTimer { timer: TimerKind::Sensor, after: SENSOR_INTERVAL });
                }
            }
            Frame::Command { target_id, .. } if target_id == self.common.id => {
                if let Some(model) = &mut self.energy {
                    model.debit_receive_open_valve();
                }
                self.valve.receive_command();
                effects.push(Effect::LedOn);
                effects.push(Effect::ArmTimer { timer: TimerKind::Valve, after: VALVE_DURATION });
                effects.push(Effect::Log(format!("PROCESS : Node {}: valve OPEN\n", self.common.id)));
            }
            Frame::Command { .. } | Frame::Sensor { .. } => {}
        }
    }

    fn on_sensor_tick(&mut self, rng: &mut dyn NodeRng, effects: &mut Vec<Effect>) {
        effects.push(Effect::ArmTimer { timer: TimerKind::Sensor, after: SENSOR_INTERVAL });
        if self.common.is_deep_lpm() {
            effects.push(Effect::Log(format!(
                "DLPM   : Node {}: in DEEP LPM, skipping sensor send\n",
                self.common.id
            )));
            return;
        }
        let Some(parent) = self.common.tree.parent else { return };
        let value = rng.sensor_reading() as u16;
        let frame = Frame::Sensor { source_id: self.common.id, value };
        effects.push(Effect::Unicast { dst: parent, bytes: frame.encode(self.common.dialect) });
        if let Some(model) = &mut self.energy {
            model.debit_sensor_send();
        }
        effects.push(Effect::Log(format!(
            "PROCESS : Node {}: send reading {} to {}\n",
            self.common.id, value, parent
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;

    struct ZeroSource;
    impl EnergySource for ZeroSource {
        fn cpu_ticks(&self) -> u32 {
            0
        }
        fn lpm_ticks(&self) -> u32 {
            0
        }
        fn tx_ticks(&self) -> u32 {
            0
        }
        fn rx_ticks(&self) -> u32 {
            0
        }
        fn ticks_per_second(&self) -> u32 {
            1
        }
    }

    #[test]
    fn deep_lpm_sensor_emits_no_sensor_frames() {
        let mut node = SensorNode::new(7, Dialect::Energised, &ZeroSource);
        node.common.tree.on_hello(1, 0, Some(100.0));
        node.common.power = crate::power::PowerState::DeepLpm;
        let mut rng = SeededRng::from_seed(1);
        let effects = node.handle(Duration::ZERO, NodeEvent::TimerFired(TimerKind::Sensor), &mut rng, &ZeroSource);
        assert!(effects.iter().all(|e| !matches!(e, Effect::Unicast { .. })));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Log(line) if line.starts_with("DLPM"))));
    }

    #[test]
    fn valve_opens_on_command_and_closes_on_timer() {
        let mut node = SensorNode::new(7, Dialect::EnergyUnaware, &ZeroSource);
        let mut rng = SeededRng::from_seed(1);
        let frame = Frame::Command { target_id: 7, code: 1 };
        let bytes = frame.encode(Dialect::EnergyUnaware);
        let effects = node.handle(
            Duration::ZERO,
            NodeEvent::FrameReceived { src: 3, bytes },
            &mut rng,
            &ZeroSource,
        );
        assert!(node.valve_open());
        assert!(effects.contains(&Effect::LedOn));
        let effects = node.handle(Duration::ZERO, NodeEvent::TimerFired(TimerKind::Valve), &mut rng, &ZeroSource);
        assert!(!node.valve_open());
        assert!(effects.contains(&Effect::LedOff));
    }

    #[test]
    fn sensor_timer_arms_only_after_first_join() {
        let mut node = SensorNode::new(7, Dialect::EnergyUnaware, &ZeroSource);
        let mut rng = SeededRng::from_seed(1);
        let hello = Frame::Hello { rank: 0, energy: None }.encode(Dialect::EnergyUnaware);
        let effects = node.handle(
            Duration::ZERO,
            NodeEvent::FrameReceived { src: 1, bytes: hello },
            &mut rng,
            &ZeroSource,
        );
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ArmTimer { timer: TimerKind::Sensor, .. })));
    }
}
