//! Mid-tier role: ingests `SENSOR` frames into per-source windows, runs the
//! slope detector, and emits `OPEN_VALVE` commands (§4.5). In Deep-LPM it
//! instead forwards the frame upstream verbatim (§4.3). Grounded on
//! `no_energised/computation-node.c` and `energised/e-computation-node.c`.

use std::time::Duration;

use crate::config::{Dialect, ENERGY_TICK_INTERVAL, SLOPE_OPEN_THRESHOLD};
use crate::energy::EnergyModel;
use crate::frame::Frame;
use crate::ports::EnergySource;
use crate::rng::NodeRng;
use crate::window::SensorWindows;

use super::event::{Effect, NodeEvent, NodeId, TimerKind};
use super::{forward_sensor_frame, Common};

pub struct ComputationNode {
    common: Common,
    energy: Option<EnergyModel>,
    windows: SensorWindows,
}

impl ComputationNode {
    pub fn new(id: NodeId, dialect: Dialect, energy_source: &dyn EnergySource) -> Self {
        let energy = dialect.is_energised().then(|| EnergyModel::new(energy_source));
        ComputationNode {
            common: Common::new(id, dialect),
            energy,
            windows: SensorWindows::new(!dialect.is_energised()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.common.id
    }

    pub fn power_state(&self) -> crate::power::PowerState {
        self.common.power
    }

    pub fn rank(&self) -> u16 {
        self.common.tree.rank
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.common.tree.parent
    }

    fn battery(&self) -> f64 {
        self.energy.as_ref().map(EnergyModel::battery).unwrap_or(0.0)
    }

    pub fn on_start(&mut self, rng: &mut dyn NodeRng) -> Vec<Effect> {
        let mut effects = vec![self.common.arm_initial_hello(rng)];
        if self.common.dialect.is_energised() {
            effects.push(Effect::ArmTimer { timer: TimerKind::Energy, after: ENERGY_TICK_INTERVAL });
        }
        effects
    }

    pub fn handle(
        &mut self,
        now: Duration,
        event: NodeEvent,
        _rng: &mut dyn NodeRng,
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
                    format!("TREE : Node {}: broadcast rank {}\n", self.common.id, self.common.tree.rank)
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
            NodeEvent::TimerFired(TimerKind::Sensor | TimerKind::Valve) => {}
            NodeEvent::FrameReceived { src, bytes } => self.on_frame(src, &bytes, now, &mut effects),
            NodeEvent::SerialLine(_) => {}
        }
        effects
    }

    fn on_frame(&mut self, src: NodeId, bytes: &[u8], now: Duration, effects: &mut Vec<Effect>) {
        let Ok(frame) = Frame::decode(self.common.dialect, bytes) else { return };
        match frame {
            Frame::Hello { rank, energy } => self.common.on_hello(src, rank, energy, effects),
            Frame::Sensor { source_id, value } => self.on_sensor(source_id, value, now, effects),
            Frame::Command { .. } => {}
        }
    }

    fn on_sensor(&mut self, source_id: NodeId, value: u16, now: Duration, effects: &mut Vec<Effect>) {
        if self.common.is_deep_lpm() {
            let Some(parent) = self.common.tree.parent else { return };
            effects.push(forward_sensor_frame(self.common.dialect, source_id, value, parent));
            if let Some(model) = &mut self.energy {
                model.debit_forward_sensor();
            }
            effects.push(Effect::Log(format!(
                "PROCESS : Node {}: forward sensor {} to {}\n",
                self.common.id, source_id, parent
            )));
            return;
        }

        let Some(window) = self.windows.append(source_id, value, now) else { return };
        if !window.is_full() {
            return;
        }
        let slope = window.slope();
        let slope_line = if self.common.dialect.is_energised() {
            format!("PROCESS : Node {}: slope={:.2} sensor={}\n", self.common.id, slope, source_id)
        } else {
            format!("PROCESS : Node {}: slope={:.2} for sensor {}\n", self.common.id, slope, source_id)
        };
        effects.push(Effect::Log(slope_line));

        if slope > SLOPE_OPEN_THRESHOLD {
            let command = Frame::Command { target_id: source_id, code: 1 };
            effects.push(Effect::Unicast { dst: source_id, bytes: command.encode(self.common.dialect) });
            if let Some(model) = &mut self.energy {
                model.debit_send_command();
            }
            let command_line = if self.common.dialect.is_energised() {
                format!("PROCESS : Node {}: OPEN_VALVE \u{2192} {}\n", self.common.id, source_id)
            } else {
                format!("PROCESS : Node {}: send OPEN_VALVE to {}\n", self.common.id, source_id)
            };
            effects.push(Effect::Log(command_line));
        }
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

    fn feed(node: &mut ComputationNode, sid: u8, value: u16, at: u64) -> Vec<Effect> {
        let mut rng = SeededRng::from_seed(1);
        let frame = Frame::Sensor { source_id: sid, value };
        let bytes = frame.encode(node.common.dialect);
        node.handle(
            Duration::from_secs(at),
            NodeEvent::FrameReceived { src: sid, bytes },
            &mut rng,
            &ZeroSource,
        )
    }

    #[test]
    fn rising_trend_triggers_open_valve_command() {
        let mut node = ComputationNode::new(2, Dialect::EnergyUnaware, &ZeroSource);
        let mut effects = Vec::new();
        for k in 0..30u16 {
            effects = feed(&mut node, 7, k, k as u64);
        }
        let command = Frame::Command { target_id: 7, code: 1 }.encode(Dialect::EnergyUnaware);
        assert!(effects.contains(&Effect::Unicast { dst: 7, bytes: command }));
    }

    #[test]
    fn flat_readings_never_trigger_a_command() {
        let mut node = ComputationNode::new(2, Dialect::EnergyUnaware, &ZeroSource);
        let mut effects = Vec::new();
        for k in 0..30u16 {
            effects = feed(&mut node, 7, 50, k as u64);
        }
        assert!(effects.iter().all(|e| !matches!(e, Effect::Unicast { .. })));
    }

    #[test]
    fn deep_lpm_forwards_without_touching_windows() {
        let mut node = ComputationNode::new(2, Dialect::Energised, &ZeroSource);
        node.common.power = crate::power::PowerState::DeepLpm;
        node.common.tree.on_hello(1, 0, Some(100.0));
        let effects = feed(&mut node, 7, 42, 0);
        let fwd = Frame::Sensor { source_id: 7, value: 42 }.encode(Dialect::Energised);
        assert!(effects.contains(&Effect::Unicast { dst: 1, bytes: fwd }));
        assert_eq!(node.windows.occupied_count(), 0);
    }
}
