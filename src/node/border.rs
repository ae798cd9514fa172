//! Root/gateway role (§4.5 "Root", §4.6 "Root ingress"). Pinned at
//! `rank = 0`, never adopts a parent (see [`crate::tree`]); prints incoming
//! sensor readings to serial and turns serial command lines into unicast
//! `COMMAND` frames. Grounded on `no_energised/border-router.c` and
//! `energised/e-border-router.c`.

use std::time::Duration;

use crate::config::{Dialect, ENERGY_TICK_INTERVAL};
use crate::energy::EnergyModel;
use crate::error::SerialCommandError;
use crate::frame::Frame;
use crate::ports::EnergySource;
use crate::rng::NodeRng;

use super::event::{Effect, NodeEvent, NodeId, TimerKind};
use super::Common;

pub struct BorderNode {
    common: Common,
    energy: Option<EnergyModel>,
}

impl BorderNode {
    pub fn new(id: NodeId, dialect: Dialect, energy_source: &dyn EnergySource) -> Self {
        let energy = dialect.is_energised().then(|| EnergyModel::new(energy_source));
        BorderNode { common: Common::new(id, dialect), energy }
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
        _now: Duration,
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
            NodeEvent::FrameReceived { src, bytes } => self.on_frame(src, &bytes, &mut effects),
            NodeEvent::SerialLine(line) => self.on_serial_line(&line, &mut effects),
        }
        effects
    }

    fn on_frame(&mut self, src: NodeId, bytes: &[u8], effects: &mut Vec<Effect>) {
        let Ok(frame) = Frame::decode(self.common.dialect, bytes) else { return };
        match frame {
            Frame::Hello { rank, energy } => self.common.on_hello(src, rank, energy, effects),
            Frame::Sensor { source_id, value } => {
                effects.push(Effect::Log(format!(
                    "PROCESS : Server got ID={}, value={}\n",
                    source_id, value
                )));
            }
            Frame::Command { .. } => {}
        }
    }

    /// Parses `"<type:u8> <node:u8> <code:u16>"` and unicasts the resulting
    /// `COMMAND` frame (§4.6, §6). Malformed lines are silently dropped.
    fn on_serial_line(&mut self, line: &str, effects: &mut Vec<Effect>) {
        let Ok((command_type, node, code)) = parse_command_line(line) else { return };
        let frame = Frame::Command { target_id: node, code };
        effects.push(Effect::Unicast { dst: node, bytes: frame.encode(self.common.dialect) });
        if let Some(model) = &mut self.energy {
            model.debit_send_command();
        }
        let log_line = if self.common.dialect.is_energised() {
            format!("BORDER: Sent cmd type={} to {}\n", command_type, node)
        } else {
            format!("BORDER: Sent cmd type={} to {} (code={})\n", command_type, node, code)
        };
        effects.push(Effect::Log(log_line));
    }
}

fn parse_command_line(line: &str) -> Result<(u8, u8, u16), SerialCommandError> {
    let mut fields = line.split_whitespace();
    let (Some(t), Some(n), Some(c), None) = (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(SerialCommandError::Malformed(line.to_string()));
    };
    let command_type: u8 = t.parse().map_err(|_| SerialCommandError::OutOfRange)?;
    let node: u8 = n.parse().map_err(|_| SerialCommandError::OutOfRange)?;
    let code: u16 = c.parse().map_err(|_| SerialCommandError::OutOfRange)?;
    Ok((command_type, node, code))
}
