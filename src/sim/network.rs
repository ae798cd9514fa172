//! Deterministic virtual-time discrete-event network (§5, §8). A
//! `BinaryHeap` of scheduled events drives every node's `handle()`; there is
//! no real thread and no real clock, so a 600 s valve duration or a
//! 3·HELLO_INTERVAL convergence window (§8 S1) runs in a few heap pops
//! instead of real wall-clock time.
//!
//! Event dispatch honors the priority order named in §5 ("serial line,
//! energy timer, HELLO timer, sensor timer, valve timer") whenever two
//! events land at the exact same virtual instant for the same node. Frame
//! arrival is not ranked in that list (it is described separately, as an
//! asynchronous callback); this simulator places it after the four named
//! timers, which is an implementation choice, not a spec requirement.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Duration;

use crate::config::Dialect;
use crate::node::event::{Effect, NodeEvent, NodeId, TimerKind};
use crate::rng::NodeRng;

use super::{NodeHandle, Role, SimEnergySource};

fn event_priority(event: &NodeEvent) -> u8 {
    match event {
        NodeEvent::SerialLine(_) => 0,
        NodeEvent::TimerFired(TimerKind::Energy) => 1,
        NodeEvent::TimerFired(TimerKind::Hello) => 2,
        NodeEvent::TimerFired(TimerKind::Sensor) => 3,
        NodeEvent::TimerFired(TimerKind::Valve) => 4,
        NodeEvent::FrameReceived { .. } => 5,
    }
}

struct Scheduled {
    time: Duration,
    priority: u8,
    seq: u64,
    node: NodeId,
    event: NodeEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.time, self.priority, self.seq) == (other.time, other.priority, other.seq)
    }
}
impl Eq for Scheduled {}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest event first.
        (other.time, other.priority, other.seq).cmp(&(self.time, self.priority, self.seq))
    }
}
impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A symmetric radio-reachability graph plus the sans-IO nodes it connects.
pub struct Network {
    dialect: Dialect,
    nodes: HashMap<NodeId, NodeHandle>,
    adjacency: HashMap<NodeId, HashSet<NodeId>>,
    energy_sources: HashMap<NodeId, SimEnergySource>,
    tx_since_tick: HashMap<NodeId, u32>,
    rx_since_tick: HashMap<NodeId, u32>,
    rng: Box<dyn NodeRng>,
    queue: BinaryHeap<Scheduled>,
    seq: u64,
    now: Duration,
    log: Vec<(NodeId, String)>,
    led_on: HashSet<NodeId>,
}

impl Network {
    pub fn new(dialect: Dialect, rng: Box<dyn NodeRng>) -> Self {
        Network {
            dialect,
            nodes: HashMap::new(),
            adjacency: HashMap::new(),
            energy_sources: HashMap::new(),
            tx_since_tick: HashMap::new(),
            rx_since_tick: HashMap::new(),
            rng,
            queue: BinaryHeap::new(),
            seq: 0,
            now: Duration::ZERO,
            log: Vec::new(),
            led_on: HashSet::new(),
        }
    }

    pub fn add_node(&mut self, id: NodeId, role: Role) {
        let source = SimEnergySource::new();
        let handle = NodeHandle::new(id, role, self.dialect, &source);
        self.nodes.insert(id, handle);
        self.energy_sources.insert(id, source);
        self.adjacency.entry(id).or_default();
    }

    /// Radio reachability is modeled as symmetric: if `a` can hear `b`,
    /// `b` can hear `a` (§8 S1's "out of range" pairs are simply absent
    /// edges).
    pub fn link(&mut self, a: NodeId, b: NodeId) {
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    pub fn node(&self, id: NodeId) -> &NodeHandle {
        self.nodes.get(&id).expect("unknown node id")
    }

    pub fn led_is_on(&self, id: NodeId) -> bool {
        self.led_on.contains(&id)
    }

    pub fn logs(&self) -> &[(NodeId, String)] {
        &self.log
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Runs every node's `on_start`, scheduling the jittered initial HELLO
    /// (and, on the energised dialect, the first energy tick) for each.
    pub fn start(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            let effects = {
                let node = self.nodes.get_mut(&id).unwrap();
                node.on_start(&mut *self.rng)
            };
            self.apply_effects(id, effects);
        }
    }

    /// A line arriving on the root's serial port at virtual time `at`.
    pub fn inject_serial_line(&mut self, at: Duration, border_id: NodeId, line: impl Into<String>) {
        self.requeue_for(border_id, at, event_priority(&NodeEvent::SerialLine(String::new())), NodeEvent::SerialLine(line.into()));
    }

    /// Delivers an already-encoded frame to `dst` at virtual time `at`,
    /// bypassing adjacency and any sender's own timers. Lets tests drive a
    /// node with an exact, deterministic sequence of inbound frames instead
    /// of waiting on randomized sensor readings.
    pub fn inject_frame(&mut self, at: Duration, src: NodeId, dst: NodeId, bytes: Vec<u8>) {
        self.requeue_for(dst, at, 5, NodeEvent::FrameReceived { src, bytes });
    }

    pub fn run_for(&mut self, duration: Duration) {
        let deadline = self.now + duration;
        self.run_until(deadline);
    }

    pub fn run_until(&mut self, deadline: Duration) {
        while let Some(top) = self.queue.peek() {
            if top.time > deadline {
                break;
            }
            let Scheduled { time, node, event, .. } = self.queue.pop().unwrap();
            self.now = time;
            self.dispatch(node, event);
        }
        self.now = deadline;
    }

    fn dispatch(&mut self, id: NodeId, event: NodeEvent) {
        if !self.nodes.contains_key(&id) {
            return;
        }

        if matches!(event, NodeEvent::TimerFired(TimerKind::Energy)) {
            let power = self.nodes[&id].power_state();
            let sent = self.tx_since_tick.remove(&id).unwrap_or(0);
            let recv = self.rx_since_tick.remove(&id).unwrap_or(0);
            self.energy_sources.get_mut(&id).unwrap().advance(power, sent, recv);
        }

        let effects = {
            let node = self.nodes.get_mut(&id).unwrap();
            let source = self.energy_sources.get(&id).unwrap();
            node.handle(self.now, event, &mut *self.rng, source)
        };
        self.apply_effects(id, effects);
    }

    fn apply_effects(&mut self, id: NodeId, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast(bytes) => {
                    *self.tx_since_tick.entry(id).or_insert(0) += 1;
                    let neighbors: Vec<NodeId> =
                        self.adjacency.get(&id).into_iter().flatten().copied().collect();
                    for dst in neighbors {
                        *self.rx_since_tick.entry(dst).or_insert(0) += 1;
                        self.requeue_for(dst, self.now, 5, NodeEvent::FrameReceived { src: id, bytes: bytes.clone() });
                    }
                }
                Effect::Unicast { dst, bytes } => {
                    *self.tx_since_tick.entry(id).or_insert(0) += 1;
                    if self.adjacency.get(&id).is_some_and(|n| n.contains(&dst)) {
                        *self.rx_since_tick.entry(dst).or_insert(0) += 1;
                        self.requeue_for(dst, self.now, 5, NodeEvent::FrameReceived { src: id, bytes });
                    }
                }
                Effect::ArmTimer { timer, after } => {
                    let priority = event_priority(&NodeEvent::TimerFired(timer));
                    self.requeue_for(id, self.now + after, priority, NodeEvent::TimerFired(timer));
                }
                Effect::LedOn => {
                    self.led_on.insert(id);
                }
                Effect::LedOff => {
                    self.led_on.remove(&id);
                }
                Effect::Log(line) => {
                    log::info!("{}", line.trim_end());
                    self.log.push((id, line));
                }
            }
        }
    }

    fn requeue_for(&mut self, node: NodeId, time: Duration, priority: u8, event: NodeEvent) {
        self.seq += 1;
        self.queue.push(Scheduled { time, priority, seq: self.seq, node, event });
    }
}
