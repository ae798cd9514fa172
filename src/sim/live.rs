//! A real multi-threaded runner: one OS thread per node, an
//! `crossbeam::channel` per inbound radio link, and `crossbeam::Select`
//! waiting on whichever of a node's timers is next to fire — the same
//! thread-per-subsystem, channel-driven style the teacher uses for its
//! sensor/processor/actuator pipeline (`component_a/sensor.rs`,
//! `component_a/transmitter.rs`), generalized from thread-per-component to
//! thread-per-node.
//!
//! Every node still runs the same sans-IO `handle()` as [`super::network`];
//! only the scheduling of *when* to call it is real here instead of
//! virtual.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Dialect;
use crate::node::event::{Effect, NodeEvent, NodeId, TimerKind};
use crate::rng::{NodeRng, SeededRng};

use super::{NodeHandle, Role, SimEnergySource};

struct Link {
    to: NodeId,
    tx: Sender<(NodeId, Vec<u8>)>,
}

/// One node's thread-local timer bookkeeping. `None` means "not armed".
#[derive(Default)]
struct Deadlines {
    hello: Option<Instant>,
    energy: Option<Instant>,
    sensor: Option<Instant>,
    valve: Option<Instant>,
}

impl Deadlines {
    fn arm(&mut self, timer: TimerKind, at: Instant) {
        match timer {
            TimerKind::Hello => self.hello = Some(at),
            TimerKind::Energy => self.energy = Some(at),
            TimerKind::Sensor => self.sensor = Some(at),
            TimerKind::Valve => self.valve = Some(at),
        }
    }
}

pub struct LiveNetwork {
    dialect: Dialect,
    node_ids: Vec<NodeId>,
    inbound_txs: HashMap<NodeId, Sender<(NodeId, Vec<u8>)>>,
    inbound_rxs: HashMap<NodeId, Receiver<(NodeId, Vec<u8>)>>,
    adjacency: HashMap<NodeId, Vec<NodeId>>,
    serial_tx: Option<Sender<String>>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl LiveNetwork {
    pub fn new(dialect: Dialect) -> Self {
        LiveNetwork {
            dialect,
            node_ids: Vec::new(),
            inbound_txs: HashMap::new(),
            inbound_rxs: HashMap::new(),
            adjacency: HashMap::new(),
            serial_tx: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        }
    }

    pub fn add_node(&mut self, id: NodeId, _role: Role) {
        let (tx, rx) = channel::unbounded();
        self.inbound_txs.insert(id, tx);
        self.inbound_rxs.insert(id, rx);
        self.node_ids.push(id);
        self.adjacency.entry(id).or_default();
    }

    pub fn link(&mut self, a: NodeId, b: NodeId) {
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
    }

    /// Spawns one thread per node and starts the simulation. Each node's
    /// radio is a fan-out of `Sender`s to every linked neighbor's inbound
    /// channel.
    pub fn run(mut self, roles: HashMap<NodeId, Role>, seed: u64) -> LiveHandle {
        let (serial_tx, serial_rx) = channel::unbounded::<String>();
        self.serial_tx = Some(serial_tx);

        for (i, &id) in self.node_ids.clone().iter().enumerate() {
            let role = roles.get(&id).copied().unwrap_or(Role::Sensor);
            let dialect = self.dialect;
            let inbound_rx = self.inbound_rxs.remove(&id).expect("receiver taken once per node");
            let links: Vec<Link> = self
                .adjacency
                .get(&id)
                .into_iter()
                .flatten()
                .map(|&to| Link { to, tx: self.inbound_txs[&to].clone() })
                .collect();
            let serial_rx = if id == crate::config::BORDER_NODE_ID { Some(serial_rx.clone()) } else { None };
            let shutdown = Arc::clone(&self.shutdown);
            let node_seed = seed.wrapping_add(i as u64 + 1);

            let handle = thread::Builder::new()
                .name(format!("wsn-node-{id}"))
                .spawn(move || run_node(id, role, dialect, inbound_rx, links, serial_rx, shutdown, node_seed))
                .expect("spawn node thread");
            self.threads.push(handle);
        }

        LiveHandle { shutdown: self.shutdown, threads: self.threads, serial_tx: self.serial_tx.unwrap() }
    }
}

pub struct LiveHandle {
    shutdown: Arc<AtomicBool>,
    threads: Vec<thread::JoinHandle<()>>,
    serial_tx: Sender<String>,
}

impl LiveHandle {
    /// Sends one line to the root's serial port (§4.6).
    pub fn send_command_line(&self, line: impl Into<String>) {
        let _ = self.serial_tx.send(line.into());
    }

    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for t in self.threads {
            let _ = t.join();
        }
    }
}

fn run_node(
    id: NodeId,
    role: Role,
    dialect: Dialect,
    inbound: Receiver<(NodeId, Vec<u8>)>,
    links: Vec<Link>,
    serial_rx: Option<Receiver<String>>,
    shutdown: Arc<AtomicBool>,
    seed: u64,
) {
    let mut energy_source = SimEnergySource::new();
    let mut node = NodeHandle::new(id, role, dialect, &energy_source);
    let mut rng = SeededRng::from_seed(seed);
    let started = Instant::now();
    let mut deadlines = Deadlines::default();
    let mut radio = RadioActivity::default();

    for effect in node.on_start(&mut rng) {
        apply_startup_effect(effect, &mut deadlines);
    }

    while !shutdown.load(Ordering::Relaxed) {
        // Wake up at the earliest armed deadline even if no frame or serial
        // line is ready, so timers fire on schedule. Bound to `timeout_rx`
        // so the receiver outlives the `Select` that borrows it.
        let next_deadline = [deadlines.hello, deadlines.energy, deadlines.sensor, deadlines.valve]
            .into_iter()
            .flatten()
            .min();
        let timeout_rx = next_deadline.map(|at| channel::at(at.max(Instant::now())));

        let mut select = channel::Select::new();
        let inbound_idx = select.recv(&inbound);
        let serial_idx = serial_rx.as_ref().map(|rx| select.recv(rx));
        let timeout_idx = timeout_rx.as_ref().map(|rx| select.recv(rx));

        let op = match select.select_timeout(Duration::from_millis(250)) {
            Ok(op) => op,
            Err(_) => continue,
        };
        let index = op.index();

        if Some(index) == serial_idx {
            if let Ok(line) = op.recv(serial_rx.as_ref().unwrap()) {
                dispatch(id, &mut node, &mut rng, &energy_source, &links, elapsed(started), NodeEvent::SerialLine(line), &mut radio);
            }
        } else if index == inbound_idx {
            if let Ok((src, bytes)) = op.recv(&inbound) {
                radio.received += 1;
                dispatch(id, &mut node, &mut rng, &energy_source, &links, elapsed(started), NodeEvent::FrameReceived { src, bytes }, &mut radio);
            }
        } else if Some(index) == timeout_idx {
            let _ = op.recv(timeout_rx.as_ref().unwrap());
            fire_due_timers(id, &mut node, &mut rng, &mut energy_source, &links, started, &mut deadlines, &mut radio);
        }
    }
}

/// Radio activity observed since this node's last energy tick. The live
/// runner has no "energest" hardware counter to read, so — like
/// [`super::SimEnergySource`] itself — it rebuilds one from observed send
/// and receive effects.
#[derive(Default)]
struct RadioActivity {
    sent: u32,
    received: u32,
}

fn elapsed(started: Instant) -> Duration {
    started.elapsed()
}

fn apply_startup_effect(effect: Effect, deadlines: &mut Deadlines) {
    match effect {
        Effect::ArmTimer { timer, after } => deadlines.arm(timer, Instant::now() + after),
        Effect::Log(line) => log::info!("{}", line.trim_end()),
        _ => {}
    }
}

fn fire_due_timers(
    id: NodeId,
    node: &mut NodeHandle,
    rng: &mut dyn NodeRng,
    energy_source: &mut SimEnergySource,
    links: &[Link],
    started: Instant,
    deadlines: &mut Deadlines,
    radio: &mut RadioActivity,
) {
    let now = Instant::now();
    let due: Vec<TimerKind> = [
        (TimerKind::Energy, deadlines.energy),
        (TimerKind::Hello, deadlines.hello),
        (TimerKind::Sensor, deadlines.sensor),
        (TimerKind::Valve, deadlines.valve),
    ]
    .into_iter()
    .filter(|(_, at)| at.is_some_and(|d| d <= now))
    .map(|(t, _)| t)
    .collect();

    for timer in due {
        match timer {
            TimerKind::Energy => {
                deadlines.energy = None;
                energy_source.advance(node.power_state(), radio.sent, radio.received);
                radio.sent = 0;
                radio.received = 0;
            }
            TimerKind::Hello => deadlines.hello = None,
            TimerKind::Sensor => deadlines.sensor = None,
            TimerKind::Valve => deadlines.valve = None,
        }
        let effects = node.handle(started.elapsed(), NodeEvent::TimerFired(timer), rng, &*energy_source);
        for effect in effects {
            apply_effect(id, effect, links, deadlines, radio);
        }
    }
}

fn dispatch(
    id: NodeId,
    node: &mut NodeHandle,
    rng: &mut dyn NodeRng,
    energy_source: &SimEnergySource,
    links: &[Link],
    now: Duration,
    event: NodeEvent,
    radio: &mut RadioActivity,
) {
    let effects = node.handle(now, event, rng, energy_source);
    for effect in effects {
        apply_effect_readonly(id, effect, links, radio);
    }
}

fn apply_effect(id: NodeId, effect: Effect, links: &[Link], deadlines: &mut Deadlines, radio: &mut RadioActivity) {
    match effect {
        Effect::ArmTimer { timer, after } => deadlines.arm(timer, Instant::now() + after),
        other => apply_effect_readonly(id, other, links, radio),
    }
}

fn apply_effect_readonly(id: NodeId, effect: Effect, links: &[Link], radio: &mut RadioActivity) {
    match effect {
        Effect::Broadcast(bytes) => {
            radio.sent += 1;
            for link in links {
                let _ = link.tx.send((id, bytes.clone()));
            }
        }
        Effect::Unicast { dst, bytes } => {
            radio.sent += 1;
            if let Some(link) = links.iter().find(|l| l.to == dst) {
                let _ = link.tx.send((id, bytes));
            }
        }
        Effect::LedOn => log::info!("[led] on"),
        Effect::LedOff => log::info!("[led] off"),
        Effect::Log(line) => log::info!("{}", line.trim_end()),
        Effect::ArmTimer { .. } => unreachable!("handled by caller"),
    }
}
