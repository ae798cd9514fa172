//! End-to-end scenarios driven through the public virtual-time network API,
//! covering the literal S1-S6 scenarios and the cross-cutting properties
//! that need more than one node to observe.

use std::time::Duration;

use wsn_sim::config::{BORDER_NODE_ID, HELLO_INTERVAL_OTHER, LPM_ENTER_AT, UNJOINED};
use wsn_sim::config::Dialect;
use wsn_sim::frame::Frame;
use wsn_sim::node::event::NodeId;
use wsn_sim::power::PowerState;
use wsn_sim::rng::SeededRng;
use wsn_sim::sim::network::Network;
use wsn_sim::sim::{NodeHandle, Role};

fn network(dialect: Dialect) -> Network {
    Network::new(dialect, Box::new(SeededRng::from_seed(7)))
}

fn rank_of(net: &Network, id: NodeId) -> u16 {
    match net.node(id) {
        NodeHandle::Border(n) => n.rank(),
        NodeHandle::Computation(n) => n.rank(),
        NodeHandle::Sensor(n) => n.rank(),
    }
}

fn parent_of(net: &Network, id: NodeId) -> Option<NodeId> {
    match net.node(id) {
        NodeHandle::Border(_) => None,
        NodeHandle::Computation(n) => n.parent(),
        NodeHandle::Sensor(n) => n.parent(),
    }
}

/// S1. Two-hop tree formation: 3 is out of range of 1, in range of 2.
#[test]
fn s1_two_hop_tree_forms_within_three_hello_intervals() {
    let mut net = network(Dialect::EnergyUnaware);
    net.add_node(BORDER_NODE_ID, Role::Computation);
    net.add_node(2, Role::Computation);
    net.add_node(3, Role::Sensor);
    net.link(BORDER_NODE_ID, 2);
    net.link(2, 3);
    net.start();
    net.run_for(HELLO_INTERVAL_OTHER * 3);

    assert_eq!(rank_of(&net, 2), 1);
    assert_eq!(parent_of(&net, 2), Some(BORDER_NODE_ID));
    assert_eq!(rank_of(&net, 3), 2);
    assert_eq!(parent_of(&net, 3), Some(2));
}

/// S2. A rising trend fed straight into a Computation node's windows
/// triggers an OPEN_VALVE command, which in turn opens the sensor's valve
/// and the valve later auto-closes.
#[test]
fn s2_trend_triggered_valve_opens_and_auto_closes() {
    let mut net = network(Dialect::EnergyUnaware);
    net.add_node(BORDER_NODE_ID, Role::Computation);
    net.add_node(2, Role::Computation);
    net.add_node(7, Role::Sensor);
    net.link(BORDER_NODE_ID, 2);
    net.link(2, 7);
    net.start();
    // Let the tree converge first so node 2 has a parent and node 7 can
    // receive the resulting command (adjacency, not tree state, gates
    // delivery, but converging first matches how the scenario would occur
    // in practice).
    net.run_for(HELLO_INTERVAL_OTHER * 2);

    for (k, value) in (0u16..30).enumerate() {
        let frame = Frame::Sensor { source_id: 7, value };
        let bytes = frame.encode(Dialect::EnergyUnaware);
        net.inject_frame(net.now() + Duration::from_millis(k as u64), 7, 2, bytes);
    }
    net.run_for(Duration::from_secs(1));

    assert!(net.led_is_on(7), "valve LED should be on after the trend crosses the threshold");

    let NodeHandle::Sensor(sensor) = net.node(7) else { panic!("expected sensor") };
    assert!(sensor.valve_open());

    net.run_for(wsn_sim::config::VALVE_DURATION + Duration::from_secs(1));
    assert!(!net.led_is_on(7));
    let NodeHandle::Sensor(sensor) = net.node(7) else { panic!("expected sensor") };
    assert!(!sensor.valve_open());
}

/// S3. A well-formed serial line at the root produces exactly one unicast
/// COMMAND frame with the documented payload.
#[test]
fn s3_command_via_serial_produces_one_unicast() {
    let mut net = network(Dialect::EnergyUnaware);
    net.add_node(BORDER_NODE_ID, Role::Computation);
    net.add_node(7, Role::Sensor);
    net.link(BORDER_NODE_ID, 7);
    net.start();
    net.inject_serial_line(net.now(), BORDER_NODE_ID, "3 7 1");
    net.run_for(Duration::from_secs(1));

    let NodeHandle::Sensor(sensor) = net.node(7) else { panic!("expected sensor") };
    assert!(sensor.valve_open(), "node 7 should have received the COMMAND and opened its valve");
}

/// S9 / property 9: any frame whose length matches no known frame for a
/// dialect is silently dropped rather than causing a decode panic.
#[test]
fn frame_of_bad_length_is_dropped_without_side_effects() {
    assert!(Frame::decode(Dialect::EnergyUnaware, &[1, 2, 3]).is_err());
    assert!(Frame::decode(Dialect::Energised, &[1, 2, 3, 4]).is_err());
}

/// Property 1: rank is monotonic and always parent.rank + 1 once joined.
#[test]
fn rank_is_monotonic_and_tracks_parent_plus_one() {
    let mut net = network(Dialect::EnergyUnaware);
    net.add_node(BORDER_NODE_ID, Role::Computation);
    net.add_node(2, Role::Computation);
    net.link(BORDER_NODE_ID, 2);
    net.start();

    let mut last_rank = UNJOINED;
    for _ in 0..3 {
        net.run_for(HELLO_INTERVAL_OTHER);
        let rank = rank_of(&net, 2);
        assert!(rank <= last_rank, "rank must never increase");
        last_rank = rank;
    }
    assert_eq!(rank_of(&net, 2), rank_of(&net, BORDER_NODE_ID) + 1);
}

/// Property 2: once HELLOs have reached every node, the parent relation
/// forms a tree rooted at the border (no cycles, every non-root joined).
#[test]
fn tree_is_acyclic_and_rooted_at_border_at_convergence() {
    let mut net = network(Dialect::EnergyUnaware);
    net.add_node(BORDER_NODE_ID, Role::Computation);
    net.add_node(2, Role::Computation);
    net.add_node(3, Role::Computation);
    net.add_node(4, Role::Sensor);
    net.link(BORDER_NODE_ID, 2);
    net.link(BORDER_NODE_ID, 3);
    net.link(3, 4);
    net.start();
    net.run_for(HELLO_INTERVAL_OTHER * 4);

    for id in [2u8, 3, 4] {
        let mut node = id;
        let mut hops = 0;
        let mut seen = std::collections::HashSet::new();
        while node != BORDER_NODE_ID {
            assert!(seen.insert(node), "cycle detected reaching node {id}");
            node = parent_of(&net, node).expect("every node should have joined");
            hops += 1;
            assert!(hops <= 4, "path to root should not exceed the topology's diameter");
        }
    }
}

/// S4. A continuous second of CPU activity from battery=31 debits enough
/// to cross the LPM threshold.
#[test]
fn s4_lpm_entry_from_cpu_activity() {
    use wsn_sim::energy::EnergyModel;
    use wsn_sim::ports::EnergySource;

    struct OneSecondCpu;
    impl EnergySource for OneSecondCpu {
        fn cpu_ticks(&self) -> u32 {
            1
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

    let source = OneSecondCpu;
    let mut model = EnergyModel::new(&source);
    // Drive the battery down to 31 first via repeated debits, then take the
    // final 1-second step that should cross the 30.0 threshold.
    while model.battery() > 31.2 {
        model.debit_send_command();
    }
    let battery = model.tick(&source, PowerState::Active);
    assert!(battery <= LPM_ENTER_AT);
    assert_eq!(PowerState::Active.step(battery), PowerState::Lpm);
}

/// S5. From Deep-LPM with battery=89, idle recharge crosses 90 within two
/// energy ticks and the node resumes Active.
#[test]
fn s5_deep_lpm_recharges_to_active_within_two_ticks() {
    use wsn_sim::energy::EnergyModel;
    use wsn_sim::ports::EnergySource;

    struct Idle;
    impl EnergySource for Idle {
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

    let source = Idle;
    let mut model = EnergyModel::new(&source);
    while model.battery() > 89.05 {
        model.debit_send_command();
    }
    let mut battery = model.battery();
    let mut state = PowerState::DeepLpm;
    for _ in 0..2 {
        battery = model.tick(&source, state);
        state = state.step(battery);
    }
    assert!(battery >= wsn_sim::config::ACTIVE_RESUME_AT);
    assert_eq!(state, PowerState::Active);
}

/// S6. Equal-rank energy tiebreak: a sufficiently more-charged neighbor at
/// the same candidate rank wins the parent slot; a marginally better one
/// does not.
#[test]
fn s6_equal_rank_energy_switch_respects_the_margin() {
    use wsn_sim::tree::TreeState;

    let mut state = TreeState { rank: 1, parent: Some(10), parent_energy: 40.0 };
    assert!(!state.on_hello(20, 0, Some(65.0)));
    assert_eq!(state.parent, Some(10));

    assert!(state.on_hello(20, 0, Some(80.0)));
    assert_eq!(state.parent, Some(20));
    assert_eq!(state.rank, 1);
}
