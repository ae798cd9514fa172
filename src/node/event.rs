//! The event/effect union each node role's `handle` speaks (§9 Design
//! Notes: "reimplement as an explicit state struct plus a `select`-style
//! dispatch over `{timer_fired(id), frame_received(src, bytes), serial_line(bytes)}`").
//!
//! Neither variant here touches a thread, a channel, or a real clock — an
//! adapter in `crate::sim` is what owns those and turns [`Effect`]s into
//! action.

use std::time::Duration;

pub type NodeId = u8;

/// The four timers named in §5's dispatch-priority list, minus the serial
/// line (root only, carried as its own `NodeEvent` variant since it is not
/// a timer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Energy,
    Hello,
    Sensor,
    Valve,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    TimerFired(TimerKind),
    FrameReceived { src: NodeId, bytes: Vec<u8> },
    /// Root only: one line from the PC-facing serial channel (§4.6).
    SerialLine(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Broadcast(Vec<u8>),
    Unicast { dst: NodeId, bytes: Vec<u8> },
    /// Arms (or re-arms) `timer` to fire `after` elapses from `now`. A
    /// `reset` per §6 is expressed the same way: re-arm for the timer's
    /// usual duration starting now.
    ArmTimer { timer: TimerKind, after: Duration },
    LedOn,
    LedOff,
    /// A human-readable line carrying one of the five tag prefixes named in
    /// §6 (`TREE`, `PROCESS`, `MODE`, `DLPM`, `BORDER`). Forwarded verbatim
    /// to `log::info!` by both adapters.
    Log(String),
}
