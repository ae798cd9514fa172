//! Typed errors at the two boundaries where parsing can fail: the frame
//! codec and the root's serial command line. Per §7, neither error is ever
//! retried or surfaced beyond a log line — callers match `Err` and drop.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length {0} matches no known frame for this dialect")]
    UnknownLength(usize),
    #[error("frame discriminator {0} is not a recognised type")]
    UnknownDiscriminator(u8),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerialCommandError {
    #[error("expected 3 whitespace-separated integers, got {0:?}")]
    Malformed(String),
    #[error("field out of range for its wire width")]
    OutOfRange,
}
