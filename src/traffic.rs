//! Operational log of every request and reply crossing the gateway.
//!
//! Records are ordinary `tracing` events under the [`TARGET`] target, one line each, so they
//! can be routed to their own append-only file (see [`crate::logging`]).

use strum_macros::{AsRefStr, Display};
use tracing::info;

use crate::frame::{self, Frame};

pub const TARGET: &str = "traffic";

/// Which hop a message travels on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
pub enum Direction {
    #[strum(to_string = "CLIENT->APPLICATION")]
    ClientToApplication,
    #[strum(to_string = "APPLICATION->CLIENT")]
    ApplicationToClient,
    #[strum(to_string = "APPLICATION->DATA")]
    ApplicationToData,
    #[strum(to_string = "DATA->APPLICATION")]
    DataToApplication,
}

pub fn request(direction: Direction, peer: &str, line: &str) {
    info!(
        target: TARGET,
        direction = direction.as_ref(),
        peer,
        "REQUEST | {}",
        frame::flatten(line)
    );
}

pub fn reply(direction: Direction, peer: &str, frame: &Frame) {
    info!(
        target: TARGET,
        direction = direction.as_ref(),
        peer,
        "REPLY   | {}",
        frame.flatten()
    );
}
