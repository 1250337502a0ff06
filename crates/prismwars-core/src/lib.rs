// Library root for the Prism Wars client core: wire protocol, snapshot
// reconciliation, interaction state, and connection plumbing. Everything here
// is front-end agnostic; the terminal client lives in `prismwars-tui`.

pub mod connection;
pub mod interaction;
pub mod particles;
pub mod preview;
pub mod projection;
pub mod session;
pub mod snapshot;
pub mod timer;
pub mod transport;
pub mod wire;
