//! pulsewatch-core: liveness registry for a fleet of heartbeat-reporting
//! processes. Pure logic with injected time; no async runtime, no IO.

pub mod dispatch;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod types;

pub use dispatch::{Dispatched, dispatch, log_dispatched};
pub use protocol::{ClientMessage, EventKind, ProtocolError, decode_message, encode_message};
pub use registry::{Outcome, Registry, SweepPolicy, SweepReport};
pub use types::{ClientPhase, ClientRecord, ClientSnapshot, ClientState};
