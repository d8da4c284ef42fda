//! Device flow lifecycle: state, the polling state machine, and the
//! registry of in-flight flows.
//!
//! ```text
//! pending ──► succeeded | denied | expired | error   (all terminal)
//! ```

pub mod machine;
pub mod registry;
pub mod state;

pub use machine::{FlowMachine, PollResponse};
pub use registry::{FlowHandle, FlowRegistry};
pub use state::{DeviceFlow, FlowState, PollGate};
