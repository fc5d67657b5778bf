//! The collaborator-facing simulation session.
//!
//! [`Simulation`] owns the object store, the dispatcher, the temporal record
//! and the simulation clock. Rendering and control collaborators talk to it
//! and nothing else.
//!
//! # Invariants
//! - World edits are refused while the timeline is paused.
//! - Every settled mutation is captured once its debounce window elapses.
//! - After a scrub, dispatcher registrations match the robots in the store.

mod error;
mod script;
mod simulation;

pub use error::SessionError;
pub use script::{Scenario, ScriptError, ScriptRunner, Step, load_config};
pub use simulation::{Handled, Simulation};
