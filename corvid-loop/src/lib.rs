#![deny(missing_docs)]
//! The bounded generate/parse/execute/observe reasoning loop (C6).
//!
//! A simple `for`-over-iteration-counter with explicit state variables
//! — no coroutine runtime of its own. Every await sits at a documented
//! suspension point (generator call, tool dispatch, step callback), so
//! porting this to a different async runtime is mechanical (§9).

pub mod agent;
pub mod detectors;
pub mod prompt;
pub mod run;

pub use agent::{Agent, AgentState, StepCallback};
pub use detectors::{synthesize_answer, DetectorOutcome, LoopDetectors};
pub use prompt::build_system_prompt;
pub use run::run;
