//! Transition systems consumed by the synthesis engine.

pub mod parse;
pub mod system;
pub mod word;

pub use parse::{parse_ts, read_ts};
pub use system::{ArcSpec, State, StateId, TransitionSystem, TsError, TsSpec};
pub use word::{Word, WordSystem};
