//! # 基于区域的 Petri 网综合
//!
//! 给定带标签迁移系统 `T` 与结构性质 `P`，判定是否存在满足 `P` 的 P/T 网，
//! 其可达图与 `T` 同构；存在时构造该网。
//!
//! 流程: `T` → [`RegionUtility`] → [`separation`] (区域基增量增长) →
//! [`construct_net`] → [`crate::net::Net`]。
//!
//! ```rust
//! use RustPNS::synthesis::{PNProperties, SynthesizePN};
//! use RustPNS::ts::Word;
//!
//! let word: Word = "a b a".parse().unwrap();
//! let synth = SynthesizePN::from_word(&word, PNProperties::new()).unwrap();
//! assert!(synth.was_successfully_separated());
//! let net = synth.petri_net();
//! assert_eq!(net.transitions_len(), 2);
//! ```

pub mod construct;
pub mod equations;
pub mod error;
pub mod problems;
pub mod properties;
pub mod region;
pub mod separation;
pub mod synthesize;
pub mod utility;

pub use construct::{construct_net, net_from_regions};
pub use error::SynthesisError;
pub use problems::{SeparationProblem, enumerate_problems};
pub use properties::{MAX_BOUND, PNProperties, PropertyFlags, PropertyParseError};
pub use region::{NotCombinable, Region, RegionLike};
pub use synthesize::{ExecutionMode, SynthesisOptions, SynthesizePN};
pub use utility::{ParikhVector, RegionUtility};
