//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设库所集合 `P` 与迁移集合 `T`。输入/输出映射 `Pre, Post ∈ ℕ^{|P|×|T|}`，
//! 迁移效应矩阵 `C = Post - Pre`。对任意标识 `M ∈ ℕ^{|P|}`：
//!
//! * 迁移 `t` **可激发** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`；
//! * 发射后 `M' = M + C[:, t]`，令牌数溢出视为错误。
//!
//! 综合引擎 (`crate::synthesis`) 为每个区域生成一个库所：`Pre[p, t] = w⁻(t)`,
//! `Post[p, t] = w⁺(t)`, `M₀[p] = m₀`。
//!
//! ## 示例
//!
//! ```rust
//! use RustPNS::net::*;
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new("p0", 1));
//! let p1 = net.add_place(Place::new("p1", 0));
//! let t0 = net.add_transition(Transition::new("t0"));
//!
//! net.add_input_arc(p0, t0, 1);
//! net.add_output_arc(p1, t0, 1);
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire_transition(&marking, t0).unwrap();
//! assert_eq!(next.tokens(p0), 0);
//! assert_eq!(next.tokens(p1), 1);
//! ```

pub mod core;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use core::{FireError, Net};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec, PlaceId, TransitionId};
pub use structure::{Marking, Place, Transition, Weight};
