//! 综合结果的验证工具：可达图构建与迁移系统同构判定。
//! 仅供测试与命令行 `--verify` 使用，综合引擎本身不依赖本模块。

pub mod isomorphism;
pub mod reachability;

pub use isomorphism::is_isomorphic;
pub use reachability::{StateGraph, StateGraphConfig, reachability_lts};
