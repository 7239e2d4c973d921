#![warn(non_snake_case)]

pub mod analysis;
pub mod config;
pub mod net;
pub mod options;
pub mod report;
pub mod solver;
pub mod synthesis;
pub mod ts;
