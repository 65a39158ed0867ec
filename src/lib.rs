//! Nacio - turn-based grand-strategy engine

pub mod combat;
pub mod core;
pub mod era;
pub mod nation;
pub mod narrative;
pub mod ranking;
pub mod timeline;
pub mod turn;
