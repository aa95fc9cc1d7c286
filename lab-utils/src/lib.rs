//! Utility library for the abilene-lab workspace

pub mod addressing;
pub mod other;
pub mod serde;
