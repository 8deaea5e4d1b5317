//! Meteorwatch math utilities.

pub mod math;

pub use math::gamma::*;
pub use math::normal::*;
pub use math::stable::*;
pub use math::summary::*;
