//! Core math modules.

pub mod gamma;
pub mod normal;
pub mod stable;
pub mod summary;
