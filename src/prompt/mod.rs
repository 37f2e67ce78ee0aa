//! Settings model and prompt construction.
pub mod constructor;
pub mod settings;
