//! Built-in login profiles.

pub mod cyberpower;
pub mod generic;
