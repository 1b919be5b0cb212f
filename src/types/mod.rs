//! Core types for typed vector spaces, angles and measurement packages

pub mod angle;
pub mod measurement;
pub mod spaces;
