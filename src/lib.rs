//! habtrack: habilitation tracker
//!
//! Keeps employees, their time-bound electrical safety certifications
//! (habilitations) and the renewal schedule in a local SQLite project.

pub mod cli;
pub mod core;
pub mod entities;
pub mod import;
