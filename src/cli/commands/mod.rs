//! CLI command implementations

pub mod bulk;
pub mod cert;
pub mod completions;
pub mod config;
pub mod emp;
pub mod export;
pub mod import;
pub mod init;
pub mod org;
pub mod renewals;
pub mod status;
