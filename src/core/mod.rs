//! Core module - domain services shared by every command

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod org;
pub mod project;
pub mod store;
pub mod text;

pub use config::Config;
pub use error::{HabError, HabResult};
pub use lifecycle::{classify, compute_expiration, days_until, StatusBucket, RENEWAL_WINDOW_DAYS};
pub use org::{OrgTree, Placement, ResolveFailure, Resolver};
pub use project::{Project, ProjectError};
pub use store::{RecordStore, Store};
