//! Record types
//!
//! - [`Employee`] - a person identified by a 5-digit matricule, placed in
//!   the organizational tree
//! - [`Certification`] - one time-bound certificate of class HT or ST

pub mod certification;
pub mod employee;

pub use certification::{CertClass, Certification, CertificationRow, CodeSet, NewCertification};
pub use employee::{Employee, Matricule, NewEmployee};
