//! Business logic services
//!
//! This module contains the session handling, the status logic and the
//! reporting, separated from HTTP concerns.

pub mod report;
pub mod session;
pub mod status;
