//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Purge: Removes entries that have been expired for longer than the
//!   configured retention

mod purge;

pub use purge::spawn_purge_task;
