//! taskkeep - recurring task history keeper
//!
//! Task-list services reset a recurring task to "needs action" once its next
//! occurrence comes due, and the completion that was there is lost. taskkeep
//! compares each fresh remote snapshot with the last one it saved, keeps a
//! local archival record of every completion that disappeared this way, and
//! writes a completed copy back to the service.
//!
//! # Core Concepts
//!
//! - **Snapshot**: every known task list and task at one point in time
//! - **Rollover**: a task completed in the previous snapshot that the remote
//!   now reports as needs-action
//! - **Archival record**: the local copy of the lost completion, never
//!   dropped by later runs
//! - **Archive marker**: tag written into the notes of remote archival copies
//!
//! # Module Organization
//!
//! - `model`: task records, snapshots and rollover events
//! - `reconcile`: pure merge of previous and fresh snapshots
//! - `guard`: duplicate detection against records already on the remote
//! - `archive`: concurrent compensating writes
//! - `remote`: the task source trait, the Google Tasks client and a mock
//! - `store`: snapshot persistence and the run lock
//! - `sync`: one end-to-end run
//! - `config`: `taskkeep.toml` loading
//! - `lock`: file locking and atomic writes
//! - `cli`, `output`: the command-line surface

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod lock;
pub mod model;
pub mod output;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
