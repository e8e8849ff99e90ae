//! Mockwire - scenario-scoped HTTP record/replay harness
//!
//! Outbound calls made within a recording scenario go to the real upstream
//! and are captured as mapping documents; calls made within a replaying
//! scenario are redirected to a local stand-in server that answers from
//! those documents.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::field_reassign_with_default,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod harness;
pub mod network;
pub mod proxy;
pub mod recording;
pub mod registry;
pub mod replay;
pub mod scenario;
pub mod storage;

pub use error::{MockwireError, Result};
pub use harness::{Exchange, Harness};
