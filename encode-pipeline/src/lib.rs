//! Frame ordering and post-processing for hardware H.264 encoders.
//!
//! The backend does the actual encoding. This crate decides the type and display position of each
//! frame, tracks references, submits the parameters and packed headers for each picture, and
//! collects the coded output, optionally on a worker thread.

pub mod backend;
pub use backend::*;

pub mod config;
pub use config::*;

pub mod coordinator;
pub use coordinator::*;

pub mod error;
pub use error::*;

pub mod gop;
pub use gop::*;

pub mod params;
pub use params::*;

pub mod reference;
pub use reference::*;

pub mod source;
pub use source::*;

pub mod surface_pool;
pub use surface_pool::*;

pub mod task_queue;
pub use task_queue::*;

#[cfg(test)]
mod test_support;
