#![warn(missing_docs)]

//! Background workers used by the LDN session and proxy components.
//!
//! A worker is a piece of state implementing [Runtime]. [Task] owns the
//! state, drives [Runtime::wait] in a loop on the tokio runtime and tears
//! it down on [Task::stop] or drop.

mod task;

pub mod io;

pub use task::*;
