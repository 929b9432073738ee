//! The contents of this crate need to be organized better:
//!
//! - Timer (a mix of logging and profiling)
//! - the byte buffer used by the binary map format
//! - JSON helpers
//! - a grab-bag of formatting utilities

#[macro_use]
extern crate log;

mod buffer;
mod io;
pub mod logger;
mod time;
mod utils;

pub use crate::buffer::DataBuffer;
pub use crate::io::{read_json, to_json, write_json};
pub use crate::time::Timer;
pub use crate::utils::{prettyprint_bytes, prettyprint_usize};

const PROGRESS_FREQUENCY_SECONDS: f64 = 0.2;
