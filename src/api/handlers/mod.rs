//! HTTP handlers.

mod sample;


pub use sample::*;
