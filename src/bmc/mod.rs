mod client;
pub mod names;

pub use client::*;
