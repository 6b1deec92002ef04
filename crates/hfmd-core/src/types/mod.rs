//! Core data types: the depth snapshot carried through the queue, the
//! stamped record wrapper, and fixed-size identifier helpers.
//!
//! All `#[repr(C)]` structs are `Copy` and use fixed-size byte arrays for
//! identifiers so a record can be copied into a ring slot by value without
//! touching the heap.

pub mod id;
pub mod market_data;
pub mod record;

pub use id::*;
pub use market_data::*;
pub use record::*;
