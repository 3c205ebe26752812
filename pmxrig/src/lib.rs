//! PMX 2.0/2.1 model codec with a bone transform, morph and IK runtime.
//!
//! This crate is IO-free and renderer-agnostic. [`ModelData`] loads from and writes back to byte
//! buffers; [`Skeleton`] evaluates one pose instance of a loaded model per frame.

#![forbid(unsafe_code)]

mod binary;
mod cursor;
mod error;
mod graph;
mod model;
mod runtime;
mod transform;

pub use binary::*;
pub use cursor::*;
pub use error::*;
pub use graph::*;
pub use model::*;
pub use runtime::*;
pub use transform::*;

#[cfg(test)]
mod test_fixtures;


#[cfg(test)]
mod binary_tests;
