//! # Deterministic JSON primitives for the weft ecosystem
//!
//! Byte-level building blocks for emitting JSON whose exact shape matters:
//! stable key ordering, spec-correct escaping, and amortized-O(1) buffer
//! growth. The schema generator in `weft-schema` is the primary consumer,
//! but nothing here knows about schemas.
//!
//! ## Modules
//!
//! - [`writer`] - append-only byte sink with typed scalar, string and
//!   base64 encoders and a sticky-error contract
//! - [`ordered`] - insertion-order-preserving associative container

pub mod ordered;
pub mod writer;

pub use ordered::OrderedMap;
pub use writer::{JsonWriter, WriteError};
