//! # Type-shape-driven JSON Schema generation for the weft ecosystem
//!
//! Describes native data types as draft 2020-12 compatible schema documents
//! with deterministic output: property order follows field declaration
//! order, `$defs` entries appear in first-visit order, and repeated runs
//! over the same shape produce byte-identical documents. The primary
//! consumer is API-wrapper code declaring structured tool-call payload
//! shapes to a model backend.
//!
//! ## Usage
//!
//! ```
//! use weft_schema::{FieldShape, RecordShape, Reflect, Reflector, TypeShape};
//!
//! struct SearchRequest;
//!
//! impl Reflect for SearchRequest {
//!     fn shape() -> TypeShape {
//!         TypeShape::record::<SearchRequest>(
//!             "SearchRequest",
//!             RecordShape::new(vec![
//!                 FieldShape::new("query", String::shape)
//!                     .tag("json", "query")
//!                     .tag("jsonschema", "minLength=1,description=Search terms"),
//!                 FieldShape::new("limit", u32::shape)
//!                     .tag("json", "limit,omitempty")
//!                     .tag("jsonschema", "minimum=1,maximum=100"),
//!             ]),
//!         )
//!     }
//! }
//!
//! let schema = Reflector::new().reflect::<SearchRequest>();
//! let json = serde_json::to_string(&schema).unwrap();
//! assert!(json.contains("\"required\":[\"query\"]"));
//! ```
//!
//! ## Modules
//!
//! - [`reflect`] - shape descriptions and the reflector
//! - [`node`] - the schema node type and its encode/decode rules
//! - [`id`] - schema identifier URIs and their derivations
//! - `tags` - the per-field refinement mini-language (internal)

pub mod id;
pub mod node;
pub mod reflect;
mod tags;

pub use id::{SchemaId, SchemaIdError};
pub use node::{DRAFT_2020_12, Schema, SchemaObject};
pub use reflect::{FieldShape, Kind, RecordShape, Reflect, Reflector, TypeShape};

// the ordered container is part of this crate's public vocabulary
pub use weft_json::OrderedMap;
