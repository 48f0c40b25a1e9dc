use bytes::Bytes;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use serde_with::skip_serializing_none;
use smol_str::SmolStr;
use std::fmt;
use weft_json::{JsonWriter, OrderedMap, WriteError};

use crate::id::SchemaId;

/// Dialect identifier emitted as `$schema` on generated root documents.
pub const DRAFT_2020_12: SchemaId =
    SchemaId::new_static("https://json-schema.org/draft/2020-12/schema");

/// One schema document or sub-document.
///
/// A schema is either a bare boolean (`true` matches everything, `false`
/// matches nothing) or a structured object. The two forms are mutually
/// exclusive on the wire: the boolean form serializes as the bare literal,
/// and a structured object with no field set collapses to `true` rather
/// than emitting `{}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// The `true`/`false` form.
    Bool(bool),
    /// The structured object form.
    Object(Box<SchemaObject>),
}

/// The structured form of a [`Schema`].
///
/// Field declaration order here is emission order on the wire, and the
/// `properties`/`$defs` maps preserve insertion order, so a given input
/// always produces byte-identical output. Keys outside the standard
/// vocabulary live in [`extras`](SchemaObject::extras) and are flattened
/// as sibling top-level members when serialized.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    // identity
    #[serde(rename = "$schema")]
    pub version: Option<SchemaId>,
    #[serde(rename = "$id")]
    pub id: Option<SchemaId>,
    #[serde(rename = "$anchor")]
    pub anchor: Option<SmolStr>,
    #[serde(rename = "$dynamicAnchor")]
    pub dynamic_anchor: Option<SmolStr>,
    #[serde(rename = "$ref")]
    pub reference: Option<SmolStr>,
    #[serde(rename = "$dynamicRef")]
    pub dynamic_ref: Option<SmolStr>,
    #[serde(rename = "$defs")]
    pub defs: Option<OrderedMap<SmolStr, Schema>>,

    // composition
    pub all_of: Option<Vec<Schema>>,
    pub any_of: Option<Vec<Schema>>,
    pub one_of: Option<Vec<Schema>>,
    pub not: Option<Box<Schema>>,
    #[serde(rename = "if")]
    pub if_schema: Option<Box<Schema>>,
    #[serde(rename = "then")]
    pub then_schema: Option<Box<Schema>>,
    #[serde(rename = "else")]
    pub else_schema: Option<Box<Schema>>,
    pub dependent_schemas: Option<OrderedMap<SmolStr, Schema>>,

    // structure
    pub properties: Option<OrderedMap<SmolStr, Schema>>,
    pub pattern_properties: Option<OrderedMap<SmolStr, Schema>>,
    pub additional_properties: Option<Box<Schema>>,
    pub items: Option<Box<Schema>>,
    pub prefix_items: Option<Vec<Schema>>,
    pub contains: Option<Box<Schema>>,
    pub property_names: Option<Box<Schema>>,

    // validation
    #[serde(rename = "type")]
    pub ty: Option<SmolStr>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "const")]
    pub const_value: Option<Value>,
    pub multiple_of: Option<Number>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,
    pub min_contains: Option<u64>,
    pub max_contains: Option<u64>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub required: Option<Vec<SmolStr>>,
    pub dependent_required: Option<OrderedMap<SmolStr, Vec<SmolStr>>>,

    // content
    pub format: Option<SmolStr>,
    pub content_encoding: Option<SmolStr>,
    pub content_media_type: Option<SmolStr>,
    pub content_schema: Option<Box<Schema>>,

    // metadata
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub deprecated: Option<bool>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub examples: Option<Vec<Value>>,

    /// Vendor keys outside the standard vocabulary, emitted as sibling
    /// top-level members.
    #[serde(flatten)]
    pub extras: OrderedMap<SmolStr, Value>,
}

impl Schema {
    /// The schema that matches everything.
    pub fn always() -> Self {
        Schema::Bool(true)
    }

    /// The schema that matches nothing.
    pub fn never() -> Self {
        Schema::Bool(false)
    }

    /// A structured schema carrying only a `type` tag.
    pub fn of_type(ty: &str) -> Self {
        Schema::Object(Box::new(SchemaObject {
            ty: Some(SmolStr::new(ty)),
            ..Default::default()
        }))
    }

    /// A structured schema carrying only a `$ref`.
    pub fn reference(target: impl Into<SmolStr>) -> Self {
        Schema::Object(Box::new(SchemaObject {
            reference: Some(target.into()),
            ..Default::default()
        }))
    }

    /// Whether this schema matches everything: either `Bool(true)` or a
    /// structured form with no field set.
    pub fn is_always(&self) -> bool {
        match self {
            Schema::Bool(b) => *b,
            Schema::Object(obj) => **obj == SchemaObject::default(),
        }
    }

    pub fn as_object(&self) -> Option<&SchemaObject> {
        match self {
            Schema::Object(obj) => Some(obj),
            Schema::Bool(_) => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut SchemaObject> {
        match self {
            Schema::Object(obj) => Some(obj),
            Schema::Bool(_) => None,
        }
    }

    /// Encode this schema through a [`JsonWriter`].
    ///
    /// Produces the same bytes as the serde path; a failure from the
    /// underlying encoder lands in the writer's sticky error.
    pub fn encode(&self, w: &mut JsonWriter) {
        match self {
            Schema::Bool(b) => w.boolean(*b),
            Schema::Object(_) => w.raw(serde_json::to_vec(self)),
        }
    }

    /// Encode this schema to bytes through a fresh [`JsonWriter`].
    pub fn to_bytes(&self) -> Result<Bytes, WriteError> {
        let mut w = JsonWriter::new();
        self.encode(&mut w);
        w.build_bytes()
    }
}

impl Default for Schema {
    /// The zero-valued structured form, equivalent to `true`.
    fn default() -> Self {
        Schema::Object(Box::default())
    }
}

impl From<SchemaObject> for Schema {
    fn from(obj: SchemaObject) -> Self {
        Schema::Object(Box::new(obj))
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Schema::Bool(b) => serializer.serialize_bool(*b),
            Schema::Object(obj) => {
                // an "anything matches" schema need not be spelled out
                if **obj == SchemaObject::default() {
                    serializer.serialize_bool(true)
                } else {
                    obj.serialize(serializer)
                }
            }
        }
    }
}

struct SchemaVisitor;

impl<'de> Visitor<'de> for SchemaVisitor {
    type Value = Schema;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a boolean or a schema object")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Schema::Bool(v))
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let obj = SchemaObject::deserialize(serde::de::value::MapAccessDeserializer::new(map))?;
        Ok(Schema::Object(Box::new(obj)))
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SchemaVisitor)
    }
}

impl SchemaObject {
    /// Deposit a vendor key/value pair into [`extras`](SchemaObject::extras).
    ///
    /// Values arrive as tag text, so the stored type is inferred. Repeated
    /// keys follow the accumulation policy: a string becomes a two-element
    /// list, a list grows, an integer is re-parsed from the new text, and a
    /// boolean re-reads `"true"`/`"t"` as true and anything else as false.
    pub fn set_extra(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.extras.get_mut(key) {
            match slot {
                Value::String(prev) => {
                    let prev = std::mem::take(prev);
                    *slot = Value::Array(vec![
                        Value::String(prev),
                        Value::String(value.to_owned()),
                    ]);
                }
                Value::Array(list) => list.push(Value::String(value.to_owned())),
                Value::Number(_) => match value.parse::<i64>() {
                    Ok(n) => *slot = Value::from(n),
                    Err(_) => {
                        tracing::debug!(key, value, "ignoring non-integer extra for integer key");
                    }
                },
                Value::Bool(_) => *slot = Value::Bool(value == "true" || value == "t"),
                _ => {}
            }
            return;
        }
        let parsed = if key == "minimum" {
            match value.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => {
                    tracing::debug!(key, value, "dropping unparsable integer extra");
                    return;
                }
            }
        } else {
            match value {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                other => Value::String(other.to_owned()),
            }
        };
        self.extras.insert(SmolStr::new(key), parsed);
    }
}
