//! Type-shape traversal producing schema trees.
//!
//! Runtime introspection is modelled as a closed set of kind variants: a
//! [`TypeShape`] describes one type, record fields reference their own
//! shapes lazily through function pointers (which is what lets recursive
//! graphs terminate), and the capability hooks of the original duck-typed
//! design are explicit opt-ins on the shape builders.

use heck::ToSnakeCase;
use serde_json::Value;
use smol_str::{SmolStr, format_smolstr};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use weft_json::OrderedMap;

use crate::id::SchemaId;
use crate::node::{DRAFT_2020_12, Schema, SchemaObject};
use crate::tags;

/// Types that can describe their own shape to the reflector.
///
/// Implementations exist for the primitive and well-known leaf types;
/// record types are composed by hand (or by generated code) from
/// [`TypeShape::record`] and [`FieldShape`] builders.
pub trait Reflect {
    fn shape() -> TypeShape;
}

/// Description of one type: identity, kind, and opt-in capabilities.
#[derive(Debug, Clone)]
pub struct TypeShape {
    /// Memoization identity for `$defs` and cycle breaking.
    pub id: TypeId,
    /// Definition name for record and enum shapes.
    pub name: &'static str,
    pub kind: Kind,
    /// "Produce my own schema": used verbatim, generic reflection skipped.
    pub custom_schema: Option<fn() -> Schema>,
    /// "Use this other type instead": reflection proceeds on the
    /// substituted shape.
    pub alias: Option<fn() -> TypeShape>,
    /// "Mutate my generated schema": runs after generic reflection, as the
    /// last step for the node.
    pub extend: Option<fn(&mut SchemaObject)>,
}

/// The closed set of structural kinds.
#[derive(Debug, Clone)]
pub enum Kind {
    Bool,
    Integer,
    Float,
    Str,
    /// Raw byte sequence, emitted as a base64 content-encoded string.
    Bytes,
    Timestamp,
    IpV4,
    IpV6,
    Uri,
    Seq(fn() -> TypeShape),
    /// String-keyed associative container.
    Map(fn() -> TypeShape),
    Optional(fn() -> TypeShape),
    Record(RecordShape),
    /// Generated enum descriptor: integer type with a fixed value set.
    IntEnum(&'static [i64]),
}

/// Field list and parent-side capabilities of a record type.
#[derive(Debug, Clone)]
pub struct RecordShape {
    /// Declaration order; this order is observable in emitted `properties`.
    pub fields: Vec<FieldShape>,
    /// "Use this other type for property X": overrides a field's shape
    /// before recursing.
    pub property_alias: Option<fn(&str) -> Option<TypeShape>>,
    /// "Describe this field": becomes the field description when no tag
    /// description is present.
    pub field_doc: Option<fn(&str) -> Option<&'static str>>,
}

/// One declared field of a record shape.
#[derive(Debug, Clone)]
pub struct FieldShape {
    /// The declared identifier.
    pub name: &'static str,
    /// Lazy shape of the field's type.
    pub shape: fn() -> TypeShape,
    /// Tag texts keyed by tag name (`"json"`, `"jsonschema"`,
    /// `"jsonschema_extras"`), mirroring serialization-tag metadata.
    pub tags: Vec<(&'static str, &'static str)>,
    /// Anonymous/embedded field: inlined into the parent unless renamed.
    pub embedded: bool,
}

impl TypeShape {
    pub fn new<T: 'static>(name: &'static str, kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
            kind,
            custom_schema: None,
            alias: None,
            extend: None,
        }
    }

    /// Shape of a record type with the given definition name.
    pub fn record<T: 'static>(name: &'static str, record: RecordShape) -> Self {
        Self::new::<T>(name, Kind::Record(record))
    }

    /// Shape of a generated integer enum.
    pub fn int_enum<T: 'static>(name: &'static str, values: &'static [i64]) -> Self {
        Self::new::<T>(name, Kind::IntEnum(values))
    }

    pub fn with_custom_schema(mut self, f: fn() -> Schema) -> Self {
        self.custom_schema = Some(f);
        self
    }

    pub fn with_alias(mut self, f: fn() -> TypeShape) -> Self {
        self.alias = Some(f);
        self
    }

    pub fn with_extend(mut self, f: fn(&mut SchemaObject)) -> Self {
        self.extend = Some(f);
        self
    }
}

impl RecordShape {
    pub fn new(fields: Vec<FieldShape>) -> Self {
        Self {
            fields,
            property_alias: None,
            field_doc: None,
        }
    }

    pub fn with_property_alias(mut self, f: fn(&str) -> Option<TypeShape>) -> Self {
        self.property_alias = Some(f);
        self
    }

    pub fn with_field_doc(mut self, f: fn(&str) -> Option<&'static str>) -> Self {
        self.field_doc = Some(f);
        self
    }
}

impl FieldShape {
    pub fn new(name: &'static str, shape: fn() -> TypeShape) -> Self {
        Self {
            name,
            shape,
            tags: Vec::new(),
            embedded: false,
        }
    }

    /// Attach a tag text under a tag name.
    pub fn tag(mut self, key: &'static str, text: &'static str) -> Self {
        self.tags.push((key, text));
        self
    }

    /// Mark the field as anonymous/embedded.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    fn tag_text(&self, key: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, text)| *text)
    }
}

// ---------------------------------------------------------------------
// Reflect impls for primitives and well-known leaves
// ---------------------------------------------------------------------

macro_rules! leaf_shapes {
    ($($t:ty => $name:literal, $kind:expr;)*) => {
        $(impl Reflect for $t {
            fn shape() -> TypeShape {
                TypeShape::new::<$t>($name, $kind)
            }
        })*
    };
}

leaf_shapes! {
    bool => "bool", Kind::Bool;
    u8 => "u8", Kind::Integer;
    u16 => "u16", Kind::Integer;
    u32 => "u32", Kind::Integer;
    u64 => "u64", Kind::Integer;
    usize => "usize", Kind::Integer;
    i8 => "i8", Kind::Integer;
    i16 => "i16", Kind::Integer;
    i32 => "i32", Kind::Integer;
    i64 => "i64", Kind::Integer;
    isize => "isize", Kind::Integer;
    f32 => "f32", Kind::Float;
    f64 => "f64", Kind::Float;
    String => "String", Kind::Str;
    SmolStr => "SmolStr", Kind::Str;
    bytes::Bytes => "Bytes", Kind::Bytes;
    std::net::Ipv4Addr => "Ipv4Addr", Kind::IpV4;
    std::net::Ipv6Addr => "Ipv6Addr", Kind::IpV6;
    std::net::IpAddr => "IpAddr", Kind::IpV4;
    url::Url => "Url", Kind::Uri;
}

impl Reflect for &'static str {
    fn shape() -> TypeShape {
        TypeShape::new::<&'static str>("str", Kind::Str)
    }
}

impl Reflect for chrono::DateTime<chrono::Utc> {
    fn shape() -> TypeShape {
        TypeShape::new::<chrono::DateTime<chrono::Utc>>("DateTime", Kind::Timestamp)
    }
}

impl<T: Reflect + 'static> Reflect for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::new::<Option<T>>("Option", Kind::Optional(T::shape))
    }
}

impl<T: Reflect + 'static> Reflect for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::new::<Vec<T>>("Vec", Kind::Seq(T::shape))
    }
}

impl<T: Reflect + 'static> Reflect for std::collections::BTreeMap<String, T> {
    fn shape() -> TypeShape {
        TypeShape::new::<std::collections::BTreeMap<String, T>>("Map", Kind::Map(T::shape))
    }
}

impl<T: Reflect + 'static> Reflect for std::collections::HashMap<String, T> {
    fn shape() -> TypeShape {
        TypeShape::new::<std::collections::HashMap<String, T>>("Map", Kind::Map(T::shape))
    }
}

// ---------------------------------------------------------------------
// Reflector
// ---------------------------------------------------------------------

/// Shape-to-schema reflector.
///
/// Created once and read-only during traversal; a reflector may be shared
/// across threads (the parsed-tag cache sits behind a mutex, and the
/// `$defs` memo is per call). Reflection is deterministic for a fixed
/// shape and configuration, and never fails: malformed field metadata is
/// ignored best-effort.
#[derive(Debug)]
pub struct Reflector {
    /// Which tag supplies property names and the omit-if-empty marker.
    pub field_name_tag: SmolStr,
    /// Naming override, applied last to chosen property names and
    /// separately to `$defs` entry names.
    pub namer: Option<fn(&str) -> SmolStr>,
    /// Derive requiredness from a `required` schema-tag flag instead of
    /// the serialization tag's omit-if-empty convention.
    pub required_from_schema_tags: bool,
    /// When set, the root document's `$id` becomes
    /// `base_id.add(snake_case(root name))`.
    pub base_id: Option<SchemaId>,
    /// Inline the root record into the root document instead of emitting
    /// `$ref` plus a `$defs` entry.
    pub expand_root: bool,
    /// Give each `$defs` entry an `$anchor` equal to its name.
    pub assign_anchors: bool,
    tag_cache: Mutex<HashMap<(TypeId, &'static str), Arc<Vec<SmolStr>>>>,
}

#[derive(Default)]
struct Context {
    defs: OrderedMap<SmolStr, Schema>,
    seen: HashMap<TypeId, SmolStr>,
}

impl Default for Reflector {
    fn default() -> Self {
        Self {
            field_name_tag: SmolStr::new_static("json"),
            namer: None,
            required_from_schema_tags: false,
            base_id: None,
            expand_root: false,
            assign_anchors: false,
            tag_cache: Mutex::new(HashMap::new()),
        }
    }
}

impl Reflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflect a type into a root schema document.
    pub fn reflect<T: Reflect>(&self) -> Schema {
        self.reflect_shape(&T::shape())
    }

    /// Reflect an explicit shape into a root schema document.
    pub fn reflect_shape(&self, shape: &TypeShape) -> Schema {
        let mut ctx = Context::default();
        let node = self.walk(shape, &mut ctx);
        let mut root = match node {
            Schema::Object(obj) => *obj,
            // a custom schema may be a bare boolean; nothing to decorate
            done @ Schema::Bool(_) => return done,
        };

        if self.expand_root {
            if let Some(reference) = root.reference.take() {
                match reference
                    .strip_prefix("#/$defs/")
                    .and_then(|name| ctx.defs.remove(name))
                {
                    Some(Schema::Object(def)) => root = *def,
                    _ => root.reference = Some(reference),
                }
            }
        }

        root.version = Some(DRAFT_2020_12);
        if let Some(base) = &self.base_id {
            root.id = Some(base.add(&shape.name.to_snake_case()));
        }
        if !ctx.defs.is_empty() {
            root.defs = Some(ctx.defs);
        }
        Schema::Object(Box::new(root))
    }

    fn walk(&self, shape: &TypeShape, ctx: &mut Context) -> Schema {
        if let Some(custom) = shape.custom_schema {
            return custom();
        }
        if let Some(alias) = shape.alias {
            return self.walk(&alias(), ctx);
        }

        let mut obj = match &shape.kind {
            Kind::Bool => type_node("boolean"),
            Kind::Integer => type_node("integer"),
            Kind::Float => type_node("number"),
            Kind::Str => type_node("string"),
            Kind::Bytes => {
                let mut obj = type_node("string");
                obj.content_encoding = Some(SmolStr::new_static("base64"));
                obj
            }
            Kind::Timestamp => {
                let mut obj = type_node("string");
                obj.format = Some(SmolStr::new_static("date-time"));
                obj
            }
            Kind::IpV4 => {
                let mut obj = type_node("string");
                obj.format = Some(SmolStr::new_static("ipv4"));
                obj
            }
            Kind::IpV6 => {
                let mut obj = type_node("string");
                obj.format = Some(SmolStr::new_static("ipv6"));
                obj
            }
            Kind::Uri => {
                let mut obj = type_node("string");
                obj.format = Some(SmolStr::new_static("uri"));
                obj
            }
            Kind::Optional(inner) => return self.walk(&inner(), ctx),
            Kind::Seq(element) => {
                let mut obj = type_node("array");
                obj.items = Some(Box::new(self.walk(&element(), ctx)));
                obj
            }
            Kind::Map(value) => {
                let mut obj = type_node("object");
                obj.additional_properties = Some(Box::new(self.walk(&value(), ctx)));
                obj
            }
            Kind::IntEnum(values) => {
                let mut obj = type_node("integer");
                obj.enum_values = Some(values.iter().map(|v| Value::from(*v)).collect());
                obj
            }
            Kind::Record(record) => {
                let name = self.def_name(shape.name);
                if let Some(known) = ctx.seen.get(&shape.id) {
                    return Schema::reference(format_smolstr!("#/$defs/{known}"));
                }
                ctx.seen.insert(shape.id, name.clone());
                // reserve the slot so parent defs precede child defs
                ctx.defs.insert(name.clone(), Schema::always());
                let mut obj = self.reflect_record(shape.id, record, ctx);
                if self.assign_anchors {
                    obj.anchor = Some(name.clone());
                }
                if let Some(extend) = shape.extend {
                    extend(&mut obj);
                }
                ctx.defs.insert(name.clone(), Schema::Object(Box::new(obj)));
                return Schema::reference(format_smolstr!("#/$defs/{name}"));
            }
        };

        if let Some(extend) = shape.extend {
            extend(&mut obj);
        }
        Schema::Object(Box::new(obj))
    }

    fn reflect_record(
        &self,
        owner: TypeId,
        record: &RecordShape,
        ctx: &mut Context,
    ) -> SchemaObject {
        let mut obj = type_node("object");
        obj.additional_properties = Some(Box::new(Schema::never()));
        let mut properties = OrderedMap::new();
        let mut required = Vec::new();
        self.walk_fields(owner, record, &mut obj, &mut properties, &mut required, ctx);
        if !properties.is_empty() {
            obj.properties = Some(properties);
        }
        if !required.is_empty() {
            obj.required = Some(required);
        }
        obj
    }

    fn walk_fields(
        &self,
        owner: TypeId,
        record: &RecordShape,
        parent: &mut SchemaObject,
        properties: &mut OrderedMap<SmolStr, Schema>,
        required: &mut Vec<SmolStr>,
        ctx: &mut Context,
    ) {
        for field in &record.fields {
            let schema_frags = self.cached_fragments(owner, field);
            let (tag_name, tag_opts) = split_name_tag(field.tag_text(&self.field_name_tag));
            if tag_name == "-" || tags::has_flag(&schema_frags, "-") {
                continue;
            }

            let field_shape = record
                .property_alias
                .and_then(|alias| alias(field.name))
                .unwrap_or_else(|| (field.shape)());

            // embedded records with no name override are spliced into the
            // parent at the embedding position, as is anything tagged inline
            if (field.embedded && tag_name.is_empty()) || tags::has_flag(&schema_frags, "inline") {
                if let Some((inner_id, inner_record)) = as_record(&field_shape) {
                    self.walk_fields(inner_id, &inner_record, parent, properties, required, ctx);
                    continue;
                }
            }

            let chosen = if tag_name.is_empty() { field.name } else { tag_name };
            let prop_name = match self.namer {
                Some(namer) => namer(chosen),
                None => SmolStr::new(chosen),
            };

            let mut is_required = if self.required_from_schema_tags {
                tags::has_flag(&schema_frags, "required")
            } else {
                !tag_opts.contains(&"omitempty")
            };
            // an explicit required flag wins regardless of convention
            if tags::has_flag(&schema_frags, "required") {
                is_required = true;
            }

            let mut child = self.walk(&field_shape, ctx);
            if let Schema::Object(obj) = &mut child {
                let extras = tags::refine(obj, parent, &prop_name, &schema_frags);
                for (key, value) in extras {
                    obj.set_extra(key, value);
                }
                if let Some(text) = field.tag_text("jsonschema_extras") {
                    for fragment in tags::split_fragments(text) {
                        if let (key, Some(value)) = tags::key_value(&fragment) {
                            obj.set_extra(key, value);
                        }
                    }
                }
                if obj.description.is_none() {
                    if let Some(doc) = record.field_doc.and_then(|doc| doc(field.name)) {
                        obj.description = Some(doc.to_owned());
                    }
                }
            }

            if tags::has_flag(&schema_frags, "nullable") {
                let mut wrapper = SchemaObject::default();
                wrapper.one_of = Some(vec![child, Schema::of_type("null")]);
                child = wrapper.into();
            }

            if is_required {
                required.push(prop_name.clone());
            }
            properties.insert(prop_name, child);
        }
    }

    fn def_name(&self, name: &'static str) -> SmolStr {
        match self.namer {
            Some(namer) => namer(name),
            None => SmolStr::new(name),
        }
    }

    fn cached_fragments(&self, owner: TypeId, field: &FieldShape) -> Arc<Vec<SmolStr>> {
        let Some(text) = field.tag_text("jsonschema") else {
            return Arc::new(Vec::new());
        };
        let mut cache = self.tag_cache.lock().unwrap_or_else(|err| err.into_inner());
        cache
            .entry((owner, field.name))
            .or_insert_with(|| Arc::new(tags::split_fragments(text)))
            .clone()
    }
}

fn type_node(ty: &'static str) -> SchemaObject {
    SchemaObject {
        ty: Some(SmolStr::new_static(ty)),
        ..Default::default()
    }
}

/// The field name tag splits into a name and comma-separated options.
fn split_name_tag(text: Option<&'static str>) -> (&'static str, Vec<&'static str>) {
    match text {
        Some(text) => {
            let mut parts = text.split(',');
            let name = parts.next().unwrap_or("");
            (name, parts.collect())
        }
        None => ("", Vec::new()),
    }
}

/// Resolve a shape to its record form, looking through aliases and
/// optionality.
fn as_record(shape: &TypeShape) -> Option<(TypeId, RecordShape)> {
    if let Some(alias) = shape.alias {
        return as_record(&alias());
    }
    match &shape.kind {
        Kind::Record(record) => Some((shape.id, record.clone())),
        Kind::Optional(inner) => as_record(&inner()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_roots_get_the_dialect_header() {
        let reflector = Reflector::new();
        let schema = reflector.reflect::<i64>();
        let obj = schema.as_object().expect("object form");
        assert_eq!(obj.version, Some(DRAFT_2020_12));
        assert_eq!(obj.ty.as_deref(), Some("integer"));
        assert!(obj.defs.is_none());
    }

    #[test]
    fn well_known_leaves_get_fixed_formats() {
        let reflector = Reflector::new();
        let cases: Vec<(Schema, &str, Option<&str>)> = vec![
            (reflector.reflect::<chrono::DateTime<chrono::Utc>>(), "string", Some("date-time")),
            (reflector.reflect::<std::net::Ipv4Addr>(), "string", Some("ipv4")),
            (reflector.reflect::<std::net::Ipv6Addr>(), "string", Some("ipv6")),
            (reflector.reflect::<url::Url>(), "string", Some("uri")),
        ];
        for (schema, ty, format) in cases {
            let obj = schema.as_object().expect("object form");
            assert_eq!(obj.ty.as_deref(), Some(ty));
            assert_eq!(obj.format.as_deref(), format);
        }
    }

    #[test]
    fn byte_sequences_are_base64_strings() {
        let schema = Reflector::new().reflect::<bytes::Bytes>();
        let obj = schema.as_object().expect("object form");
        assert_eq!(obj.ty.as_deref(), Some("string"));
        assert_eq!(obj.content_encoding.as_deref(), Some("base64"));
    }

    #[test]
    fn sequences_and_maps_nest() {
        let schema = Reflector::new().reflect::<Vec<String>>();
        let obj = schema.as_object().expect("object form");
        assert_eq!(obj.ty.as_deref(), Some("array"));
        let items = obj.items.as_deref().and_then(Schema::as_object).expect("items");
        assert_eq!(items.ty.as_deref(), Some("string"));

        let schema = Reflector::new().reflect::<std::collections::BTreeMap<String, f64>>();
        let obj = schema.as_object().expect("object form");
        assert_eq!(obj.ty.as_deref(), Some("object"));
        let values = obj
            .additional_properties
            .as_deref()
            .and_then(Schema::as_object)
            .expect("values");
        assert_eq!(values.ty.as_deref(), Some("number"));
    }

    #[test]
    fn optionality_is_transparent_to_the_node() {
        let plain = Reflector::new().reflect::<u32>();
        let optional = Reflector::new().reflect::<Option<u32>>();
        assert_eq!(plain, optional);
    }

    #[test]
    fn int_enum_descriptor_values() {
        struct Level;
        let shape = TypeShape::int_enum::<Level>("Level", &[0, 10, 20]);
        let schema = Reflector::new().reflect_shape(&shape);
        let obj = schema.as_object().expect("object form");
        let def = obj
            .defs
            .as_ref()
            .map(|defs| defs.get("Level"))
            .flatten();
        // enums stay inline, no def is created
        assert!(def.is_none());
        assert_eq!(obj.ty.as_deref(), Some("integer"));
        assert_eq!(
            obj.enum_values,
            Some(vec![Value::from(0), Value::from(10), Value::from(20)])
        );
    }

    #[test]
    fn tag_fragments_are_parsed_once_per_field() {
        struct Thing;
        fn thing_shape() -> TypeShape {
            TypeShape::record::<Thing>(
                "Thing",
                RecordShape::new(vec![
                    FieldShape::new("count", u64::shape).tag("jsonschema", "minimum=1"),
                ]),
            )
        }
        let reflector = Reflector::new();
        reflector.reflect_shape(&thing_shape());
        reflector.reflect_shape(&thing_shape());
        let cache = reflector.tag_cache.lock().expect("unpoisoned");
        assert_eq!(cache.len(), 1);
        let fragments = cache
            .get(&(TypeId::of::<Thing>(), "count"))
            .expect("cached");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0], "minimum=1");
    }
}
