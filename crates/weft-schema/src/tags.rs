//! The per-field refinement mini-language.
//!
//! Schema tags are comma-separated fragment lists (`"title=Amount,minimum=1"`).
//! A backslash escapes a literal comma so regex patterns survive embedding in
//! a single tag value. Fragments are applied in two passes: generic keywords
//! first, then keywords specific to the node's resolved `type`. Anything
//! recognized by neither pass is handed back to the caller as key/value
//! pairs destined for the node's extras map.
//!
//! Refinement is best-effort by contract: a fragment that fails to parse is
//! dropped with a debug log, never an error.

use serde_json::{Number, Value};
use smol_str::SmolStr;

use crate::node::{Schema, SchemaObject};

/// Structural flags consumed by the reflector itself rather than the
/// refiner passes: these never become extras.
const STRUCTURAL_FLAGS: &[&str] = &["-", "required", "nullable", "inline"];

/// Split tag text on commas, resolving `\,` escapes.
pub(crate) fn split_fragments(tag: &str) -> Vec<SmolStr> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut chars = tag.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(',') => current.push(','),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ',' => {
                fragments.push(SmolStr::new(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fragments.push(SmolStr::new(&current));
    fragments
}

/// Split a fragment at its first `=`, if any.
pub(crate) fn key_value(fragment: &str) -> (&str, Option<&str>) {
    match fragment.split_once('=') {
        Some((key, value)) => (key, Some(value)),
        None => (fragment, None),
    }
}

/// Whether the fragment list contains a bare flag.
pub(crate) fn has_flag(fragments: &[SmolStr], flag: &str) -> bool {
    fragments.iter().any(|f| f == flag)
}

/// Apply schema-tag fragments to `node`, with `parent` available for
/// discriminator groups keyed off the property name.
///
/// Returns the `name=value` pairs recognized by neither pass; the caller
/// deposits them into the node's extras. Unknown bare flags are dropped.
pub(crate) fn refine<'a>(
    node: &mut SchemaObject,
    parent: &mut SchemaObject,
    property: &str,
    fragments: &'a [SmolStr],
) -> Vec<(&'a str, &'a str)> {
    let unprocessed = generic_keywords(node, parent, property, fragments);
    let leftover = match node.ty.as_deref() {
        Some("string") => string_keywords(node, unprocessed),
        Some("number") | Some("integer") => numeric_keywords(node, unprocessed),
        Some("array") => array_keywords(node, unprocessed),
        Some("boolean") => boolean_keywords(node, unprocessed),
        _ => unprocessed,
    };

    let mut extras = Vec::new();
    for fragment in leftover {
        match key_value(fragment) {
            (key, Some(value)) => extras.push((key, value)),
            (flag, None) => {
                if !flag.is_empty() && !STRUCTURAL_FLAGS.contains(&flag) {
                    tracing::debug!(property, flag, "ignoring unknown tag flag");
                }
            }
        }
    }
    extras
}

/// Keywords recognized regardless of the node's type.
fn generic_keywords<'a>(
    node: &mut SchemaObject,
    parent: &mut SchemaObject,
    property: &str,
    fragments: &'a [SmolStr],
) -> Vec<&'a SmolStr> {
    let mut unprocessed = Vec::new();
    for fragment in fragments {
        let (key, value) = key_value(fragment);
        let Some(value) = value else {
            unprocessed.push(fragment);
            continue;
        };
        match key {
            "title" => node.title = Some(value.to_owned()),
            "description" => node.description = Some(value.to_owned()),
            "type" => node.ty = Some(SmolStr::new(value)),
            "anchor" => node.anchor = Some(SmolStr::new(value)),
            "oneof_required" => {
                discriminator_group(parent.one_of.get_or_insert_with(Vec::new), value, property);
            }
            "anyof_required" => {
                discriminator_group(parent.any_of.get_or_insert_with(Vec::new), value, property);
            }
            "oneof_ref" => replace_with_refs(node, value, Composition::OneOf),
            "anyof_ref" => replace_with_refs(node, value, Composition::AnyOf),
            "oneof_type" => replace_with_types(node, value, Composition::OneOf),
            "anyof_type" => replace_with_types(node, value, Composition::AnyOf),
            _ => unprocessed.push(fragment),
        }
    }
    unprocessed
}

#[derive(Clone, Copy)]
enum Composition {
    OneOf,
    AnyOf,
}

/// Find or create the sub-schema titled `label` and append `property` to
/// its required list. First occurrence of a label creates the group;
/// encounter order is preserved in both the group list and the required
/// list.
fn discriminator_group(groups: &mut Vec<Schema>, label: &str, property: &str) {
    for group in groups.iter_mut() {
        if let Schema::Object(obj) = group {
            if obj.title.as_deref() == Some(label) {
                obj.required
                    .get_or_insert_with(Vec::new)
                    .push(SmolStr::new(property));
                return;
            }
        }
    }
    let mut obj = SchemaObject::default();
    obj.title = Some(label.to_owned());
    obj.required = Some(vec![SmolStr::new(property)]);
    groups.push(obj.into());
}

/// Replace the node's own `$ref` with a `oneOf`/`anyOf` list of
/// single-`$ref` schemas, one per `;`-separated entry. For sequences the
/// refinement belongs to the element schema, not the array node itself.
fn replace_with_refs(node: &mut SchemaObject, list: &str, mode: Composition) {
    if node.ty.as_deref() == Some("array") {
        if let Some(Schema::Object(items)) = node.items.as_deref_mut() {
            apply_refs(items, list, mode);
            return;
        }
    }
    apply_refs(node, list, mode);
}

fn apply_refs(target: &mut SchemaObject, list: &str, mode: Composition) {
    target.reference = None;
    let entries = list.split(';').map(Schema::reference);
    match mode {
        Composition::OneOf => target.one_of.get_or_insert_with(Vec::new).extend(entries),
        Composition::AnyOf => target.any_of.get_or_insert_with(Vec::new).extend(entries),
    }
}

/// Replace the node's `type` with a `oneOf`/`anyOf` list of single-type
/// schemas, with the same sequence rule as [`replace_with_refs`].
fn replace_with_types(node: &mut SchemaObject, list: &str, mode: Composition) {
    if node.ty.as_deref() == Some("array") {
        if let Some(Schema::Object(items)) = node.items.as_deref_mut() {
            apply_types(items, list, mode);
            return;
        }
    }
    apply_types(node, list, mode);
}

fn apply_types(target: &mut SchemaObject, list: &str, mode: Composition) {
    target.ty = None;
    let entries = list.split(';').map(Schema::of_type);
    match mode {
        Composition::OneOf => target.one_of.get_or_insert_with(Vec::new).extend(entries),
        Composition::AnyOf => target.any_of.get_or_insert_with(Vec::new).extend(entries),
    }
}

fn string_keywords<'a>(node: &mut SchemaObject, fragments: Vec<&'a SmolStr>) -> Vec<&'a SmolStr> {
    let mut unprocessed = Vec::new();
    for fragment in fragments {
        let (key, value) = key_value(fragment);
        let Some(value) = value else {
            unprocessed.push(fragment);
            continue;
        };
        match key {
            "minLength" => node.min_length = parse_count(key, value),
            "maxLength" => node.max_length = parse_count(key, value),
            "pattern" => node.pattern = Some(value.to_owned()),
            "format" => node.format = Some(SmolStr::new(value)),
            "readOnly" => node.read_only = parse_flag(key, value),
            "writeOnly" => node.write_only = parse_flag(key, value),
            "default" => node.default = Some(Value::String(value.to_owned())),
            "example" => node
                .examples
                .get_or_insert_with(Vec::new)
                .push(Value::String(value.to_owned())),
            "enum" => node
                .enum_values
                .get_or_insert_with(Vec::new)
                .push(Value::String(value.to_owned())),
            _ => unprocessed.push(fragment),
        }
    }
    unprocessed
}

fn numeric_keywords<'a>(node: &mut SchemaObject, fragments: Vec<&'a SmolStr>) -> Vec<&'a SmolStr> {
    let mut unprocessed = Vec::new();
    for fragment in fragments {
        let (key, value) = key_value(fragment);
        let Some(value) = value else {
            unprocessed.push(fragment);
            continue;
        };
        match key {
            "multipleOf" => node.multiple_of = parse_number(key, value),
            "minimum" => node.minimum = parse_number(key, value),
            "maximum" => node.maximum = parse_number(key, value),
            "exclusiveMinimum" => node.exclusive_minimum = parse_number(key, value),
            "exclusiveMaximum" => node.exclusive_maximum = parse_number(key, value),
            "default" => {
                if let Some(n) = parse_number(key, value) {
                    node.default = Some(Value::Number(n));
                }
            }
            "example" => {
                if let Some(n) = parse_number(key, value) {
                    node.examples.get_or_insert_with(Vec::new).push(Value::Number(n));
                }
            }
            "enum" => {
                if let Some(n) = parse_number(key, value) {
                    node.enum_values
                        .get_or_insert_with(Vec::new)
                        .push(Value::Number(n));
                }
            }
            _ => unprocessed.push(fragment),
        }
    }
    unprocessed
}

fn array_keywords<'a>(node: &mut SchemaObject, fragments: Vec<&'a SmolStr>) -> Vec<&'a SmolStr> {
    let mut unprocessed = Vec::new();
    for fragment in fragments {
        match key_value(fragment) {
            ("uniqueItems", None) => node.unique_items = Some(true),
            (key, Some(value)) => match key {
                "minItems" => node.min_items = parse_count(key, value),
                "maxItems" => node.max_items = parse_count(key, value),
                "default" => match &mut node.default {
                    Some(Value::Array(list)) => list.push(Value::String(value.to_owned())),
                    _ => node.default = Some(Value::Array(vec![Value::String(value.to_owned())])),
                },
                "format" => {
                    if let Some(items) = items_object(node) {
                        items.format = Some(SmolStr::new(value));
                    }
                }
                "pattern" => {
                    if let Some(items) = items_object(node) {
                        items.pattern = Some(value.to_owned());
                    }
                }
                _ => unprocessed.push(fragment),
            },
            _ => unprocessed.push(fragment),
        }
    }

    // whatever is left belongs to the element schema; dispatch by its type.
    // Arrays of arrays are not traversed further: the tag's ownership would
    // be ambiguous.
    if unprocessed.is_empty() {
        return unprocessed;
    }
    let Some(element_type) = items_object(node).and_then(|items| items.ty.clone()) else {
        return unprocessed;
    };
    let items = match items_object(node) {
        Some(items) => items,
        None => return unprocessed,
    };
    match element_type.as_str() {
        "string" => string_keywords(items, unprocessed),
        "number" | "integer" => numeric_keywords(items, unprocessed),
        "boolean" => boolean_keywords(items, unprocessed),
        _ => unprocessed,
    }
}

fn boolean_keywords<'a>(node: &mut SchemaObject, fragments: Vec<&'a SmolStr>) -> Vec<&'a SmolStr> {
    let mut unprocessed = Vec::new();
    for fragment in fragments {
        let (key, value) = key_value(fragment);
        match (key, value) {
            ("default", Some("true")) => node.default = Some(Value::Bool(true)),
            ("default", Some("false")) => node.default = Some(Value::Bool(false)),
            ("default", Some(other)) => {
                tracing::debug!(value = other, "dropping non-boolean default");
            }
            _ => unprocessed.push(fragment),
        }
    }
    unprocessed
}

fn items_object(node: &mut SchemaObject) -> Option<&mut SchemaObject> {
    node.items.as_deref_mut().and_then(Schema::as_object_mut)
}

fn parse_count(key: &str, value: &str) -> Option<u64> {
    match value.parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::debug!(key, value, "dropping unparsable count");
            None
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Option<bool> {
    match value.parse::<bool>() {
        Ok(b) => Some(b),
        Err(_) => {
            tracing::debug!(key, value, "dropping unparsable flag");
            None
        }
    }
}

/// Numeric tag literals parse as an integer first, then a float. Values
/// that are neither are dropped, never an error.
fn parse_number(key: &str, value: &str) -> Option<Number> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(Number::from(n));
    }
    if let Ok(f) = value.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Some(n);
        }
    }
    tracing::debug!(key, value, "dropping unparsable numeric literal");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frags(tag: &str) -> Vec<SmolStr> {
        split_fragments(tag)
    }

    #[test]
    fn split_honors_escaped_commas() {
        assert_eq!(frags("a,b=c"), vec!["a", "b=c"]);
        assert_eq!(frags(r"pattern=^\d{2\,4}$,minLength=2"), vec![
            r"pattern=^\d{2,4}$",
            "minLength=2",
        ]);
        assert_eq!(frags(""), vec![""]);
    }

    #[test]
    fn generic_keywords_apply_to_any_type() {
        let mut node = SchemaObject::default();
        node.ty = Some("integer".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("title=Amount,description=How much,anchor=amt");
        let extras = refine(&mut node, &mut parent, "amount", &fragments);

        assert!(extras.is_empty());
        assert_eq!(node.title.as_deref(), Some("Amount"));
        assert_eq!(node.description.as_deref(), Some("How much"));
        assert_eq!(node.anchor.as_deref(), Some("amt"));
    }

    #[test]
    fn numeric_bounds_on_integer_node() {
        let mut node = SchemaObject::default();
        node.ty = Some("integer".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("required,minimum=1,maximum=10");
        let extras = refine(&mut node, &mut parent, "count", &fragments);

        assert!(extras.is_empty());
        assert_eq!(node.minimum, Some(1.into()));
        assert_eq!(node.maximum, Some(10.into()));
    }

    #[test]
    fn unparsable_numerics_are_dropped() {
        let mut node = SchemaObject::default();
        node.ty = Some("number".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("minimum=lots,default=nope,maximum=2.5");
        refine(&mut node, &mut parent, "f", &fragments);

        assert_eq!(node.minimum, None);
        assert_eq!(node.default, None);
        assert_eq!(node.maximum, Some(Number::from_f64(2.5).expect("finite")));
    }

    #[test]
    fn string_keywords_accumulate_examples_and_enum() {
        let mut node = SchemaObject::default();
        node.ty = Some("string".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("minLength=1,maxLength=5,format=email,example=a@b.se,enum=x,enum=y");
        refine(&mut node, &mut parent, "mail", &fragments);

        assert_eq!(node.min_length, Some(1));
        assert_eq!(node.max_length, Some(5));
        assert_eq!(node.format.as_deref(), Some("email"));
        assert_eq!(node.examples, Some(vec![json!("a@b.se")]));
        assert_eq!(node.enum_values, Some(vec![json!("x"), json!("y")]));
    }

    #[test]
    fn discriminator_groups_accumulate_in_encounter_order() {
        let mut parent = SchemaObject::default();

        let mut foo = SchemaObject::default();
        foo.ty = Some("string".into());
        let fragments = frags("oneof_required=TypeA");
        refine(&mut foo, &mut parent, "Foo", &fragments);

        let mut bar = SchemaObject::default();
        bar.ty = Some("string".into());
        refine(&mut bar, &mut parent, "Bar", &fragments);

        let mut other = SchemaObject::default();
        other.ty = Some("string".into());
        let fragments_b = frags("oneof_required=TypeB");
        refine(&mut other, &mut parent, "Baz", &fragments_b);

        let groups = parent.one_of.as_ref().expect("groups created");
        assert_eq!(groups.len(), 2);
        let a = groups[0].as_object().expect("object");
        assert_eq!(a.title.as_deref(), Some("TypeA"));
        assert_eq!(a.required, Some(vec!["Foo".into(), "Bar".into()]));
        let b = groups[1].as_object().expect("object");
        assert_eq!(b.title.as_deref(), Some("TypeB"));
        assert_eq!(b.required, Some(vec!["Baz".into()]));
    }

    #[test]
    fn oneof_ref_replaces_the_nodes_own_ref() {
        let mut node = SchemaObject::default();
        node.reference = Some("#/$defs/Old".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("oneof_ref=#/$defs/A;#/$defs/B");
        refine(&mut node, &mut parent, "field", &fragments);

        assert_eq!(node.reference, None);
        let list = node.one_of.as_ref().expect("one_of");
        assert_eq!(list.len(), 2);
        assert_eq!(
            list[0].as_object().expect("object").reference.as_deref(),
            Some("#/$defs/A")
        );
    }

    #[test]
    fn oneof_ref_on_a_sequence_lands_on_items() {
        let mut node = SchemaObject::default();
        node.ty = Some("array".into());
        let mut items = SchemaObject::default();
        items.reference = Some("#/$defs/Old".into());
        node.items = Some(Box::new(items.into()));
        let mut parent = SchemaObject::default();
        let fragments = frags("anyof_ref=#/$defs/A;#/$defs/B");
        refine(&mut node, &mut parent, "field", &fragments);

        let items = node.items.as_deref().and_then(Schema::as_object).expect("items");
        assert_eq!(items.reference, None);
        assert_eq!(items.any_of.as_ref().map(Vec::len), Some(2));
        assert!(node.any_of.is_none());
    }

    #[test]
    fn oneof_type_replaces_type() {
        let mut node = SchemaObject::default();
        node.ty = Some("string".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("oneof_type=string;null");
        refine(&mut node, &mut parent, "field", &fragments);

        assert_eq!(node.ty, None);
        let list = node.one_of.as_ref().expect("one_of");
        assert_eq!(list[0].as_object().expect("object").ty.as_deref(), Some("string"));
        assert_eq!(list[1].as_object().expect("object").ty.as_deref(), Some("null"));
    }

    #[test]
    fn array_keywords_and_items_redispatch() {
        let mut node = SchemaObject::default();
        node.ty = Some("array".into());
        node.items = Some(Box::new(Schema::of_type("string")));
        let mut parent = SchemaObject::default();
        let fragments = frags("minItems=1,maxItems=4,uniqueItems,format=uri,minLength=2");
        let extras = refine(&mut node, &mut parent, "links", &fragments);

        assert!(extras.is_empty());
        assert_eq!(node.min_items, Some(1));
        assert_eq!(node.max_items, Some(4));
        assert_eq!(node.unique_items, Some(true));
        let items = node.items.as_deref().and_then(Schema::as_object).expect("items");
        // format/pattern belong to the element schema
        assert_eq!(items.format.as_deref(), Some("uri"));
        // and so do fragments the array pass does not recognize
        assert_eq!(items.min_length, Some(2));
    }

    #[test]
    fn array_default_accumulates_a_list() {
        let mut node = SchemaObject::default();
        node.ty = Some("array".into());
        node.items = Some(Box::new(Schema::of_type("string")));
        let mut parent = SchemaObject::default();
        let fragments = frags("default=a,default=b");
        refine(&mut node, &mut parent, "field", &fragments);

        assert_eq!(node.default, Some(json!(["a", "b"])));
    }

    #[test]
    fn arrays_of_arrays_are_not_traversed() {
        let mut inner = SchemaObject::default();
        inner.ty = Some("array".into());
        let mut node = SchemaObject::default();
        node.ty = Some("array".into());
        node.items = Some(Box::new(inner.into()));
        let mut parent = SchemaObject::default();
        let fragments = frags("minLength=2");
        refine(&mut node, &mut parent, "grid", &fragments);

        let items = node.items.as_deref().and_then(Schema::as_object).expect("items");
        assert_eq!(items.min_length, None);
    }

    #[test]
    fn boolean_default_takes_literals_only() {
        let mut node = SchemaObject::default();
        node.ty = Some("boolean".into());
        let mut parent = SchemaObject::default();
        refine(&mut node, &mut parent, "flag", &frags("default=true"));
        assert_eq!(node.default, Some(json!(true)));

        let mut node2 = SchemaObject::default();
        node2.ty = Some("boolean".into());
        refine(&mut node2, &mut parent, "flag", &frags("default=yes"));
        assert_eq!(node2.default, None);
    }

    #[test]
    fn unrecognized_pairs_flow_to_extras() {
        let mut node = SchemaObject::default();
        node.ty = Some("string".into());
        let mut parent = SchemaObject::default();
        let fragments = frags("minLength=1,vendor_hint=fast,required");
        let extras = refine(&mut node, &mut parent, "field", &fragments);

        assert_eq!(extras, vec![("vendor_hint", "fast")]);
    }
}
