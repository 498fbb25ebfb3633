//! JSON to and from data trees.
//!
//! Mirrors the XML direction over `serde_json::Value`. Lists and leaf-lists
//! encode as arrays under `JSON_ARRAYS` and as key-indexed objects otherwise;
//! `JSON_TYPES` selects typed scalar encoding for leaves.

use canopy_schema::{NATIVE_NAMESPACE, SchemaError, SchemaNode};
use canopy_types::tree::{escape_key, unescape_key};
use canopy_types::{DataTree, Flags};
use serde_json::{Map, Value};

use crate::condition::Conditions;
use crate::error::TranslateError;
use crate::Translator;

impl<'a> Translator<'a> {
    /// Renders a data tree as a JSON value rooted in a single property.
    pub fn to_json(&self, data: &DataTree, flags: Flags) -> Result<Value, TranslateError> {
        if flags.contains(Flags::DEBUG) {
            log::debug!("to_json '{}' ({:?})", data.name(), flags);
        }
        let conds = Conditions::new(self.evaluator);
        let mut map = Map::new();
        if let Some((key, value)) =
            self.json_node(self.tree.root(), NATIVE_NAMESPACE, data, data, flags, 0, &conds, "")?
        {
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    #[allow(clippy::too_many_arguments)]
    fn json_node(
        &self,
        schema_parent: SchemaNode<'a>,
        parent_href: &str,
        root: &DataTree,
        data: &DataTree,
        flags: Flags,
        depth: usize,
        conds: &Conditions,
        path: &str,
    ) -> Result<Option<(String, Value)>, TranslateError> {
        let raw_name = if depth == 0 {
            data.name().trim_start_matches('/')
        } else {
            data.name()
        };
        let (name, ns_href) = self.resolve_data_name(raw_name, flags);
        let Some(schema) = schema_parent.child_by_name(name, ns_href) else {
            return Err(SchemaError::NoSchemaNode(format!("{}/{}", path, raw_name)).into());
        };
        let path = format!("{}/{}", path, schema.name());
        if !schema.is_readable() {
            log::debug!("not readable: {}", path);
            return Ok(None);
        }
        if !conds.check(schema, root, &path, flags) {
            return Ok(None);
        }

        let href = &schema.namespace().href;
        let key = self.json_property_name(schema, parent_href, flags);

        if schema.is_leaf() {
            if flags.contains(Flags::CONFIG) && !schema.is_writable() {
                return Ok(None);
            }
            if flags.contains(Flags::STRIP_DATA) {
                return Ok(Some((key, Value::Null)));
            }
            let Some(display) = schema.translate_to(data.value()) else {
                return Ok(None);
            };
            let display = self.idref_value(schema, display, flags);
            return Ok(Some((key, typed_value(schema, &display, flags))));
        }

        if schema.is_leaf_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a leaf-list always has its wildcard child");
            let entries = self.ordered_children(schema, data);
            if flags.contains(Flags::JSON_ARRAYS) {
                let values: Vec<Value> = entries
                    .iter()
                    .map(|entry| {
                        // The entry name is the escaped form of the value.
                        let value = entry
                            .value()
                            .map(str::to_string)
                            .unwrap_or_else(|| unescape_key(entry.name()));
                        let display = entry_schema
                            .translate_to(Some(value.as_str()))
                            .unwrap_or_else(|| value.clone());
                        typed_value(entry_schema, &display, flags)
                    })
                    .collect();
                return Ok(Some((key, Value::Array(values))));
            }
            let mut map = Map::new();
            for entry in entries {
                let value = entry
                    .value()
                    .map(str::to_string)
                    .unwrap_or_else(|| unescape_key(entry.name()));
                map.insert(unescape_key(entry.name()), Value::String(value));
            }
            if map.is_empty() {
                return Ok(None);
            }
            return Ok(Some((key, Value::Object(map))));
        }

        if schema.is_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a list always has its wildcard child");
            let key_name = schema.list_key().map(|k| k.name().to_string());
            let entries = self.ordered_children(schema, data);
            if flags.contains(Flags::JSON_ARRAYS) {
                let mut array = Vec::new();
                for entry in entries {
                    let mut object = self.json_children(
                        entry_schema,
                        href,
                        root,
                        entry,
                        flags,
                        depth,
                        conds,
                        &path,
                    )?;
                    // The entry's key always appears as a property.
                    if let Some(key_name) = &key_name {
                        if !object.contains_key(key_name) && entry.name() != "*" {
                            let key_schema = schema.list_key().expect("key checked above");
                            object.insert(
                                key_name.clone(),
                                typed_value(key_schema, &unescape_key(entry.name()), flags),
                            );
                        }
                    }
                    if !object.is_empty() {
                        array.push(Value::Object(object));
                    }
                }
                return Ok(Some((key, Value::Array(array))));
            }
            let mut map = Map::new();
            for entry in entries {
                let object = self.json_children(
                    entry_schema,
                    href,
                    root,
                    entry,
                    flags,
                    depth,
                    conds,
                    &path,
                )?;
                if !object.is_empty() {
                    map.insert(unescape_key(entry.name()), Value::Object(object));
                }
            }
            if map.is_empty() {
                return Ok(None);
            }
            return Ok(Some((key, Value::Object(map))));
        }

        // Containers and presence containers.
        let object = self.json_children(schema, href, root, data, flags, depth, conds, &path)?;
        if object.is_empty() && !schema.is_presence_container() {
            return Ok(None);
        }
        Ok(Some((key, Value::Object(object))))
    }

    #[allow(clippy::too_many_arguments)]
    fn json_children(
        &self,
        schema: SchemaNode<'a>,
        parent_href: &str,
        root: &DataTree,
        data: &DataTree,
        flags: Flags,
        depth: usize,
        conds: &Conditions,
        path: &str,
    ) -> Result<Map<String, Value>, TranslateError> {
        let mut map = Map::new();
        for child in self.ordered_children(schema, data) {
            if let Some((key, value)) =
                self.json_node(schema, parent_href, root, child, flags, depth + 1, conds, path)?
            {
                map.insert(key, value);
            }
        }
        Ok(map)
    }

    /// `module:local` naming across namespace changes when `NS_PREFIX` is
    /// set; the bare name otherwise.
    fn json_property_name(
        &self,
        schema: SchemaNode<'a>,
        parent_href: &str,
        flags: Flags,
    ) -> String {
        let ns = schema.namespace();
        if flags.contains(Flags::NS_PREFIX) && ns.href != parent_href {
            let module = schema
                .model()
                .map(str::to_string)
                .or_else(|| ns.prefix.clone());
            if let Some(module) = module {
                return format!("{}:{}", module, schema.name());
            }
        }
        schema.name().to_string()
    }

    /// Parses a JSON document (a single root property) into a data tree.
    pub fn from_json(&self, json: &Value, flags: Flags) -> Result<DataTree, TranslateError> {
        let Some(object) = json.as_object() else {
            return Err(TranslateError::Malformed(
                "top-level JSON value must be an object".into(),
            ));
        };
        if object.len() != 1 {
            return Err(TranslateError::Malformed(format!(
                "expected a single root property, found {}",
                object.len()
            )));
        }
        let conds = Conditions::new(self.evaluator);
        let mut holder = DataTree::new("");
        for (name, value) in object {
            self.absorb_json(name, value, self.tree.root(), &mut holder, flags, "", &conds)?;
        }
        holder
            .children_mut()
            .pop()
            .ok_or_else(|| TranslateError::Malformed("empty document".into()))
    }

    #[allow(clippy::too_many_arguments)]
    fn absorb_json(
        &self,
        name: &str,
        value: &Value,
        schema_parent: SchemaNode<'a>,
        parent_data: &mut DataTree,
        flags: Flags,
        path: &str,
        conds: &Conditions,
    ) -> Result<(), TranslateError> {
        let (local, ns_href) = self.resolve_data_name(name, flags);
        let Some(schema) = schema_parent.child_by_name(local, ns_href) else {
            return Err(SchemaError::NoSchemaNode(format!("{}/{}", path, name)).into());
        };
        let path_here = format!("{}/{}", path, schema.name());
        if !conds.check(schema, parent_data, &path_here, flags) {
            return Err(TranslateError::Malformed(format!(
                "condition failed for '{}'",
                path_here
            )));
        }

        if schema.is_leaf() {
            if !schema.is_writable() {
                return Err(SchemaError::NotWritable(path_here).into());
            }
            let text = scalar_to_string(value).ok_or_else(|| {
                TranslateError::Malformed(format!("'{}' expects a scalar value", path_here))
            })?;
            let canonical = schema.translate_from(&text);
            schema.validate(&canonical)?;
            let leaf = parent_data.child_or_insert(schema.name());
            if flags.contains(Flags::STRIP_DATA) {
                leaf.children_mut().clear();
            } else {
                leaf.set_value(canonical);
            }
            return Ok(());
        }

        if schema.is_leaf_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a leaf-list always has its wildcard child");
            let node = parent_data.child_or_insert(schema.name());
            match value {
                Value::Array(items) => {
                    for item in items {
                        let text = scalar_to_string(item).ok_or_else(|| {
                            TranslateError::Malformed(format!(
                                "'{}' expects scalar entries",
                                path_here
                            ))
                        })?;
                        let canonical = entry_schema.translate_from(&text);
                        entry_schema.validate(&canonical)?;
                        node.child_or_insert(&escape_key(&canonical))
                            .set_value(canonical.clone());
                    }
                }
                Value::Object(map) => {
                    for (_, item) in map {
                        let text = scalar_to_string(item).ok_or_else(|| {
                            TranslateError::Malformed(format!(
                                "'{}' expects scalar entries",
                                path_here
                            ))
                        })?;
                        let canonical = entry_schema.translate_from(&text);
                        entry_schema.validate(&canonical)?;
                        node.child_or_insert(&escape_key(&canonical))
                            .set_value(canonical.clone());
                    }
                }
                _ => {
                    return Err(TranslateError::Malformed(format!(
                        "'{}' expects an array or object",
                        path_here
                    )));
                }
            }
            return Ok(());
        }

        if schema.is_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a list always has its wildcard child");
            let key_name = schema.list_key().map(|k| k.name().to_string()).ok_or_else(
                || TranslateError::Malformed(format!("list '{}' has no key", path_here)),
            )?;
            let node = parent_data.child_or_insert(schema.name());
            match value {
                Value::Array(items) => {
                    for item in items {
                        let Some(object) = item.as_object() else {
                            return Err(TranslateError::Malformed(format!(
                                "'{}' expects entry objects",
                                path_here
                            )));
                        };
                        let key_value = object
                            .get(&key_name)
                            .and_then(scalar_to_string)
                            .ok_or_else(|| TranslateError::KeyMissing(path_here.clone()))?;
                        // Keys holding '/' must survive as one path segment.
                        let entry = node.child_or_insert(&escape_key(&key_value));
                        let entry_path = format!("{}/{}", path_here, key_value);
                        for (child_name, child_value) in object {
                            self.absorb_json(
                                child_name,
                                child_value,
                                entry_schema,
                                entry,
                                flags,
                                &entry_path,
                                conds,
                            )?;
                        }
                    }
                }
                Value::Object(map) => {
                    for (key_value, entry_value) in map {
                        let Some(object) = entry_value.as_object() else {
                            return Err(TranslateError::Malformed(format!(
                                "'{}' expects entry objects",
                                path_here
                            )));
                        };
                        let entry = node.child_or_insert(&escape_key(key_value));
                        let entry_path = format!("{}/{}", path_here, key_value);
                        for (child_name, child_value) in object {
                            self.absorb_json(
                                child_name,
                                child_value,
                                entry_schema,
                                entry,
                                flags,
                                &entry_path,
                                conds,
                            )?;
                        }
                    }
                }
                _ => {
                    return Err(TranslateError::Malformed(format!(
                        "'{}' expects an array or object",
                        path_here
                    )));
                }
            }
            return Ok(());
        }

        // Containers and presence containers.
        let Some(object) = value.as_object() else {
            return Err(TranslateError::Malformed(format!(
                "'{}' expects an object",
                path_here
            )));
        };
        let node = parent_data.child_or_insert(schema.name());
        for (child_name, child_value) in object {
            self.absorb_json(
                child_name,
                child_value,
                schema,
                node,
                flags,
                &path_here,
                conds,
            )?;
        }
        Ok(())
    }
}

/// The typed JSON encoding of a leaf value: integer when the leaf has a
/// range and no pattern and the text parses, boolean for an exact
/// `{true, false}` enumeration, string otherwise.
fn typed_value(schema: SchemaNode, value: &str, flags: Flags) -> Value {
    if !flags.contains(Flags::JSON_TYPES) {
        return Value::String(value.to_string());
    }
    let enum_names: Vec<&str> = schema.enums().map(|e| e.name()).collect();
    if enum_names.len() == 2
        && enum_names.contains(&"true")
        && enum_names.contains(&"false")
        && (value == "true" || value == "false")
    {
        return Value::Bool(value == "true");
    }
    if schema.pattern().is_none() && schema.range().is_some() {
        if let Ok(n) = value.parse::<i64>() {
            return Value::Number(n.into());
        }
        if let Ok(n) = value.parse::<u64>() {
            return Value::Number(n.into());
        }
    }
    Value::String(value.to_string())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_tree() -> canopy_schema::SchemaTree {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test.xml"),
            r#"<MODULE xmlns="https://canopy.dev/schema">
  <NODE name="test">
    <NODE name="settings">
      <NODE name="debug" mode="rw" default="0">
        <VALUE name="disable" value="0"/>
        <VALUE name="enable" value="1"/>
      </NODE>
      <NODE name="enable" mode="rw" default="false">
        <VALUE name="true" value="true"/>
        <VALUE name="false" value="false"/>
      </NODE>
      <NODE name="priority" mode="rw" range="-10..10"/>
      <NODE name="counter" mode="r" range="0..4294967295"/>
    </NODE>
    <NODE name="users">
      <NODE name="user">
        <NODE name="*">
          <NODE name="name" mode="rw"/>
          <NODE name="home" mode="rw"/>
        </NODE>
      </NODE>
    </NODE>
    <NODE name="animals">
      <NODE name="animal">
        <NODE name="*">
          <NODE name="name" mode="rw"/>
          <NODE name="type" mode="rw" default="1">
            <VALUE name="big" value="1"/>
            <VALUE name="little" value="2"/>
          </NODE>
          <NODE name="toys">
            <NODE name="*" mode="rw"/>
          </NODE>
        </NODE>
      </NODE>
    </NODE>
  </NODE>
</MODULE>"#,
        )
        .unwrap();
        canopy_schema::load(dir.path().to_str().unwrap()).unwrap()
    }

    fn sample_data() -> DataTree {
        let mut root = DataTree::new("test");
        let settings = root.push(DataTree::new("settings"));
        settings.push(DataTree::leaf("priority", "5"));
        settings.push(DataTree::leaf("enable", "true"));
        let animals = root.push(DataTree::new("animals"));
        let animal = animals.push(DataTree::new("animal"));
        let cat = animal.push(DataTree::new("cat"));
        cat.push(DataTree::leaf("name", "cat"));
        cat.push(DataTree::leaf("type", "2"));
        let toys = cat.push(DataTree::new("toys"));
        toys.push(DataTree::leaf("ball", "ball"));
        toys.push(DataTree::leaf("mouse", "mouse"));
        root
    }

    #[test]
    fn test_to_json_typed_arrays() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let flags = Flags::JSON_ARRAYS | Flags::JSON_TYPES;
        let value = translator.to_json(&sample_data(), flags).unwrap();
        assert_eq!(
            value,
            json!({
                "test": {
                    "settings": { "priority": 5, "enable": true },
                    "animals": {
                        "animal": [
                            {
                                "name": "cat",
                                "type": "little",
                                "toys": ["ball", "mouse"]
                            }
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn test_to_json_plain_objects() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let value = translator.to_json(&sample_data(), Flags::empty()).unwrap();
        assert_eq!(
            value["test"]["animals"]["animal"]["cat"]["type"],
            json!("little")
        );
        assert_eq!(value["test"]["settings"]["priority"], json!("5"));
    }

    #[test]
    fn test_json_round_trip_typed() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let flags = Flags::JSON_ARRAYS | Flags::JSON_TYPES;
        let data = sample_data();
        let value = translator.to_json(&data, flags).unwrap();
        let back = translator.from_json(&value, flags).unwrap();
        let mut expect = data.leaves();
        let mut got = back.leaves();
        expect.sort();
        got.sort();
        assert_eq!(expect, got);
    }

    #[test]
    fn test_from_json_accepts_typed_scalars() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let value = json!({ "test": { "settings": { "priority": -3, "enable": false } } });
        let data = translator.from_json(&value, Flags::JSON_TYPES).unwrap();
        let settings = data.find_child("settings").unwrap();
        assert_eq!(settings.find_child("priority").unwrap().value(), Some("-3"));
        assert_eq!(settings.find_child("enable").unwrap().value(), Some("false"));
    }

    #[test]
    fn test_from_json_rejects_readonly_leaf() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let value = json!({ "test": { "settings": { "counter": 1 } } });
        assert!(matches!(
            translator.from_json(&value, Flags::empty()),
            Err(TranslateError::Schema(SchemaError::NotWritable(_)))
        ));
    }

    #[test]
    fn test_from_json_rejects_out_of_range() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let value = json!({ "test": { "settings": { "priority": 99 } } });
        assert!(matches!(
            translator.from_json(&value, Flags::empty()),
            Err(TranslateError::Schema(SchemaError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_from_json_list_key_missing() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let value = json!({ "test": { "animals": { "animal": [ { "type": "big" } ] } } });
        assert!(matches!(
            translator.from_json(&value, Flags::JSON_ARRAYS),
            Err(TranslateError::KeyMissing(_))
        ));
    }

    #[test]
    fn test_list_key_with_slash_survives_round_trip() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let flags = Flags::JSON_ARRAYS;
        let value = json!({
            "test": { "users": { "user": [
                { "name": "svc/web", "home": "/srv/web" }
            ] } }
        });
        let data = translator.from_json(&value, flags).unwrap();
        let user = data
            .find_child("users")
            .and_then(|u| u.find_child("user"))
            .unwrap();
        // The key segment is percent-escaped in the data tree.
        let entry = user.find_child("svc%2Fweb").unwrap();
        assert_eq!(entry.find_child("name").unwrap().value(), Some("svc/web"));

        let back = translator.to_json(&data, flags).unwrap();
        assert_eq!(back["test"]["users"]["user"][0]["name"], json!("svc/web"));
    }

    #[test]
    fn test_leaf_list_value_with_slash_round_trips() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let flags = Flags::JSON_ARRAYS;
        let value = json!({
            "test": { "animals": { "animal": [
                { "name": "cat", "toys": ["ball/red"] }
            ] } }
        });
        let data = translator.from_json(&value, flags).unwrap();
        let toys = data
            .find_child("animals")
            .and_then(|a| a.find_child("animal"))
            .and_then(|a| a.find_child("cat"))
            .and_then(|c| c.find_child("toys"))
            .unwrap();
        // Escaped as a path segment, raw as a value.
        let entry = toys.find_child("ball%2Fred").unwrap();
        assert_eq!(entry.value(), Some("ball/red"));

        let back = translator.to_json(&data, flags).unwrap();
        assert_eq!(
            back["test"]["animals"]["animal"][0]["toys"],
            json!(["ball/red"])
        );
    }

    #[test]
    fn test_enum_translation_to_display_and_back() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let mut data = DataTree::new("test");
        let settings = data.push(DataTree::new("settings"));
        settings.push(DataTree::leaf("debug", "1"));
        let value = translator.to_json(&data, Flags::JSON_TYPES).unwrap();
        // Canonical "1" renders as the enum name, as a string even with
        // typed JSON.
        assert_eq!(value["test"]["settings"]["debug"], json!("enable"));
        let back = translator.from_json(&value, Flags::JSON_TYPES).unwrap();
        let debug = back
            .find_child("settings")
            .and_then(|s| s.find_child("debug"))
            .unwrap();
        assert_eq!(debug.value(), Some("1"));
    }

    #[test]
    fn test_from_json_rejects_multi_root() {
        let tree = test_tree();
        let translator = Translator::new(&tree);
        let value = json!({ "test": {}, "other": {} });
        assert!(matches!(
            translator.from_json(&value, Flags::empty()),
            Err(TranslateError::Malformed(_))
        ));
    }

    #[test]
    fn test_typed_value_rules() {
        let tree = test_tree();
        let priority = tree.lookup("/test/settings/priority", Flags::empty()).unwrap();
        assert_eq!(typed_value(priority, "7", Flags::JSON_TYPES), json!(7));
        assert_eq!(typed_value(priority, "7", Flags::empty()), json!("7"));
        let enable = tree.lookup("/test/settings/enable", Flags::empty()).unwrap();
        assert_eq!(typed_value(enable, "true", Flags::JSON_TYPES), json!(true));
        let counter = tree.lookup("/test/settings/counter", Flags::empty()).unwrap();
        assert_eq!(
            typed_value(counter, "4294967295", Flags::JSON_TYPES),
            json!(4294967295u64)
        );
        assert_eq!(
            typed_value(counter, "not-a-number", Flags::JSON_TYPES),
            json!("not-a-number")
        );
    }
}
