//! Canonical XML rendering of a merged schema tree.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::error::SchemaError;
use crate::node::{SchemaNode, SchemaTree};
use crate::ns::NATIVE_NAMESPACE;

/// Informational pointer carried on every dumped root.
const SCHEMA_LOCATION: &str = "https://canopy.dev/schema https://canopy.dev/schema.xsd";

impl SchemaTree {
    /// Renders the merged schema: hidden nodes elided, non-native top-level
    /// nodes renamed `prefix:local`, everything reattached to the native
    /// namespace, root children in lexical order, indented.
    pub fn dump_xml(&self) -> Result<String, SchemaError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        let mut root = BytesStart::new("MODULE");
        root.push_attribute(("xmlns", NATIVE_NAMESPACE));
        root.push_attribute((
            "xmlns:xsi",
            "http://www.w3.org/2001/XMLSchema-instance",
        ));
        root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        writer.write_event(Event::Start(root))?;

        let mut top: Vec<(String, SchemaNode)> = self
            .root()
            .children()
            .map(|c| (self.display_name(c), c))
            .collect();
        top.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, node) in top {
            write_node(&mut writer, node, Some(&name))?;
        }

        writer.write_event(Event::End(BytesEnd::new("MODULE")))?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| SchemaError::Internal(format!("dump produced invalid UTF-8: {}", e)))
    }

    /// `prefix:local` for non-native nodes with a known prefix, the bare name
    /// otherwise.
    fn display_name(&self, node: SchemaNode) -> String {
        let ns = node.namespace();
        if !ns.native {
            if let Some(prefix) = &ns.prefix {
                return format!("{}:{}", prefix, node.name());
            }
        }
        node.name().to_string()
    }
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: SchemaNode,
    name_override: Option<&str>,
) -> Result<(), std::io::Error> {
    if node.is_hidden() {
        return Ok(());
    }
    let tag = if node.is_value_enum() { "VALUE" } else { "NODE" };
    let mut el = BytesStart::new(tag);
    el.push_attribute(("name", name_override.unwrap_or(node.name())));
    let attrs: [(&str, Option<&str>); 15] = [
        ("mode", node.mode()),
        ("default", node.default_value()),
        ("pattern", node.pattern()),
        ("range", node.range_raw()),
        ("value", node.enum_value()),
        ("help", node.help()),
        ("idref_module", node.idref_module()),
        ("when", node.when_condition()),
        ("must", node.must_condition()),
        ("if-feature", node.if_feature()),
        ("model", node.model()),
        ("organization", node.organization()),
        ("version", node.version()),
        ("features", node.features()),
        ("deviations", node.deviations()),
    ];
    for (key, value) in attrs {
        if let Some(value) = value {
            el.push_attribute((key, value));
        }
    }

    let mut children = node.children().peekable();
    if children.peek().is_none() {
        writer.write_event(Event::Empty(el))?;
        return Ok(());
    }
    writer.write_event(Event::Start(el))?;
    for child in children {
        write_node(writer, child, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
