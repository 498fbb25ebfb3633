//! XML to and from data trees.
//!
//! Output builds an intermediate element tree so empty containers can be
//! discarded before anything is written, then serializes it in one pass.
//! Input walks a parsed document alongside the schema, collecting edit
//! operations into their four xpath buckets as it goes.

use canopy_schema::{NATIVE_NAMESPACE, SchemaError, SchemaNode};
use canopy_types::tree::{escape_key, unescape_key};
use canopy_types::{DataTree, Flags};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::condition::Conditions;
use crate::error::{EditError, EditErrorTag, TranslateError};
use crate::{ParseMode, Translator};

/// Edit-operation xpaths, bucketed by the operation that introduced them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditOps {
    pub deletes: Vec<String>,
    pub removes: Vec<String>,
    pub creates: Vec<String>,
    pub replaces: Vec<String>,
}

impl EditOps {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
            && self.removes.is_empty()
            && self.creates.is_empty()
            && self.replaces.is_empty()
    }
}

/// Result of XML to data tree translation.
#[derive(Debug)]
pub struct XmlParse {
    pub tree: DataTree,
    pub ops: EditOps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditOp {
    Merge,
    Delete,
    Remove,
    Create,
    Replace,
}

impl EditOp {
    fn parse(value: &str) -> Result<EditOp, EditError> {
        Ok(match value {
            "merge" => EditOp::Merge,
            "delete" => EditOp::Delete,
            "remove" => EditOp::Remove,
            "create" => EditOp::Create,
            "replace" => EditOp::Replace,
            other => {
                return Err(EditError::with_attribute(
                    EditErrorTag::BadAttribute,
                    "operation",
                    format!("unknown operation '{}'", other),
                ));
            }
        })
    }
}

/// An element waiting to be serialized.
struct XmlElem {
    name: String,
    /// `xmlns` to stamp, when the namespace changed from the parent.
    ns: Option<String>,
    text: Option<String>,
    children: Vec<XmlElem>,
}

impl XmlElem {
    fn new(name: impl Into<String>) -> Self {
        XmlElem {
            name: name.into(),
            ns: None,
            text: None,
            children: Vec::new(),
        }
    }
}

impl<'a> Translator<'a> {
    /// Renders a data tree as an XML document string.
    pub fn to_xml(&self, data: &DataTree, flags: Flags) -> Result<String, TranslateError> {
        if flags.contains(Flags::DEBUG) {
            log::debug!("to_xml '{}' ({:?})", data.name(), flags);
        }
        let conds = Conditions::new(self.evaluator);
        let elems = self.build_elems(
            self.tree.root(),
            NATIVE_NAMESPACE,
            data,
            data,
            flags,
            0,
            &conds,
            "",
        )?;
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        for elem in &elems {
            write_elem(&mut writer, elem)?;
        }
        String::from_utf8(writer.into_inner())
            .map_err(|e| TranslateError::Malformed(e.to_string()))
    }

    /// Builds the XML elements for one data node. Lists and leaf-lists
    /// produce one element per entry, hence the vector.
    #[allow(clippy::too_many_arguments)]
    fn build_elems(
        &self,
        schema_parent: SchemaNode<'a>,
        parent_href: &str,
        root: &DataTree,
        data: &DataTree,
        flags: Flags,
        depth: usize,
        conds: &Conditions,
        path: &str,
    ) -> Result<Vec<XmlElem>, TranslateError> {
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
            return Ok(Vec::new());
        }
        if !conds.check(schema, root, &path, flags) {
            return Ok(Vec::new());
        }

        let href = &schema.namespace().href;
        let stamp = (href != parent_href).then(|| href.clone());

        if schema.is_leaf() {
            return Ok(self
                .build_leaf(schema, data, flags, stamp)
                .into_iter()
                .collect());
        }
        if schema.is_leaf_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a leaf-list always has its wildcard child");
            let mut out = Vec::new();
            for entry in self.ordered_children(schema, data) {
                // The entry name is the escaped form of the value.
                let value = entry
                    .value()
                    .map(str::to_string)
                    .unwrap_or_else(|| unescape_key(entry.name()));
                let display = entry_schema
                    .translate_to(Some(value.as_str()))
                    .unwrap_or_else(|| value.clone());
                let mut elem = XmlElem::new(schema.name());
                elem.ns = stamp.clone();
                if !flags.contains(Flags::STRIP_DATA) {
                    elem.text = Some(display);
                }
                out.push(elem);
            }
            return Ok(out);
        }
        if schema.is_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a list always has its wildcard child");
            let key_name = schema.list_key().map(|k| k.name().to_string());
            let mut out = Vec::new();
            for entry in self.ordered_children(schema, data) {
                let mut elem = XmlElem::new(schema.name());
                elem.ns = stamp.clone();
                // XPath-style output wants the key visible as the first
                // child even when the data only carries it as the entry
                // name.
                if flags.contains(Flags::XPATH) {
                    if let Some(key_name) = &key_name {
                        if entry.find_child(key_name).is_none() && entry.name() != "*" {
                            let mut key_elem = XmlElem::new(key_name.clone());
                            key_elem.text = Some(unescape_key(entry.name()));
                            elem.children.push(key_elem);
                        }
                    }
                }
                for child in self.ordered_children(entry_schema, entry) {
                    elem.children.extend(self.build_elems(
                        entry_schema,
                        href,
                        root,
                        child,
                        flags,
                        depth + 1,
                        conds,
                        &format!("{}/{}", path, entry.name()),
                    )?);
                }
                if !elem.children.is_empty() {
                    out.push(elem);
                }
            }
            return Ok(out);
        }

        // Containers and presence containers.
        let mut elem = XmlElem::new(schema.name());
        elem.ns = stamp;
        for child in self.ordered_children(schema, data) {
            elem.children.extend(self.build_elems(
                schema,
                href,
                root,
                child,
                flags,
                depth + 1,
                conds,
                &path,
            )?);
        }
        if elem.children.is_empty() && !schema.is_presence_container() {
            return Ok(Vec::new());
        }
        Ok(vec![elem])
    }

    fn build_leaf(
        &self,
        schema: SchemaNode<'a>,
        data: &DataTree,
        flags: Flags,
        stamp: Option<String>,
    ) -> Option<XmlElem> {
        if flags.contains(Flags::CONFIG) && !schema.is_writable() {
            return None;
        }
        let mut elem = XmlElem::new(schema.name());
        elem.ns = stamp;
        if !flags.contains(Flags::STRIP_DATA) {
            if let Some(display) = schema.translate_to(data.value()) {
                elem.text = Some(self.idref_value(schema, display, flags));
            }
        }
        Some(elem)
    }

    /// Prefixes identityref values with their module name when requested.
    pub(crate) fn idref_value(
        &self,
        schema: SchemaNode<'a>,
        value: String,
        flags: Flags,
    ) -> String {
        if flags.contains(Flags::IDREF_VALUES) {
            if let Some(module) = schema.idref_module() {
                if !value.is_empty() && !value.contains(':') {
                    return format!("{}:{}", module, value);
                }
            }
        }
        value
    }

    /// `prefix:name` resolution for data-tree node names: against namespace
    /// prefixes, against model names when `NS_MODEL_NAME` is set, and
    /// against model names as a fallback either way, since module-prefixed
    /// JSON carries model names rather than declared prefixes.
    pub(crate) fn resolve_data_name<'n>(
        &self,
        name: &'n str,
        flags: Flags,
    ) -> (&'n str, Option<&str>) {
        let Some((prefix, local)) = name.split_once(':') else {
            return (name, None);
        };
        let by_model = || {
            self.tree
                .models()
                .iter()
                .find(|m| m.model == prefix)
                .map(|m| m.ns_href.as_str())
        };
        if flags.contains(Flags::NS_MODEL_NAME) {
            if let Some(href) = by_model() {
                return (local, Some(href));
            }
        }
        if let Some(ns) = self.tree.namespace_by_prefix(prefix) {
            return (local, Some(ns.href.as_str()));
        }
        if let Some(href) = by_model() {
            return (local, Some(href));
        }
        (name, None)
    }

    /// Children of `data` in canonical order: schema order for containers,
    /// key/value order for lists and leaf-lists.
    pub(crate) fn ordered_children<'d>(
        &self,
        schema: SchemaNode<'a>,
        data: &'d DataTree,
    ) -> Vec<&'d DataTree> {
        let mut refs: Vec<&'d DataTree> = data.children().iter().collect();
        if schema.is_leaf_list() {
            let numeric = schema
                .wildcard_child()
                .is_some_and(|entry| entry.range().is_some());
            refs.sort_by(|a, b| crate::traverse::value_order(a.name(), b.name(), numeric));
        } else if schema.is_list() {
            let numeric = schema.list_key().is_some_and(|key| key.range().is_some());
            refs.sort_by(|a, b| crate::traverse::value_order(a.name(), b.name(), numeric));
        } else {
            refs.sort_by_key(|c| {
                schema
                    .child_by_name(c.name(), None)
                    .and_then(|s| s.child_index())
                    .unwrap_or(usize::MAX)
            });
        }
        refs
    }

    /// Parses an XML document into a data tree, collecting edit operations.
    pub fn from_xml(
        &self,
        xml: &str,
        flags: Flags,
        mode: ParseMode,
    ) -> Result<XmlParse, TranslateError> {
        if flags.contains(Flags::DEBUG) {
            log::debug!("from_xml {} bytes ({:?})", xml.len(), flags);
        }
        let doc = roxmltree::Document::parse(xml)?;
        let conds = Conditions::new(self.evaluator);
        let mut ops = EditOps::default();
        let mut holder = DataTree::new("");
        self.absorb_element(
            doc.root_element(),
            self.tree.root(),
            &mut holder,
            "",
            EditOp::Merge,
            mode,
            flags,
            &mut ops,
            &conds,
        )?;
        let tree = match holder.children_mut().pop() {
            Some(tree) => tree,
            None => return Err(TranslateError::Malformed("empty document".into())),
        };
        Ok(XmlParse { tree, ops })
    }

    #[allow(clippy::too_many_arguments)]
    fn absorb_element(
        &self,
        el: roxmltree::Node,
        schema_parent: SchemaNode<'a>,
        parent_data: &mut DataTree,
        xpath: &str,
        cur_op: EditOp,
        mode: ParseMode,
        flags: Flags,
        ops: &mut EditOps,
        conds: &Conditions,
    ) -> Result<(), TranslateError> {
        let name = el.tag_name().name();
        let el_href = el.tag_name().namespace().unwrap_or(NATIVE_NAMESPACE);
        let queried = (el_href != NATIVE_NAMESPACE).then_some(el_href);

        let Some(schema) = schema_parent.child_by_name(name, queried) else {
            return match mode {
                ParseMode::Edit => Err(EditError::new(
                    EditErrorTag::MalformedMessage,
                    format!("no schema node for '{}/{}'", xpath, name),
                )
                .into()),
                ParseMode::Get => {
                    Err(SchemaError::NoSchemaNode(format!("{}/{}", xpath, name)).into())
                }
            };
        };
        let xpath_here = format!("{}/{}", xpath, schema.name());

        // The operation is resolved per node kind so list entries record
        // their keyed xpath.
        let requested_op = match el.attribute("operation") {
            Some(attr) => {
                if mode == ParseMode::Get {
                    return Err(EditError::with_attribute(
                        EditErrorTag::UnknownAttribute,
                        "operation",
                        "operation attribute outside edit-config".to_string(),
                    )
                    .into());
                }
                Some(EditOp::parse(attr)?)
            }
            None => None,
        };

        if mode == ParseMode::Edit
            && flags.contains(Flags::MODIFY_DATA)
            && schema.is_proxy()
            && !schema.is_writable()
        {
            return Err(SchemaError::NotWritable(xpath_here).into());
        }

        if !conds.check(schema, parent_data, &xpath_here, flags) {
            return match mode {
                ParseMode::Get => Ok(()),
                ParseMode::Edit => Err(TranslateError::Malformed(format!(
                    "condition failed for '{}'",
                    xpath_here
                ))),
            };
        }

        if schema.is_leaf() {
            resolve_op(requested_op, cur_op, &xpath_here, ops)?;
            return self.absorb_leaf(el, schema, parent_data, mode, flags);
        }
        if schema.is_leaf_list() {
            let entry_schema = schema
                .wildcard_child()
                .expect("a leaf-list always has its wildcard child");
            let node = parent_data.child_or_insert(schema.name());
            match element_text(el) {
                Some(text) => {
                    let canonical = entry_schema.translate_from(text);
                    if mode == ParseMode::Edit {
                        entry_schema.validate(&canonical).map_err(|e| {
                            EditError::new(EditErrorTag::InvalidValue, e.to_string())
                        })?;
                    }
                    // An operation on a value element names that entry.
                    resolve_op(
                        requested_op,
                        cur_op,
                        &format!("{}/{}", xpath_here, canonical),
                        ops,
                    )?;
                    // Values holding '/' must stay one path segment.
                    let entry = node.child_or_insert(&escape_key(&canonical));
                    if !flags.contains(Flags::STRIP_DATA) {
                        entry.set_value(canonical.clone());
                    }
                }
                None => {
                    resolve_op(requested_op, cur_op, &xpath_here, ops)?;
                    if node.is_empty() {
                        node.push(DataTree::new("*"));
                    }
                }
            }
            return Ok(());
        }
        if schema.is_list() {
            let key_name = schema
                .list_key()
                .map(|k| k.name().to_string())
                .ok_or_else(|| {
                    TranslateError::Malformed(format!("list '{}' has no key", xpath_here))
                })?;
            let key_value = el
                .attribute(key_name.as_str())
                .map(str::to_string)
                .or_else(|| {
                    el.children()
                        .filter(|c| c.is_element())
                        .find(|c| c.tag_name().name() == key_name)
                        .and_then(|c| element_text(c).map(str::to_string))
                })
                .unwrap_or_else(|| "*".to_string());
            let entry_schema = schema
                .wildcard_child()
                .expect("a list always has its wildcard child");
            let xpath_entry = if flags.contains(Flags::STRIP_KEY) {
                xpath_here.clone()
            } else {
                format!("{}/{}", xpath_here, key_value)
            };
            let op = resolve_op(requested_op, cur_op, &xpath_entry, ops)?;

            let list_node = parent_data.child_or_insert(schema.name());
            // Keys holding '/' must survive as one path segment.
            let entry = list_node.child_or_insert(&escape_key(&key_value));
            // The key may have arrived as an attribute only.
            if let Some(value) = el.attribute(key_name.as_str()) {
                if entry.find_child(&key_name).is_none() {
                    entry.push(DataTree::leaf(key_name.clone(), value));
                }
            }
            for child in el.children().filter(|c| c.is_element()) {
                self.absorb_element(
                    child,
                    entry_schema,
                    entry,
                    &xpath_entry,
                    op,
                    mode,
                    flags,
                    ops,
                    conds,
                )?;
            }
            if entry.is_empty() && key_value != "*" && mode == ParseMode::Get {
                entry.push(DataTree::new("*"));
            }
            return Ok(());
        }

        // Containers and presence containers.
        let op = resolve_op(requested_op, cur_op, &xpath_here, ops)?;
        let node = parent_data.child_or_insert(schema.name());
        for child in el.children().filter(|c| c.is_element()) {
            self.absorb_element(
                child,
                schema,
                node,
                &xpath_here,
                op,
                mode,
                flags,
                ops,
                conds,
            )?;
        }
        // An element that stops above the schema's leaves asks for the whole
        // subtree below it.
        if node.is_empty() && mode == ParseMode::Get && !schema.is_presence_container() {
            node.push(DataTree::new("*"));
        }
        Ok(())
    }

    fn absorb_leaf(
        &self,
        el: roxmltree::Node,
        schema: SchemaNode<'a>,
        parent_data: &mut DataTree,
        mode: ParseMode,
        flags: Flags,
    ) -> Result<(), TranslateError> {
        if mode == ParseMode::Edit && !schema.is_writable() {
            return Err(SchemaError::NotWritable(schema.path()).into());
        }
        match element_text(el) {
            Some(text) => {
                let canonical = schema.translate_from(text);
                if mode == ParseMode::Edit {
                    schema
                        .validate(&canonical)
                        .map_err(|e| EditError::new(EditErrorTag::InvalidValue, e.to_string()))?;
                }
                let leaf = parent_data.child_or_insert(schema.name());
                if flags.contains(Flags::STRIP_DATA) {
                    leaf.children_mut().clear();
                } else {
                    leaf.set_value(canonical);
                }
            }
            None => {
                let leaf = parent_data.child_or_insert(schema.name());
                match mode {
                    // A bare leaf element in a request selects the value.
                    ParseMode::Get => {
                        if leaf.is_empty() {
                            leaf.push(DataTree::new("*"));
                        }
                    }
                    // An empty value clears the leaf on write.
                    ParseMode::Edit => leaf.set_value(""),
                }
            }
        }
        Ok(())
    }
}

fn element_text<'a>(el: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    el.text().map(str::trim).filter(|t| !t.is_empty())
}

fn resolve_op(
    requested: Option<EditOp>,
    cur: EditOp,
    xpath: &str,
    ops: &mut EditOps,
) -> Result<EditOp, EditError> {
    match requested {
        Some(requested) => transition(cur, requested, xpath, ops),
        None => Ok(cur),
    }
}

fn transition(
    cur: EditOp,
    requested: EditOp,
    xpath: &str,
    ops: &mut EditOps,
) -> Result<EditOp, EditError> {
    if requested == cur {
        return Ok(cur);
    }
    if cur != EditOp::Merge {
        return Err(EditError::with_attribute(
            EditErrorTag::OperationNotSupported,
            "operation",
            format!("operation cannot change inside '{}'", xpath),
        ));
    }
    match requested {
        EditOp::Delete => ops.deletes.push(xpath.to_string()),
        EditOp::Remove => ops.removes.push(xpath.to_string()),
        EditOp::Create => ops.creates.push(xpath.to_string()),
        EditOp::Replace => ops.replaces.push(xpath.to_string()),
        EditOp::Merge => {}
    }
    Ok(requested)
}

fn write_elem(writer: &mut Writer<Vec<u8>>, elem: &XmlElem) -> Result<(), std::io::Error> {
    let mut start = BytesStart::new(elem.name.as_str());
    if let Some(ns) = &elem.ns {
        start.push_attribute(("xmlns", ns.as_str()));
    }
    if elem.children.is_empty() && elem.text.is_none() {
        return writer.write_event(Event::Empty(start));
    }
    writer.write_event(Event::Start(start))?;
    if let Some(text) = &elem.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &elem.children {
        write_elem(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(elem.name.as_str())))
}
