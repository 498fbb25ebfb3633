//! Schema discovery, dependency-ordered loading, and merging.
//!
//! The loader enumerates a colon-separated search path for `*.xml`,
//! `*.xml.gz`, and `*.map` files, parses every schema file, orders them so
//! imported namespaces are merged before their importers, and folds each
//! document into a single arena tree rooted at a synthetic `MODULE` node.
//! Pattern regexes and range specs are compiled in a finalize pass, so the
//! returned instance is never mutated again.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use regex::Regex;
use roxmltree::{Document, Node};

use crate::error::SchemaError;
use crate::node::{ModelInfo, NodeId, SchemaNodeData, SchemaTree, names_match};
use crate::ns::{NATIVE_NAMESPACE, NsId};
use crate::range::RangeSpec;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Loads and merges every schema on the search path.
pub fn load(search_path: &str) -> Result<SchemaTree, SchemaError> {
    load_with_model_list(search_path, None)
}

/// Loads the search path, retaining only the modules named in the model-list
/// file when one is given. The list is line-oriented: one model name per
/// line, `#` comments.
pub fn load_with_model_list(
    search_path: &str,
    model_list: Option<&Path>,
) -> Result<SchemaTree, SchemaError> {
    let filter = match model_list {
        Some(path) => Some(read_model_list(path)?),
        None => None,
    };

    let (map_paths, schema_paths) = scan_search_path(search_path);

    let mut tree = SchemaTree::empty();
    for path in &map_paths {
        if let Err(e) = tree.map.load_file(path) {
            log::error!("failed to load namespace map {}: {}", path.display(), e);
        }
    }

    // Read every schema file up front; the parse DOMs borrow these buffers
    // and are all discarded when this function returns.
    let mut inputs: Vec<(PathBuf, String)> = Vec::new();
    for path in schema_paths {
        match read_schema_text(&path) {
            Ok(text) => inputs.push((path, text)),
            Err(e) => log::error!("{}", e),
        }
    }

    let parsed: Vec<Option<ParsedFile>> = inputs
        .iter()
        .map(|(path, text)| match parse_schema_file(text) {
            Ok(file) => Some(file),
            Err(e) => {
                log::error!("failed to parse {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    let order = dependency_order(&inputs, &parsed);

    let map = tree.map.clone();
    let mut merger = Merger {
        tree: &mut tree,
        filter: filter.as_ref(),
        map,
    };
    for index in order {
        if let Some(file) = &parsed[index] {
            merger.merge_file(&inputs[index].0, file);
        }
    }

    finalize(&mut tree);
    Ok(tree)
}

struct ParsedFile<'i> {
    doc: Document<'i>,
    /// The unprefixed namespace declaration at the root, if any.
    default_href: Option<String>,
    /// Every namespace declaration in the file, first-encountered order.
    declared: Vec<(Option<String>, String)>,
}

fn scan_search_path(search_path: &str) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut map_paths = Vec::new();
    let mut schema_paths = Vec::new();
    for dir in search_path.split(':').filter(|d| !d.is_empty()) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot read schema directory {}: {}", dir, e);
                continue;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        paths.sort();
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(".map") {
                map_paths.push(path);
            } else if name.ends_with(".xml") || name.ends_with(".xml.gz") {
                schema_paths.push(path);
            }
        }
    }
    (map_paths, schema_paths)
}

fn read_schema_text(path: &Path) -> Result<String, SchemaError> {
    let io_err = |source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    };
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let file = std::fs::File::open(path).map_err(io_err)?;
        let mut text = String::new();
        flate2::read::GzDecoder::new(file)
            .read_to_string(&mut text)
            .map_err(io_err)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(io_err)
    }
}

fn read_model_list(path: &Path) -> Result<HashSet<String>, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn parse_schema_file(text: &str) -> Result<ParsedFile<'_>, roxmltree::Error> {
    let doc = Document::parse(text)?;
    let mut declared = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        for ns in node.namespaces() {
            if ns.uri() == XML_NAMESPACE {
                continue;
            }
            let entry = (ns.name().map(str::to_string), ns.uri().to_string());
            if !declared.contains(&entry) {
                declared.push(entry);
            }
        }
    }
    let default_href = doc
        .root_element()
        .namespaces()
        .find(|ns| ns.name().is_none())
        .map(|ns| ns.uri().to_string());
    Ok(ParsedFile {
        doc,
        default_href,
        declared,
    })
}

/// Topological order by depth-first traversal with init/pending/done
/// coloring. A file depends on another when it declares that file's default
/// namespace; revisiting a pending file closes a cycle, which is logged and
/// broken there.
fn dependency_order(
    inputs: &[(PathBuf, String)],
    parsed: &[Option<ParsedFile>],
) -> Vec<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        Init,
        Pending,
        Done,
    }

    let defaults: Vec<Option<&str>> = parsed
        .iter()
        .map(|p| p.as_ref().and_then(|f| f.default_href.as_deref()))
        .collect();

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); parsed.len()];
    for (i, file) in parsed.iter().enumerate() {
        let Some(file) = file else { continue };
        for (_, uri) in &file.declared {
            if file.default_href.as_deref() == Some(uri.as_str()) {
                continue;
            }
            for (j, default) in defaults.iter().enumerate() {
                if j != i && *default == Some(uri.as_str()) {
                    edges[i].push(j);
                }
            }
        }
    }

    fn visit(
        i: usize,
        inputs: &[(PathBuf, String)],
        edges: &[Vec<usize>],
        colors: &mut [Color],
        order: &mut Vec<usize>,
    ) {
        match colors[i] {
            Color::Done => return,
            Color::Pending => {
                log::warn!(
                    "schema import cycle closed at {}; breaking it there",
                    inputs[i].0.display()
                );
                return;
            }
            Color::Init => {}
        }
        colors[i] = Color::Pending;
        for &j in &edges[i] {
            visit(j, inputs, edges, colors, order);
        }
        colors[i] = Color::Done;
        order.push(i);
    }

    let mut colors = vec![Color::Init; parsed.len()];
    let mut order = Vec::with_capacity(parsed.len());
    for i in 0..parsed.len() {
        if parsed[i].is_some() {
            visit(i, inputs, &edges, &mut colors, &mut order);
        }
    }
    order
}

/// The attributes a schema element may carry, after model-metadata
/// propagation.
#[derive(Default)]
struct Attrs {
    mode: Option<String>,
    default: Option<String>,
    pattern: Option<String>,
    range: Option<String>,
    help: Option<String>,
    idref_module: Option<String>,
    when_cond: Option<String>,
    must_cond: Option<String>,
    if_feature: Option<String>,
    model: Option<String>,
    organization: Option<String>,
    version: Option<String>,
    features: Option<String>,
    deviations: Option<String>,
    value: Option<String>,
}

#[derive(Default, Clone)]
struct ModelMeta {
    model: Option<String>,
    organization: Option<String>,
    version: Option<String>,
    features: Option<String>,
    deviations: Option<String>,
}

struct FileCtx {
    default_ns: NsId,
    meta: ModelMeta,
    /// Elements that receive the file's model metadata: the first node under
    /// each namespace boundary without its own `model` attribute.
    stamped: HashSet<roxmltree::NodeId>,
}

struct Merger<'t> {
    tree: &'t mut SchemaTree,
    filter: Option<&'t HashSet<String>>,
    /// Copy of the loaded namespace map, taken once so interning does not
    /// alias the tree borrow.
    map: crate::ns::NamespaceMap,
}

impl Merger<'_> {
    fn merge_file(&mut self, path: &Path, file: &ParsedFile) {
        let root = file.doc.root_element();

        // A usable schema file opens with a schema node or a value marker.
        let first_child = root.children().find(|c| c.is_element());
        let opening = first_child
            .and_then(|c| c.tag_name().name().chars().next())
            .unwrap_or('\0');
        if !matches!(opening, 'N' | 'S' | 'V') {
            log::debug!("skipping {}: not a schema file", path.display());
            return;
        }

        let model = root.attribute("model");
        if let Some(filter) = self.filter {
            match model {
                Some(m) if filter.contains(m) => {}
                _ => {
                    log::debug!(
                        "discarding {}: model {:?} not in the model list",
                        path.display(),
                        model
                    );
                    return;
                }
            }
        }

        for (prefix, uri) in &file.declared {
            self.tree.namespaces.intern(uri, prefix.as_deref(), &self.map);
        }

        let default_ns = match file.default_href.as_deref() {
            Some(href) => self.tree.namespaces.intern(href, None, &self.map),
            None => self.tree.namespaces.native(),
        };

        if let Some(model_name) = model {
            self.record_model(model_name, root, file);
        }

        let meta = ModelMeta {
            model: model.map(str::to_string),
            organization: root.attribute("organization").map(str::to_string),
            version: root.attribute("version").map(str::to_string),
            features: root.attribute("features").map(str::to_string),
            deviations: root.attribute("deviations").map(str::to_string),
        };
        let mut stamped = HashSet::new();
        let default_href = file.default_href.as_deref().unwrap_or(NATIVE_NAMESPACE);
        collect_stamps(root, NATIVE_NAMESPACE, default_href, &mut stamped);

        let ctx = FileCtx {
            default_ns,
            meta,
            stamped,
        };
        self.merge_nodes(0, root, 0, &ctx);
    }

    fn record_model(&mut self, model: &str, root: Node, file: &ParsedFile) {
        if self.tree.models.iter().any(|m| m.model == model) {
            log::warn!("duplicate model '{}' ignored", model);
            return;
        }
        let ns_href = file
            .default_href
            .clone()
            .unwrap_or_else(|| NATIVE_NAMESPACE.to_string());
        let ns_prefix = self
            .tree
            .namespace_by_href(&ns_href)
            .and_then(|ns| ns.prefix.clone());
        self.tree.models.push(ModelInfo {
            ns_href,
            ns_prefix,
            model: model.to_string(),
            organization: root.attribute("organization").map(str::to_string),
            version: root.attribute("version").map(str::to_string),
            features: root.attribute("features").map(str::to_string),
            deviations: root.attribute("deviations").map(str::to_string),
        });
    }

    /// Walks the merged tree's children alongside one parsed element's
    /// children. Nodes equal for merging (same `name`, matching namespace)
    /// recurse; everything else is deep-copied in at the current ordered
    /// position.
    fn merge_nodes(&mut self, parent: NodeId, el: Node, depth: usize, ctx: &FileCtx) {
        let mut cursor = 0usize;
        for child_el in el.children().filter(|c| c.is_element()) {
            let tag = child_el.tag_name().name();
            let is_value = match tag.chars().next() {
                Some('N') => false,
                Some('V') => true,
                _ => continue,
            };
            let Some(name) = child_el.attribute("name") else {
                log::warn!("ignoring {} element without a name attribute", tag);
                continue;
            };
            let child_ns = self.element_ns(child_el);

            let existing = self.tree.nodes[parent]
                .children
                .iter()
                .copied()
                .find(|&cid| {
                    let d = &self.tree.nodes[cid];
                    d.is_value == is_value
                        && names_match(&d.name, name)
                        && self.ns_equal(d.ns, child_ns)
                });

            match existing {
                Some(cid) => {
                    self.merge_attributes(cid, child_el, ctx);
                    if depth > 0 && child_ns == ctx.default_ns {
                        // Keep the model's own nodes ahead of augmentations
                        // from other namespaces.
                        self.reinsert_after_ns_block(parent, cid);
                    }
                    self.merge_nodes(cid, child_el, depth + 1, ctx);
                    let pos = self.tree.nodes[parent]
                        .children
                        .iter()
                        .position(|&c| c == cid)
                        .unwrap_or(0);
                    cursor = pos + 1;
                }
                None => {
                    if let Some(new_id) = self.convert_element(child_el, parent, ctx) {
                        let children = &mut self.tree.nodes[parent].children;
                        let last = children.pop();
                        debug_assert_eq!(last, Some(new_id));
                        let at = cursor.min(children.len());
                        children.insert(at, new_id);
                        cursor = at + 1;
                    }
                }
            }
        }
    }

    /// Deep-copies one parsed element (and its subtree) into the arena,
    /// appended to `parent`'s children.
    fn convert_element(&mut self, el: Node, parent: NodeId, ctx: &FileCtx) -> Option<NodeId> {
        let tag = el.tag_name().name();
        let is_value = match tag.chars().next() {
            Some('N') => false,
            Some('V') => true,
            _ => return None,
        };
        let name = el.attribute("name")?;
        let ns = self.element_ns(el);
        let attrs = effective_attrs(el, ctx);

        let id = self.tree.nodes.len();
        self.tree.nodes.push(SchemaNodeData {
            name: name.to_string(),
            ns,
            parent: Some(parent),
            children: Vec::new(),
            is_value,
            value: attrs.value,
            mode: attrs.mode,
            default: attrs.default,
            pattern: attrs.pattern,
            range_raw: attrs.range,
            range: None,
            help: attrs.help,
            idref_module: attrs.idref_module,
            when_cond: attrs.when_cond,
            must_cond: attrs.must_cond,
            if_feature: attrs.if_feature,
            model: attrs.model,
            organization: attrs.organization,
            version: attrs.version,
            features: attrs.features,
            deviations: attrs.deviations,
        });
        self.tree.nodes[parent].children.push(id);

        for child in el.children().filter(|c| c.is_element()) {
            self.convert_element(child, id, ctx);
        }
        Some(id)
    }

    /// Copies attributes present on the parsed element but absent on the
    /// merged node. A conflicting `model` is an error; the original wins.
    fn merge_attributes(&mut self, id: NodeId, el: Node, ctx: &FileCtx) {
        let attrs = effective_attrs(el, ctx);
        let node = &mut self.tree.nodes[id];
        if let (Some(old), Some(new)) = (&node.model, &attrs.model) {
            if old != new {
                log::error!(
                    "conflicting model '{}' vs '{}' on node '{}'",
                    old,
                    new,
                    node.name
                );
            }
        }
        fn fill(dst: &mut Option<String>, src: Option<String>) {
            if dst.is_none() {
                *dst = src;
            }
        }
        fill(&mut node.mode, attrs.mode);
        fill(&mut node.default, attrs.default);
        fill(&mut node.pattern, attrs.pattern);
        fill(&mut node.range_raw, attrs.range);
        fill(&mut node.help, attrs.help);
        fill(&mut node.idref_module, attrs.idref_module);
        fill(&mut node.when_cond, attrs.when_cond);
        fill(&mut node.must_cond, attrs.must_cond);
        fill(&mut node.if_feature, attrs.if_feature);
        fill(&mut node.model, attrs.model);
        fill(&mut node.organization, attrs.organization);
        fill(&mut node.version, attrs.version);
        fill(&mut node.features, attrs.features);
        fill(&mut node.deviations, attrs.deviations);
        fill(&mut node.value, attrs.value);
    }

    /// Moves a merged node to the position just after the contiguous block of
    /// siblings sharing its namespace.
    fn reinsert_after_ns_block(&mut self, parent: NodeId, id: NodeId) {
        let ns = self.tree.nodes[id].ns;
        let block_ns: Vec<NsId> = self.tree.nodes[parent]
            .children
            .iter()
            .map(|&c| self.tree.nodes[c].ns)
            .collect();
        let children = &mut self.tree.nodes[parent].children;
        let Some(pos) = children.iter().position(|&c| c == id) else {
            return;
        };
        children.remove(pos);
        let mut insert_at = children.len();
        let mut seen = false;
        for i in 0..children.len() {
            let child_ns = block_ns
                .get(if i < pos { i } else { i + 1 })
                .copied()
                .unwrap_or(ns);
            if child_ns == ns {
                seen = true;
                insert_at = i + 1;
            } else if seen {
                break;
            }
        }
        if !seen {
            insert_at = children.len();
        }
        children.insert(insert_at, id);
    }

    fn element_ns(&mut self, el: Node) -> NsId {
        match el.tag_name().namespace() {
            None => self.tree.namespaces.native(),
            Some(href) if href == NATIVE_NAMESPACE => self.tree.namespaces.native(),
            Some(href) => self.tree.namespaces.intern(href, None, &self.map),
        }
    }

    fn ns_equal(&self, a: NsId, b: NsId) -> bool {
        if a == b {
            return true;
        }
        let an = self.tree.namespaces.get(a);
        let bn = self.tree.namespaces.get(b);
        (an.native && bn.native) || an.href == bn.href
    }
}

fn effective_attrs(el: Node, ctx: &FileCtx) -> Attrs {
    let get = |name: &str| el.attribute(name).map(str::to_string);
    let mut attrs = Attrs {
        mode: get("mode"),
        default: get("default"),
        pattern: get("pattern"),
        range: get("range"),
        help: get("help"),
        idref_module: get("idref_module"),
        when_cond: get("when"),
        must_cond: get("must"),
        if_feature: get("if-feature"),
        model: get("model"),
        organization: get("organization"),
        version: get("version"),
        features: get("features"),
        deviations: get("deviations"),
        value: get("value"),
    };
    if ctx.stamped.contains(&el.id()) {
        let fill = |dst: &mut Option<String>, src: &Option<String>| {
            if dst.is_none() {
                *dst = src.clone();
            }
        };
        fill(&mut attrs.model, &ctx.meta.model);
        fill(&mut attrs.organization, &ctx.meta.organization);
        fill(&mut attrs.version, &ctx.meta.version);
        fill(&mut attrs.features, &ctx.meta.features);
        fill(&mut attrs.deviations, &ctx.meta.deviations);
    }
    attrs
}

/// Marks the first element under each namespace boundary that belongs to the
/// file's own namespace and does not carry its own `model` attribute; those
/// receive the file's model metadata. Scaffolding elements in an augmented
/// module's namespace are left alone.
fn collect_stamps(
    el: Node,
    parent_href: &str,
    default_href: &str,
    out: &mut HashSet<roxmltree::NodeId>,
) {
    for child in el.children().filter(|c| c.is_element()) {
        let child_href = child.tag_name().namespace().unwrap_or(NATIVE_NAMESPACE);
        if child_href != parent_href
            && child_href == default_href
            && child.attribute("model").is_none()
        {
            out.insert(child.id());
        }
        collect_stamps(child, child_href, default_href, out);
    }
}

/// Parses every `range` attribute and compiles every `pattern` regex, so the
/// read path never mutates.
fn finalize(tree: &mut SchemaTree) {
    for id in 0..tree.nodes.len() {
        if let Some(raw) = tree.nodes[id].range_raw.clone() {
            match RangeSpec::parse(&raw) {
                Ok(spec) => tree.nodes[id].range = Some(spec),
                Err(e) => {
                    log::warn!(
                        "ignoring malformed range '{}' on '{}': {}",
                        raw,
                        tree.nodes[id].name,
                        e
                    );
                }
            }
        }
        if let Some(pattern) = tree.nodes[id].pattern.clone() {
            match Regex::new(&format!("^(?:{})$", pattern)) {
                Ok(regex) => {
                    tree.patterns.insert(id, regex);
                }
                Err(e) => {
                    log::error!(
                        "pattern '{}' on '{}' does not compile: {}",
                        pattern,
                        tree.nodes[id].name,
                        e
                    );
                    tree.bad_patterns.insert(id, e.to_string());
                }
            }
        }
    }
}
