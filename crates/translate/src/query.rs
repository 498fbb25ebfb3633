//! Request-path and query-parameter parsing.
//!
//! A request like `/test/animals/animal?fields=name;food(name)&depth=3` is
//! turned into a skeleton data tree describing which nodes to retrieve, plus
//! the decoded option values. The skeleton's leaves correspond to retrievable
//! nodes; an unrestricted query gets an explicit `*` child appended so a
//! retrieval obtains the whole subtree.

use std::collections::HashSet;

use canopy_schema::{SchemaNode, SchemaTree};
use canopy_types::{DataTree, Flags};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{map, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
};

use crate::error::TranslateError;

/// The `content` query option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFilter {
    Config,
    Nonconfig,
    All,
}

/// The `with-defaults` query option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaults {
    ReportAll,
    Trim,
    Explicit,
}

/// A parsed request: the skeleton tree plus the option values that drive the
/// retrieval and the output traversals.
#[derive(Debug)]
pub struct Query {
    pub tree: DataTree,
    /// `None` means unbounded.
    pub depth: Option<u16>,
    /// Set when `depth=1` was requested.
    pub one_level: bool,
    pub content: Option<ContentFilter>,
    pub with_defaults: Option<WithDefaults>,
}

/// One node of a parsed `fields` expression.
#[derive(Debug, PartialEq, Eq)]
struct FieldNode {
    name: String,
    children: Vec<FieldNode>,
}

fn field_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !matches!(c, ';' | '(' | ')' | '/' | '&' | '=')).parse(input)
}

fn field(input: &str) -> IResult<&str, FieldNode> {
    map(
        pair(
            field_name,
            opt(alt((
                map(preceded(char('/'), field), |child| vec![child]),
                delimited(char('('), field_list, char(')')),
            ))),
        ),
        |(name, children)| FieldNode {
            name: name.to_string(),
            children: children.unwrap_or_default(),
        },
    )
    .parse(input)
}

fn field_list(input: &str) -> IResult<&str, Vec<FieldNode>> {
    separated_list1(char(';'), field).parse(input)
}

fn parse_fields(input: &str) -> Result<Vec<FieldNode>, TranslateError> {
    match field_list.parse(input) {
        Ok(("", fields)) => Ok(fields),
        Ok((rest, _)) => Err(TranslateError::InvalidQuery(format!(
            "trailing input '{}' in fields",
            rest
        ))),
        Err(e) => Err(TranslateError::InvalidQuery(format!(
            "unparsable fields expression '{}': {}",
            input, e
        ))),
    }
}

/// Parses an absolute request path with an optional `?`-delimited query
/// string into a [`Query`].
pub fn parse_query(
    schema: &SchemaTree,
    input: &str,
    flags: Flags,
) -> Result<Query, TranslateError> {
    if flags.contains(Flags::DEBUG) {
        log::debug!("parse_query '{}' ({:?})", input, flags);
    }
    let (path_part, query_part) = match input.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (input, None),
    };

    let resolved = schema.resolve_path(None, path_part, flags)?;
    if resolved.segments.is_empty() {
        return Err(TranslateError::InvalidQuery("empty request path".into()));
    }

    let mut query = Query {
        tree: DataTree::new(""),
        depth: None,
        one_level: false,
        content: None,
        with_defaults: None,
    };
    let mut fields: Option<Vec<FieldNode>> = None;

    if let Some(params) = query_part {
        let mut seen: HashSet<&str> = HashSet::new();
        for param in params.split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = param.split_once('=') else {
                return Err(TranslateError::InvalidQuery(format!(
                    "parameter '{}' has no value",
                    param
                )));
            };
            if !seen.insert(key) {
                return Err(TranslateError::InvalidQuery(format!(
                    "parameter '{}' given more than once",
                    key
                )));
            }
            match key {
                "fields" => fields = Some(parse_fields(value)?),
                "content" => {
                    query.content = Some(match value {
                        "config" => ContentFilter::Config,
                        "nonconfig" => ContentFilter::Nonconfig,
                        "all" => ContentFilter::All,
                        other => {
                            return Err(TranslateError::InvalidQuery(format!(
                                "unsupported content value '{}'",
                                other
                            )));
                        }
                    })
                }
                "depth" => {
                    if value == "unbounded" {
                        query.depth = None;
                    } else {
                        let depth: u32 = value.parse().map_err(|_| {
                            TranslateError::InvalidQuery(format!(
                                "depth '{}' is not a number",
                                value
                            ))
                        })?;
                        if depth == 0 || depth > u16::MAX as u32 {
                            return Err(TranslateError::InvalidQuery(format!(
                                "depth {} out of range",
                                depth
                            )));
                        }
                        query.depth = Some(depth as u16);
                        if depth == 1 {
                            query.one_level = true;
                        }
                    }
                }
                "with-defaults" => {
                    query.with_defaults = Some(match value {
                        "report-all" => WithDefaults::ReportAll,
                        "trim" => WithDefaults::Trim,
                        "explicit" => WithDefaults::Explicit,
                        other => {
                            return Err(TranslateError::InvalidQuery(format!(
                                "unsupported with-defaults value '{}'",
                                other
                            )));
                        }
                    })
                }
                other => {
                    return Err(TranslateError::InvalidQuery(format!(
                        "unsupported parameter '{}'",
                        other
                    )));
                }
            }
        }
    }

    if query.depth.is_none() && flags.contains(Flags::DEPTH_ONE) {
        query.depth = Some(1);
        query.one_level = true;
    }

    // Fold the resolved segments into a skeleton chain.
    let mut root = DataTree::new(resolved.segments[0].clone());
    {
        let mut tip = &mut root;
        for segment in &resolved.segments[1..] {
            tip = tip.push(DataTree::new(segment.clone()));
        }
        let target = resolved.target(schema);
        match fields {
            Some(fields) => attach_fields(tip, target, &fields)?,
            // Unrestricted below the schema: take the whole subtree.
            None => {
                tip.push(DataTree::new("*"));
            }
        }
    }
    query.tree = root;
    Ok(query)
}

/// Attaches one level of `fields` nodes, merging into existing children by
/// name so repeated mentions union recursively.
fn attach_fields(
    data: &mut DataTree,
    schema: SchemaNode,
    fields: &[FieldNode],
) -> Result<(), TranslateError> {
    for fieldv in fields {
        // Below a list the fields address each entry.
        let (data, schema) = if schema.is_list() && !schema.is_leaf_list() {
            let entry = schema
                .wildcard_child()
                .expect("a list always has its wildcard child");
            (data.child_or_insert("*"), entry)
        } else {
            (&mut *data, schema)
        };
        let Some(child_schema) = schema.child_by_name(&fieldv.name, None) else {
            return Err(TranslateError::InvalidQuery(format!(
                "field '{}' has no schema node under '{}'",
                fieldv.name,
                schema.path()
            )));
        };
        let child_data = data.child_or_insert(child_schema.name());
        if !fieldv.children.is_empty() {
            attach_fields(child_data, child_schema, &fieldv.children)?;
        }
    }
    Ok(())
}
