//! Type rule registry
//!
//! The registry maps token tags to reader rules and node/mark type names to writers. It is
//! assembled once per schema with a [`RegistryBuilder`] and validated when built, so that a
//! broken schema fails at construction time rather than halfway through a document.
//!
//! # Examples
//!
//! ```ignore
//! let registry = RegistryBuilder::new()
//!     .node(text_spec)
//!     .node(paragraph_spec)
//!     .mark(em_spec)
//!     .disable("math")
//!     .build()?;
//!
//! let rule = registry.reader_rule("Para");
//! ```

use crate::common::writer::{WriteError, Writer};
use crate::error::ShapeError;
use crate::ir::nodes::{Attrs, Mark, Node, NOTE, TEXT};
use crate::ir::tokens::Token;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;

pub type TextFn = fn(&Token) -> Result<String, ShapeError>;
pub type AttrsFn = fn(&Token) -> Result<Attrs, ShapeError>;
pub type ChildrenFn = fn(&Token) -> Result<Vec<&Token>, ShapeError>;
pub type ItemsFn = fn(&Token) -> Result<Vec<Vec<&Token>>, ShapeError>;
pub type NodeWriter = fn(&mut Writer<'_>, &Node) -> Result<(), WriteError>;
pub type MarkWriteFn = fn(&mut Writer<'_>, &Mark, &[Node]) -> Result<(), WriteError>;

/// How a node type participates in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Block,
    Inline,
    Text,
    /// A list container; its children are list items
    List,
    /// A note body container, kept out of the main flow
    Note,
}

/// Where the content of a marked or node-producing token comes from.
#[derive(Clone, Copy)]
pub enum Content {
    /// Nested tokens to parse recursively
    Children(ChildrenFn),
    /// A single text child synthesized from the token
    Text(TextFn),
    Empty,
}

/// What the reader does when it meets a token.
#[derive(Clone, Copy)]
pub enum ReadAction {
    Text(TextFn),
    Mark {
        attrs: Option<AttrsFn>,
        content: Content,
    },
    Block {
        attrs: Option<AttrsFn>,
        content: Content,
    },
    Node {
        attrs: Option<AttrsFn>,
        content: Content,
    },
    List {
        item: &'static str,
        attrs: Option<AttrsFn>,
        items: ItemsFn,
    },
    Note {
        children: ChildrenFn,
    },
}

impl ReadAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ReadAction::Text(_) => "text",
            ReadAction::Mark { .. } => "mark",
            ReadAction::Block { .. } => "block",
            ReadAction::Node { .. } => "node",
            ReadAction::List { .. } => "list",
            ReadAction::Note { .. } => "note",
        }
    }
}

#[derive(Clone, Copy)]
pub struct ReaderRule {
    pub token: &'static str,
    pub action: ReadAction,
}

impl ReaderRule {
    pub fn new(token: &'static str, action: ReadAction) -> Self {
        ReaderRule { token, action }
    }
}

impl fmt::Debug for ReaderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReaderRule({} -> {})", self.token, self.action.kind())
    }
}

#[derive(Clone, Copy)]
pub struct MarkWriter {
    /// Lower priorities are written as outer tokens
    pub priority: i32,
    /// Move leading/trailing whitespace of the span outside the mark's token
    pub expel_whitespace: bool,
    pub write: MarkWriteFn,
}

#[derive(Clone)]
pub struct NodeSpec {
    pub name: &'static str,
    pub group: NodeGroup,
    pub readers: Vec<ReaderRule>,
    pub writer: NodeWriter,
}

#[derive(Clone)]
pub struct MarkSpec {
    pub name: &'static str,
    pub readers: Vec<ReaderRule>,
    pub writer: MarkWriter,
}

/// A reader rule resolved to the type that produces it.
#[derive(Clone, Copy)]
pub struct ResolvedRule {
    pub target: &'static str,
    pub action: ReadAction,
}

/// Schema construction errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateType(String),
    DuplicateTag {
        tag: String,
        first: String,
        second: String,
    },
    UnknownItemType {
        list: String,
        item: String,
    },
    /// A rule whose action does not fit the type that declares it
    InvalidRule {
        type_name: String,
        tag: String,
        reason: String,
    },
    MissingTextType,
    MissingNoteType,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateType(name) => write!(f, "Type '{name}' is declared twice"),
            RegistryError::DuplicateTag { tag, first, second } => write!(
                f,
                "Token '{tag}' is claimed by both '{first}' and '{second}'"
            ),
            RegistryError::UnknownItemType { list, item } => write!(
                f,
                "List type '{list}' names item type '{item}' which is not a declared node"
            ),
            RegistryError::InvalidRule {
                type_name,
                tag,
                reason,
            } => write!(f, "Invalid rule for '{tag}' on '{type_name}': {reason}"),
            RegistryError::MissingTextType => {
                write!(f, "Schema has no '{TEXT}' node in the text group")
            }
            RegistryError::MissingNoteType => {
                write!(f, "Schema reads notes but has no '{NOTE}' node in the note group")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Clone, Copy)]
struct NodeEntry {
    group: NodeGroup,
    writer: NodeWriter,
}

#[derive(Clone, Copy)]
struct MarkEntry {
    rank: usize,
    writer: MarkWriter,
}

/// Validated lookup tables for one schema
pub struct Registry {
    rules: HashMap<&'static str, ResolvedRule>,
    ignored: HashSet<&'static str>,
    nodes: HashMap<&'static str, NodeEntry>,
    marks: HashMap<&'static str, MarkEntry>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("nodes", &self.node_types())
            .field("marks", &self.mark_types())
            .field("ignored", &self.ignored)
            .finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn reader_rule(&self, tag: &str) -> Option<&ResolvedRule> {
        self.rules.get(tag)
    }

    /// True for tags whose owning type was disabled.
    pub fn is_ignored(&self, tag: &str) -> bool {
        self.ignored.contains(tag)
    }

    pub fn node_writer(&self, node_type: &str) -> Option<NodeWriter> {
        self.nodes.get(node_type).map(|entry| entry.writer)
    }

    pub fn node_group(&self, node_type: &str) -> Option<NodeGroup> {
        self.nodes.get(node_type).map(|entry| entry.group)
    }

    pub fn mark_writer(&self, mark_type: &str) -> Option<MarkWriter> {
        self.marks.get(mark_type).map(|entry| entry.writer)
    }

    /// Declaration rank of a mark type; mark sets are kept sorted by it.
    pub fn mark_rank(&self, mark_type: &str) -> Option<usize> {
        self.marks.get(mark_type).map(|entry| entry.rank)
    }

    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.nodes.contains_key(node_type)
    }

    pub fn has_mark_type(&self, mark_type: &str) -> bool {
        self.marks.contains_key(mark_type)
    }

    /// List all installed node type names (sorted)
    pub fn node_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.nodes.keys().copied().collect();
        names.sort();
        names
    }

    /// List all installed mark type names (sorted)
    pub fn mark_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.marks.keys().copied().collect();
        names.sort();
        names
    }

    /// Adds `mark` to a canonical set, replacing a mark of the same type.
    pub fn add_mark_to_set(&self, set: &[Mark], mark: Mark) -> Vec<Mark> {
        let rank = self.sort_rank(&mark.mark_type);
        let mut result: Vec<Mark> = set
            .iter()
            .filter(|existing| existing.mark_type != mark.mark_type)
            .cloned()
            .collect();
        let position = result
            .iter()
            .position(|existing| self.sort_rank(&existing.mark_type) > rank)
            .unwrap_or(result.len());
        result.insert(position, mark);
        result
    }

    pub fn remove_mark_from_set(&self, set: &[Mark], mark_type: &str) -> Vec<Mark> {
        set.iter()
            .filter(|existing| existing.mark_type != mark_type)
            .cloned()
            .collect()
    }

    fn sort_rank(&self, mark_type: &str) -> usize {
        self.mark_rank(mark_type).unwrap_or(usize::MAX)
    }
}

/// Collects node and mark specs, then validates them into a [`Registry`].
#[derive(Clone, Default)]
pub struct RegistryBuilder {
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
    disabled: HashSet<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    pub fn node(mut self, spec: NodeSpec) -> Self {
        self.nodes.push(spec);
        self
    }

    /// Marks rank in the order they are added.
    pub fn mark(mut self, spec: MarkSpec) -> Self {
        self.marks.push(spec);
        self
    }

    /// Leaves a type out of the registry; its tokens are skipped when read.
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.disabled.insert(name.into());
        self
    }

    pub fn disable_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut registry = Registry {
            rules: HashMap::new(),
            ignored: HashSet::new(),
            nodes: HashMap::new(),
            marks: HashMap::new(),
        };
        let mut owners: HashMap<&'static str, &'static str> = HashMap::new();

        for spec in &self.nodes {
            if self.disabled.contains(spec.name) {
                debug!("type '{}' disabled, ignoring its tokens", spec.name);
                registry.ignored.extend(spec.readers.iter().map(|r| r.token));
                continue;
            }
            let entry = NodeEntry {
                group: spec.group,
                writer: spec.writer,
            };
            if registry.nodes.insert(spec.name, entry).is_some() {
                return Err(RegistryError::DuplicateType(spec.name.to_string()));
            }
        }

        let mut rank = 0;
        for spec in &self.marks {
            if self.disabled.contains(spec.name) {
                debug!("mark '{}' disabled, ignoring its tokens", spec.name);
                registry.ignored.extend(spec.readers.iter().map(|r| r.token));
                continue;
            }
            let entry = MarkEntry {
                rank,
                writer: spec.writer,
            };
            if registry.marks.insert(spec.name, entry).is_some() {
                return Err(RegistryError::DuplicateType(spec.name.to_string()));
            }
            rank += 1;
        }

        let installed_nodes = self
            .nodes
            .iter()
            .filter(|spec| !self.disabled.contains(spec.name))
            .map(|spec| (spec.name, spec.group, &spec.readers));
        let installed_marks = self
            .marks
            .iter()
            .filter(|spec| !self.disabled.contains(spec.name))
            .map(|spec| (spec.name, &spec.readers));

        for (name, group, readers) in installed_nodes {
            for rule in readers {
                check_node_rule(name, group, rule)?;
                if let ReadAction::List { item, .. } = rule.action {
                    if self.disabled.contains(item) {
                        debug!("item type '{item}' disabled, ignoring '{}'", rule.token);
                        registry.ignored.insert(rule.token);
                        continue;
                    }
                    if !registry.nodes.contains_key(item) {
                        return Err(RegistryError::UnknownItemType {
                            list: name.to_string(),
                            item: item.to_string(),
                        });
                    }
                }
                if let ReadAction::Note { .. } = rule.action {
                    if registry.node_group(NOTE) != Some(NodeGroup::Note) {
                        return Err(RegistryError::MissingNoteType);
                    }
                }
                install_rule(&mut registry, &mut owners, name, rule)?;
            }
        }

        for (name, readers) in installed_marks {
            for rule in readers {
                if !matches!(rule.action, ReadAction::Mark { .. }) {
                    return Err(RegistryError::InvalidRule {
                        type_name: name.to_string(),
                        tag: rule.token.to_string(),
                        reason: format!("marks only take mark rules, found {}", rule.action.kind()),
                    });
                }
                install_rule(&mut registry, &mut owners, name, rule)?;
            }
        }

        if registry.node_group(TEXT) != Some(NodeGroup::Text) {
            return Err(RegistryError::MissingTextType);
        }

        // A tag can be both claimed by an installed type and left behind by a disabled one.
        registry
            .ignored
            .retain(|tag| !registry.rules.contains_key(tag));

        debug!(
            "registry built: {} node types, {} mark types, {} reader rules, {} ignored tags",
            registry.nodes.len(),
            registry.marks.len(),
            registry.rules.len(),
            registry.ignored.len()
        );
        Ok(registry)
    }
}

fn check_node_rule(
    name: &'static str,
    group: NodeGroup,
    rule: &ReaderRule,
) -> Result<(), RegistryError> {
    let reason = match (rule.action, group) {
        (ReadAction::Mark { .. }, _) => Some("node types cannot take mark rules"),
        (ReadAction::Text(_), NodeGroup::Text) => None,
        (ReadAction::Text(_), _) => Some("text rules need a node in the text group"),
        (ReadAction::List { .. }, NodeGroup::List) => None,
        (ReadAction::List { .. }, _) => Some("list rules need a node in the list group"),
        (ReadAction::Note { .. }, NodeGroup::Inline) => None,
        (ReadAction::Note { .. }, _) => Some("note rules produce inline placeholders"),
        _ => None,
    };
    match reason {
        Some(reason) => Err(RegistryError::InvalidRule {
            type_name: name.to_string(),
            tag: rule.token.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn install_rule(
    registry: &mut Registry,
    owners: &mut HashMap<&'static str, &'static str>,
    name: &'static str,
    rule: &ReaderRule,
) -> Result<(), RegistryError> {
    if let Some(first) = owners.insert(rule.token, name) {
        return Err(RegistryError::DuplicateTag {
            tag: rule.token.to_string(),
            first: first.to_string(),
            second: name.to_string(),
        });
    }
    registry.rules.insert(
        rule.token,
        ResolvedRule {
            target: name,
            action: rule.action,
        },
    );
    Ok(())
}
