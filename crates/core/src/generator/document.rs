//! Infrastructure document model.
//!
//! A document is a tree of [`Node`]s serialized as Terraform JSON
//! configuration syntax. Interpolations (`${kind.name.attr}`) between its
//! sections are checked by [`ConfigDocument::validate`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").expect("valid interpolation pattern"));

/// Errors raised while checking or persisting a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// An interpolation names a block the document does not declare.
    #[error("reference {0} does not resolve to a declared block")]
    DanglingReference(String),

    /// An interpolation could not be parsed.
    #[error("malformed reference: ${{{0}}}")]
    MalformedReference(String),

    /// The document is not an object at the top level.
    #[error("document root must be an object")]
    NotAnObject,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Node
// ============================================================================

/// One value in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Bool(bool),
    Number(i64),
    String(String),
    List(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// Build a map node from key/value pairs.
    pub fn object<K, I>(entries: I) -> Node
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list node.
    pub fn list<T, I>(items: I) -> Node
    where
        T: Into<Node>,
        I: IntoIterator<Item = T>,
    {
        Node::List(items.into_iter().map(Into::into).collect())
    }

    /// An empty list.
    pub fn empty_list() -> Node {
        Node::List(Vec::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Child by map key or list index.
    pub fn get(&self, segment: &str) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(segment),
            Node::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Descendant by a path of map keys and list indices.
    pub fn pointer(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, segment| node.get(segment))
    }

    /// Visit every string leaf.
    pub fn for_each_string<'a>(&'a self, f: &mut dyn FnMut(&'a str)) {
        match self {
            Node::String(s) => f(s),
            Node::List(items) => items.iter().for_each(|n| n.for_each_string(f)),
            Node::Map(map) => map.values().for_each(|n| n.for_each_string(f)),
            Node::Bool(_) | Node::Number(_) => {}
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Number(value)
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::Number(value.into())
    }
}

impl From<u16> for Node {
    fn from(value: u16) -> Self {
        Node::Number(value.into())
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<&String> for Node {
    fn from(value: &String) -> Self {
        Node::String(value.clone())
    }
}

// ============================================================================
// References
// ============================================================================

/// A parsed `${...}` interpolation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reference {
    /// `${var.NAME}`
    Variable(String),
    /// `${module.NAME.ATTR}`
    Module { name: String, attribute: String },
    /// `${KIND.NAME.ATTR}`
    Resource {
        kind: String,
        name: String,
        attribute: String,
    },
}

impl Reference {
    /// Parse the inside of an interpolation.
    pub fn parse(expr: &str) -> Result<Self, DocumentError> {
        let parts: Vec<&str> = expr.trim().split('.').collect();
        match parts.as_slice() {
            ["var", name] if !name.is_empty() => Ok(Reference::Variable(name.to_string())),
            ["module", name, attribute, ..] if !name.is_empty() => Ok(Reference::Module {
                name: name.to_string(),
                attribute: attribute.to_string(),
            }),
            [kind, name, attribute, ..] if !kind.is_empty() && !name.is_empty() => {
                Ok(Reference::Resource {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    attribute: attribute.to_string(),
                })
            }
            _ => Err(DocumentError::MalformedReference(expr.to_string())),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Variable(name) => write!(f, "var.{}", name),
            Reference::Module { name, attribute } => write!(f, "module.{}.{}", name, attribute),
            Reference::Resource {
                kind,
                name,
                attribute,
            } => write!(f, "{}.{}.{}", kind, name, attribute),
        }
    }
}

// ============================================================================
// ConfigDocument
// ============================================================================

/// A complete Terraform JSON configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    root: BTreeMap<String, Node>,
}

impl ConfigDocument {
    /// Wrap top-level sections without checking them.
    pub fn from_sections(root: BTreeMap<String, Node>) -> Self {
        Self { root }
    }

    /// Top-level section by name (`variable`, `module`, `resource`).
    pub fn section(&self, name: &str) -> Option<&Node> {
        self.root.get(name)
    }

    /// Descendant by path, first segment naming the section.
    pub fn pointer(&self, path: &[&str]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        self.root.get(*first)?.pointer(rest)
    }

    /// Maps inside a section, which may be a single map or a list of maps.
    fn section_maps(&self, name: &str) -> Vec<&BTreeMap<String, Node>> {
        match self.root.get(name) {
            Some(Node::Map(map)) => vec![map],
            Some(Node::List(items)) => items.iter().filter_map(Node::as_map).collect(),
            _ => Vec::new(),
        }
    }

    /// Declared variable names.
    pub fn variables(&self) -> BTreeSet<String> {
        self.section_maps("variable")
            .into_iter()
            .flat_map(|m| m.keys().cloned())
            .collect()
    }

    /// Declared module names.
    pub fn modules(&self) -> BTreeSet<String> {
        self.section_maps("module")
            .into_iter()
            .flat_map(|m| m.keys().cloned())
            .collect()
    }

    /// Declared resources as `(kind, name)` pairs.
    pub fn resources(&self) -> BTreeSet<(String, String)> {
        self.section_maps("resource")
            .into_iter()
            .flat_map(|by_kind| by_kind.iter())
            .filter_map(|(kind, blocks)| blocks.as_map().map(|b| (kind, b)))
            .flat_map(|(kind, blocks)| blocks.keys().map(move |name| (kind.clone(), name.clone())))
            .collect()
    }

    /// Every interpolation in the document, in tree order.
    pub fn references(&self) -> Result<Vec<Reference>, DocumentError> {
        let mut exprs = Vec::new();
        for node in self.root.values() {
            node.for_each_string(&mut |s| {
                for captures in INTERPOLATION.captures_iter(s) {
                    if let Some(m) = captures.get(1) {
                        exprs.push(m.as_str().to_string());
                    }
                }
            });
        }
        exprs.iter().map(|e| Reference::parse(e)).collect()
    }

    /// Check that every interpolation resolves to a declared block.
    ///
    /// `external_modules` names modules defined elsewhere in the target
    /// configuration, which may be referenced without being declared here.
    pub fn validate(&self, external_modules: &[&str]) -> Result<(), DocumentError> {
        let variables = self.variables();
        let modules = self.modules();
        let resources = self.resources();

        for reference in self.references()? {
            let resolved = match &reference {
                Reference::Variable(name) => variables.contains(name),
                Reference::Module { name, .. } => {
                    modules.contains(name) || external_modules.contains(&name.as_str())
                }
                Reference::Resource { kind, name, .. } => {
                    resources.contains(&(kind.clone(), name.clone()))
                }
            };
            if !resolved {
                return Err(DocumentError::DanglingReference(reference.to_string()));
            }
        }
        Ok(())
    }

    /// Indented JSON text.
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON text.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(DocumentError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Write the document, creating parent directories. The file is
    /// readable by the owner only.
    pub fn write_to(&self, path: &Path) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigDocument {
        let mut root = BTreeMap::new();
        root.insert(
            "variable".to_string(),
            Node::list([Node::object([(
                "db_password",
                Node::object([("type", "string".into())]),
            )])]),
        );
        root.insert(
            "module".to_string(),
            Node::object([(
                "db",
                Node::object([
                    ("password", "${var.db_password}".into()),
                    ("kms_key_id", "${aws_kms_key.db.arn}".into()),
                    ("vpc_id", "${module.network.vpc_id}".into()),
                    ("port", Node::from(5432u16)),
                ]),
            )]),
        );
        root.insert(
            "resource".to_string(),
            Node::list([Node::object([(
                "aws_kms_key",
                Node::object([("db", Node::object([("enable_key_rotation", true.into())]))]),
            )])]),
        );
        ConfigDocument::from_sections(root)
    }

    #[test]
    fn test_declarations() {
        let doc = sample();
        assert!(doc.variables().contains("db_password"));
        assert!(doc.modules().contains("db"));
        assert!(doc
            .resources()
            .contains(&("aws_kms_key".to_string(), "db".to_string())));
    }

    #[test]
    fn test_validate_resolves_references() {
        let doc = sample();
        assert_eq!(doc.references().unwrap().len(), 3);
        assert!(doc.validate(&["network"]).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_external_module() {
        let err = sample().validate(&[]).unwrap_err();
        assert!(
            matches!(err, DocumentError::DanglingReference(ref r) if r == "module.network.vpc_id")
        );
    }

    #[test]
    fn test_validate_rejects_dangling_variable() {
        let mut root = sample().root;
        root.insert(
            "output".to_string(),
            Node::object([("pw", "${var.other_password}".into())]),
        );
        let err = ConfigDocument::from_sections(root)
            .validate(&["network"])
            .unwrap_err();
        assert!(matches!(err, DocumentError::DanglingReference(_)));
    }

    #[test]
    fn test_reference_parse() {
        assert_eq!(
            Reference::parse("var.x").unwrap(),
            Reference::Variable("x".to_string())
        );
        assert_eq!(
            Reference::parse("aws_security_group.db.id").unwrap().to_string(),
            "aws_security_group.db.id"
        );
        assert!(Reference::parse("var").is_err());
        assert!(Reference::parse("").is_err());
    }

    #[test]
    fn test_pointer() {
        let doc = sample();
        assert_eq!(
            doc.pointer(&["module", "db", "port"]).and_then(Node::as_i64),
            Some(5432)
        );
        assert_eq!(
            doc.pointer(&["variable", "0", "db_password", "type"])
                .and_then(Node::as_str),
            Some("string")
        );
        assert!(doc.pointer(&["variable", "3"]).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample();
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("\n  \"module\": {"));
        let parsed = ConfigDocument::from_json(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            ConfigDocument::from_json("[]"),
            Err(DocumentError::NotAnObject)
        ));
    }
}
