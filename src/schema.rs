use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix of the reserved marker-key vocabulary inside schema objects.
const MARKER_PREFIX: &str = "$schema:";

const MARKER_TYPE: &str = "$schema:type";
const MARKER_MINLENGTH: &str = "$schema:minlength";
const MARKER_REGEX: &str = "$schema:regex";
const MARKER_REQUIRED: &str = "$schema:required";
const MARKER_ANY: &str = "$schema:any";
const MARKER_ELEMENTS: &str = "$schema:elements";
const MARKER_ID: &str = "$schema:id";
const MARKER_REF: &str = "$schema:ref";

const KNOWN_MARKERS: &[&str] = &[
    MARKER_TYPE,
    MARKER_MINLENGTH,
    MARKER_REGEX,
    MARKER_REQUIRED,
    MARKER_ANY,
    MARKER_ELEMENTS,
    MARKER_ID,
    MARKER_REF,
];

/// An error in the schema document itself, as opposed to non-conformance of
/// the data being validated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema node is not an object")]
    NotAnObject,

    #[error("unknown schema marker: {marker}")]
    UnknownMarker { marker: String },

    #[error("malformed value for {marker}: expected {expected}")]
    InvalidMarker {
        marker: &'static str,
        expected: &'static str,
    },

    #[error("unknown type tag: {tag}")]
    UnknownType { tag: String },

    #[error("schema node is missing $schema:type")]
    MissingType,

    #[error("invalid key pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unresolved reference: {name}")]
    UnresolvedRef { name: String },

    #[error("array schema has no $schema:elements")]
    NoElements,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    String,
    Int,
    Float,
    Number,
    Bool,
    Array,
    Object,
}

impl FromStr for Type {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "number" => Ok(Self::Number),
            "bool" => Ok(Self::Bool),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            _ => Err(()),
        }
    }
}

impl Type {
    /// Whether `value`'s representation satisfies this type tag.
    ///
    /// Booleans never count as numbers. `int` and `float` discriminate on
    /// the JSON representation: `1` is an int, `1.0` a float, and `number`
    /// accepts either.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Type::String => value.is_string(),
            Type::Int => value.is_i64() || value.is_u64(),
            Type::Float => value.is_f64(),
            Type::Number => value.is_number(),
            Type::Bool => value.is_boolean(),
            Type::Array => value.is_array(),
            Type::Object => value.is_object(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::String => "string",
            Type::Int => "int",
            Type::Float => "float",
            Type::Number => "number",
            Type::Bool => "bool",
            Type::Array => "array",
            Type::Object => "object",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tag for a JSON value's representation, used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A compiled `$schema:regex` pattern. Matches from the start of the key,
/// not necessarily to its end.
#[derive(Clone, Debug)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    fn new(source: &str) -> Result<Self, SchemaError> {
        let regex =
            Regex::new(&format!("^(?:{})", source)).map_err(|err| SchemaError::InvalidPattern {
                pattern: source.to_owned(),
                message: err.to_string(),
            })?;

        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// The schema key that declares `data_key`: a key starting with `$` gets one
/// more `$` prepended, so it cannot collide with the marker namespace.
pub fn schema_key(data_key: &str) -> Cow<str> {
    if data_key.starts_with('$') {
        Cow::Owned(format!("${}", data_key))
    } else {
        Cow::Borrowed(data_key)
    }
}

/// The data key declared by `schema_key`: a `$$`-prefixed schema key loses
/// one leading `$`.
pub fn data_key(schema_key: &str) -> &str {
    if schema_key.starts_with("$$") {
        &schema_key[1..]
    } else {
        schema_key
    }
}

/// One node of a compiled schema tree.
#[derive(Clone, Debug)]
pub enum SchemaNode {
    /// A pure `$schema:ref` node. Validation is delegated wholesale to the
    /// referenced node; only `$schema:required` is still read here, by the
    /// enclosing object's reconciliation.
    Ref { name: String, required: bool },

    Node {
        ty: Type,
        id: Option<String>,
        min_length: Option<usize>,
        key_pattern: Option<KeyPattern>,
        required: bool,
        /// Declared child keys, in authored (`$$`-escaped) form.
        members: BTreeMap<String, SchemaNode>,
        any: Option<Box<SchemaNode>>,
        elements: Option<Box<SchemaNode>>,
    },
}

impl SchemaNode {
    /// Whether the enclosing object must contain the key this node is
    /// declared under. Defaults to true.
    pub fn required(&self) -> bool {
        match self {
            SchemaNode::Ref { required, .. } | SchemaNode::Node { required, .. } => *required,
        }
    }

    fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

        if let Some(name) = obj.get(MARKER_REF) {
            return Ok(SchemaNode::Ref {
                name: as_marker_str(MARKER_REF, name)?.to_owned(),
                required: required_marker(obj)?,
            });
        }

        let ty = match obj.get(MARKER_TYPE) {
            Some(tag) => {
                let tag = as_marker_str(MARKER_TYPE, tag)?;
                tag.parse().map_err(|()| SchemaError::UnknownType {
                    tag: tag.to_owned(),
                })?
            }
            None => return Err(SchemaError::MissingType),
        };

        let min_length = match obj.get(MARKER_MINLENGTH) {
            Some(value) => Some(value.as_u64().ok_or(SchemaError::InvalidMarker {
                marker: MARKER_MINLENGTH,
                expected: "a non-negative integer",
            })? as usize),
            None => None,
        };

        let key_pattern = match obj.get(MARKER_REGEX) {
            Some(value) => Some(KeyPattern::new(as_marker_str(MARKER_REGEX, value)?)?),
            None => None,
        };

        let id = match obj.get(MARKER_ID) {
            Some(value) => Some(as_marker_str(MARKER_ID, value)?.to_owned()),
            None => None,
        };

        let any = match obj.get(MARKER_ANY) {
            Some(value) => Some(Box::new(SchemaNode::from_value(value)?)),
            None => None,
        };

        let elements = match obj.get(MARKER_ELEMENTS) {
            Some(value) => Some(Box::new(SchemaNode::from_value(value)?)),
            None => None,
        };

        let mut members = BTreeMap::new();
        for (key, sub_schema) in obj {
            if key.starts_with(MARKER_PREFIX) {
                if !KNOWN_MARKERS.contains(&key.as_str()) {
                    return Err(SchemaError::UnknownMarker {
                        marker: key.clone(),
                    });
                }
                continue;
            }

            members.insert(key.clone(), SchemaNode::from_value(sub_schema)?);
        }

        Ok(SchemaNode::Node {
            ty,
            id,
            min_length,
            key_pattern,
            required: required_marker(obj)?,
            members,
            any,
            elements,
        })
    }

    fn register(&self, references: &mut BTreeMap<String, SchemaNode>) {
        if let SchemaNode::Node {
            id,
            members,
            any,
            elements,
            ..
        } = self
        {
            if let Some(id) = id {
                references.insert(id.clone(), self.clone());
            }

            for sub_schema in members.values() {
                sub_schema.register(references);
            }
            if let Some(any) = any {
                any.register(references);
            }
            if let Some(elements) = elements {
                elements.register(references);
            }
        }
    }

    fn check_refs(&self, references: &BTreeMap<String, SchemaNode>) -> Result<(), SchemaError> {
        match self {
            SchemaNode::Ref { name, .. } => {
                if !references.contains_key(name) {
                    return Err(SchemaError::UnresolvedRef { name: name.clone() });
                }
            }
            SchemaNode::Node {
                members,
                any,
                elements,
                ..
            } => {
                for sub_schema in members.values() {
                    sub_schema.check_refs(references)?;
                }
                if let Some(any) = any {
                    any.check_refs(references)?;
                }
                if let Some(elements) = elements {
                    elements.check_refs(references)?;
                }
            }
        }

        Ok(())
    }
}

/// A compiled schema document: the root node plus the reference table built
/// from every `$schema:id` in the tree.
///
/// The table is populated once here, in depth-first document order (a later
/// duplicate id overwrites an earlier one), and is never written during
/// validation. Forward references therefore resolve no matter which part of
/// a document is validated first, and one compiled schema can be shared
/// across threads validating many documents.
#[derive(Clone, Debug)]
pub struct Schema {
    root: SchemaNode,
    references: BTreeMap<String, SchemaNode>,
}

impl Schema {
    /// Compile a parsed schema document.
    ///
    /// All authoring checks happen here: every node must be an object and,
    /// unless it is a pure `$schema:ref`, carry a recognized `$schema:type`;
    /// marker values must have their expected shapes; every `$schema:ref`
    /// must resolve to some `$schema:id` in the tree.
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = jsonv::Schema::from_value(&json!({
    ///     "$schema:type": "object",
    ///     "name": { "$schema:type": "string" },
    /// }))
    /// .unwrap();
    ///
    /// assert!(jsonv::validate_document(&schema, r#"{"name": "ok"}"#).is_ok());
    /// ```
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let root = SchemaNode::from_value(value)?;

        let mut references = BTreeMap::new();
        root.register(&mut references);
        root.check_refs(&references)?;

        Ok(Schema { root, references })
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn reference(&self, name: &str) -> Option<&SchemaNode> {
        self.references.get(name)
    }
}

fn as_marker_str<'a>(marker: &'static str, value: &'a Value) -> Result<&'a str, SchemaError> {
    value.as_str().ok_or(SchemaError::InvalidMarker {
        marker,
        expected: "a string",
    })
}

fn required_marker(obj: &Map<String, Value>) -> Result<bool, SchemaError> {
    match obj.get(MARKER_REQUIRED) {
        Some(value) => value.as_bool().ok_or(SchemaError::InvalidMarker {
            marker: MARKER_REQUIRED,
            expected: "a boolean",
        }),
        None => Ok(true),
    }
}
