use crate::schema::{self, Schema, SchemaError, SchemaNode, Type};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default)]
pub struct ValidateOptions {
    max_depth: usize,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the validation recursion depth, counting both structural
    /// descent into the data and `$schema:ref` redirects. 0 means no limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// The first violation found while validating one document.
///
/// `path` is the location in the data document, `/`-separated, `/` being the
/// document root.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("{path}: invalid type: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: Type,
        found: &'static str,
    },

    #[error("{path}: length {len} is less than the required minimum {min}")]
    LengthViolation { path: String, min: usize, len: usize },

    #[error("{path}: key {key:?} does not match pattern {pattern:?}")]
    KeyPatternMismatch {
        path: String,
        key: String,
        pattern: String,
    },

    #[error("{path}: missing key: {key}")]
    MissingKey { path: String, key: String },

    #[error("{path}: additional key: {key}")]
    AdditionalKey { path: String, key: String },

    #[error("max depth exceeded")]
    MaxDepthExceeded,

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Validate a parsed document against a compiled schema, stopping at the
/// first violation.
pub fn validate(
    schema: &Schema,
    instance: &Value,
    options: ValidateOptions,
) -> Result<(), ValidationError> {
    let mut vm = Vm {
        schema,
        max_depth: options.max_depth,
        depth: 0,
        instance_tokens: vec![],
    };

    vm.validate(schema.root(), None, instance)
}

/// Parse `raw` as a JSON document, then validate it with default options.
pub fn validate_document(schema: &Schema, raw: &str) -> Result<(), ValidationError> {
    let instance: Value =
        serde_json::from_str(raw).map_err(|err| ValidationError::MalformedInput(err.to_string()))?;

    validate(schema, &instance, ValidateOptions::new())
}

struct Vm<'a> {
    schema: &'a Schema,
    max_depth: usize,
    depth: usize,
    instance_tokens: Vec<String>,
}

impl<'a> Vm<'a> {
    fn validate(
        &mut self,
        node: &'a SchemaNode,
        reached_by: Option<&str>,
        instance: &Value,
    ) -> Result<(), ValidationError> {
        self.depth += 1;
        if self.max_depth != 0 && self.depth > self.max_depth {
            return Err(ValidationError::MaxDepthExceeded);
        }

        match node {
            SchemaNode::Ref { name, .. } => {
                // Resolution was checked at compile time; a redirect behaves
                // as if the registered node were inlined here, so the
                // reaching key is forwarded.
                let target = self
                    .schema
                    .reference(name)
                    .ok_or_else(|| SchemaError::UnresolvedRef { name: name.clone() })?;

                self.validate(target, reached_by, instance)?;
            }
            SchemaNode::Node {
                ty,
                min_length,
                key_pattern,
                members,
                any,
                elements,
                ..
            } => {
                if !ty.matches(instance) {
                    return Err(ValidationError::TypeMismatch {
                        path: self.path(),
                        expected: *ty,
                        found: schema::value_kind(instance),
                    });
                }

                if let (Some(min), Some(len)) = (min_length, value_len(instance)) {
                    if len < *min {
                        return Err(ValidationError::LengthViolation {
                            path: self.path(),
                            min: *min,
                            len,
                        });
                    }
                }

                if let (Some(key), Some(pattern)) = (reached_by, key_pattern) {
                    if !pattern.is_match(key) {
                        return Err(ValidationError::KeyPatternMismatch {
                            path: self.path(),
                            key: key.to_owned(),
                            pattern: pattern.source().to_owned(),
                        });
                    }
                }

                match instance {
                    Value::Object(obj) => self.validate_object(obj, members, any.as_deref())?,
                    Value::Array(arr) => self.validate_elements(arr, elements.as_deref())?,
                    _ => {}
                }
            }
        }

        self.depth -= 1;
        Ok(())
    }

    fn validate_object(
        &mut self,
        obj: &Map<String, Value>,
        members: &'a BTreeMap<String, SchemaNode>,
        any: Option<&'a SchemaNode>,
    ) -> Result<(), ValidationError> {
        for (skey, member) in members {
            let dkey = schema::data_key(skey);
            if !obj.contains_key(dkey) && member.required() {
                return Err(ValidationError::MissingKey {
                    path: self.path(),
                    key: dkey.to_owned(),
                });
            }
        }

        for (dkey, sub_instance) in obj {
            let skey = schema::schema_key(dkey);
            let member = match members.get(skey.as_ref()) {
                Some(member) => member,
                None => match any {
                    Some(any) => any,
                    None => {
                        return Err(ValidationError::AdditionalKey {
                            path: self.path(),
                            key: dkey.clone(),
                        });
                    }
                },
            };

            self.instance_tokens.push(dkey.clone());
            self.validate(member, Some(dkey.as_str()), sub_instance)?;
            self.instance_tokens.pop();
        }

        Ok(())
    }

    fn validate_elements(
        &mut self,
        arr: &[Value],
        elements: Option<&'a SchemaNode>,
    ) -> Result<(), ValidationError> {
        let elements = match elements {
            Some(elements) => elements,
            // An always-empty array needs no element schema.
            None if arr.is_empty() => return Ok(()),
            None => return Err(SchemaError::NoElements.into()),
        };

        for (i, sub_instance) in arr.iter().enumerate() {
            self.instance_tokens.push(i.to_string());
            self.validate(elements, None, sub_instance)?;
            self.instance_tokens.pop();
        }

        Ok(())
    }

    fn path(&self) -> String {
        if self.instance_tokens.is_empty() {
            return "/".to_owned();
        }

        let mut path = String::new();
        for token in &self.instance_tokens {
            path.push('/');
            path.push_str(token);
        }
        path
    }
}

fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(arr) => Some(arr.len()),
        Value::Object(obj) => Some(obj.len()),
        _ => None,
    }
}
