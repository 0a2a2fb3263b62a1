use jsonv::{validate, Schema, ValidateOptions, ValidationError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Deserialize)]
struct TestCase {
    schema: Value,
    instance: Value,
    #[serde(default)]
    error: Option<ExpectedError>,
}

#[derive(Deserialize)]
struct ExpectedError {
    kind: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

fn kind(error: &ValidationError) -> &'static str {
    match error {
        ValidationError::MalformedInput(_) => "malformed",
        ValidationError::TypeMismatch { .. } => "type",
        ValidationError::LengthViolation { .. } => "length",
        ValidationError::KeyPatternMismatch { .. } => "pattern",
        ValidationError::MissingKey { .. } => "missing",
        ValidationError::AdditionalKey { .. } => "additional",
        ValidationError::MaxDepthExceeded => "depth",
        ValidationError::Schema(_) => "schema",
    }
}

fn error_key(error: &ValidationError) -> Option<&str> {
    match error {
        ValidationError::KeyPatternMismatch { key, .. }
        | ValidationError::MissingKey { key, .. }
        | ValidationError::AdditionalKey { key, .. } => Some(key),
        _ => None,
    }
}

fn error_path(error: &ValidationError) -> Option<&str> {
    match error {
        ValidationError::TypeMismatch { path, .. }
        | ValidationError::LengthViolation { path, .. }
        | ValidationError::KeyPatternMismatch { path, .. }
        | ValidationError::MissingKey { path, .. }
        | ValidationError::AdditionalKey { path, .. } => Some(path),
        _ => None,
    }
}

#[test]
fn validation_suite() {
    let test_cases: BTreeMap<String, TestCase> =
        serde_json::from_str(include_str!("validation.json")).expect("parse validation.json");

    for (name, test_case) in test_cases {
        let schema = Schema::from_value(&test_case.schema).expect(&name);
        let result = validate(&schema, &test_case.instance, ValidateOptions::new());

        match (&test_case.error, &result) {
            (None, Ok(())) => {}
            (Some(expected), Err(actual)) => {
                assert_eq!(expected.kind, kind(actual), "wrong error kind: {}", name);
                if let Some(key) = &expected.key {
                    assert_eq!(Some(key.as_str()), error_key(actual), "wrong key: {}", name);
                }
                if let Some(path) = &expected.path {
                    assert_eq!(
                        Some(path.as_str()),
                        error_path(actual),
                        "wrong path: {}",
                        name
                    );
                }
            }
            (_, _) => panic!(
                "wrong outcome for test case {}: expected {:?}, got {:?}",
                name,
                test_case.error.as_ref().map(|error| &error.kind),
                result
            ),
        }
    }
}
