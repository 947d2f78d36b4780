//! Validation functions for persisted manifests
//!
//! Manifests are handed between runs (and sometimes edited by operators to
//! force a retry), so a document is checked against a JSON Schema before it
//! is trusted, then its partition indices are rebuilt and verified.

use crate::error::{Error, Result};
use crate::manifest::ManifestDocument;
use crate::MANIFEST_SCHEMA_VERSION;
use jsonschema::{ValidationError, Validator};
use serde_json::{json, Value};
use std::path::Path;

/// Validate a manifest document against its JSON Schema
pub fn validate_manifest_document(document: &ManifestDocument) -> Result<()> {
    let value = serde_json::to_value(document)?;
    validate_manifest_value(&value)
}

/// Validate a manifest file on disk without building the manifest
pub fn validate_manifest_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::manifest_not_found(path));
    }
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    validate_manifest_value(&value)
}

/// Validate an arbitrary JSON value as a manifest document
pub fn validate_manifest_value(value: &Value) -> Result<()> {
    let schema = get_manifest_schema();
    let compiled = Validator::new(&schema)
        .map_err(|e| Error::validation(format!("Failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled.validate(value) {
        let error_messages: Vec<String> = errors.map(|e| format_validation_error(&e)).collect();

        return Err(Error::validation(format!(
            "Manifest validation failed:\n  - {}",
            error_messages.join("\n  - ")
        )));
    }

    Ok(())
}

/// Format a validation error into a readable string
fn format_validation_error(error: &ValidationError) -> String {
    format!("{}: {}", error.instance_path, error)
}

/// Get the manifest JSON Schema
fn get_manifest_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["schema", "plan_id", "created_utc", "partitions"],
        "properties": {
            "schema": {
                "type": "string",
                "const": MANIFEST_SCHEMA_VERSION
            },
            "plan_id": {
                "type": "string",
                "minLength": 1
            },
            "created_utc": {
                "type": "string",
                "format": "date-time"
            },
            "errors": {
                "type": "array",
                "items": { "type": "string" }
            },
            "partitions": {
                "type": "object",
                "additionalProperties": {
                    "type": "array",
                    "items": { "$ref": "#/$defs/entry" }
                }
            }
        },
        "$defs": {
            "reference": {
                "type": "object",
                "required": ["id", "location"],
                "properties": {
                    "id": {
                        "type": "string",
                        "minLength": 1
                    },
                    "location": {
                        "type": "string"
                    },
                    "content_url": {
                        "type": ["string", "null"]
                    }
                }
            },
            "entry": {
                "type": "object",
                "required": ["source", "mapped_location"],
                "properties": {
                    "source": { "$ref": "#/$defs/reference" },
                    "mapped_location": { "type": "string" },
                    "destination": {
                        "anyOf": [
                            { "$ref": "#/$defs/reference" },
                            { "type": "null" }
                        ]
                    },
                    "status": {
                        "type": "string",
                        "enum": ["pending", "migrated", "skipped", "failed", "canceled"]
                    },
                    "has_migrated": { "type": "boolean" },
                    "errors": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                }
            }
        }
    })
}
