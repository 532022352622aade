//! Patch operations
//!
//! API Gateway partial updates are expressed as lists of patch operations.
//! Diff builders produce [`PatchOp`] values; the wire encoding is applied
//! only at the client boundary.

use serde_json::{json, Value};

/// A single patch operation against a resource attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    Replace { path: String, value: String },
    Add { path: String, value: String },
    /// Remove an attribute; some list paths (apiStages) carry a value
    /// naming the entry to drop.
    Remove { path: String, value: Option<String> },
}

impl PatchOp {
    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Replace {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn add(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Add {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove {
            path: path.into(),
            value: None,
        }
    }

    pub fn remove_value(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Remove {
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// Encode as the provider's `patchOperations` entry format.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Replace { path, value } => {
                json!({"op": "replace", "path": path, "value": value})
            }
            Self::Add { path, value } => json!({"op": "add", "path": path, "value": value}),
            Self::Remove { path, value: None } => json!({"op": "remove", "path": path}),
            Self::Remove {
                path,
                value: Some(value),
            } => json!({"op": "remove", "path": path, "value": value}),
        }
    }
}

/// Encode a full patch list as the `patchOperations` request body array.
pub fn to_wire_ops(ops: &[PatchOp]) -> Value {
    Value::Array(ops.iter().map(PatchOp::to_wire).collect())
}

/// Render an observed JSON value the way the provider's patch endpoint
/// expects string comparisons: booleans capitalize to `True` / `False`.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Bool(b) => bool_str(*b).to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Boolean patch values use capitalized spelling on the wire.
pub fn bool_str(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Render a float patch value, keeping a trailing `.0` for whole numbers
/// so the wire form matches what the provider echoes back.
pub fn float_str(f: f64) -> String {
    format!("{f:?}")
}

/// Escape slashes in a method path for use inside a patch path segment
/// (`/test` becomes `~1test`).
pub fn escape_path(path: &str) -> String {
    path.replace('/', "~1")
}
