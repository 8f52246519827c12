//! Firestore and Identity Toolkit REST wire types.

use crate::error::BackendError;
use crate::model::{NewTodo, Todo, TodoId, TodoPatch, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Stored field: todo text
pub const FIELD_TEXT: &str = "text";
/// Stored field: completion flag
pub const FIELD_COMPLETED: &str = "completed";
/// Stored field: owning user
pub const FIELD_OWNER: &str = "userId";
/// Stored field: server creation time
pub const FIELD_CREATED: &str = "timestamp";
/// Stored field: server time of the last text edit
pub const FIELD_LAST_MODIFIED: &str = "lastModified";

const REQUEST_TIME: &str = "REQUEST_TIME";

// ═══════════════════════════════════════════════════════════
// Firestore values and documents
// ═══════════════════════════════════════════════════════════

/// A typed Firestore value, e.g. `{"stringValue": "Buy milk"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    /// `null`
    NullValue(()),
    /// Boolean
    BooleanValue(bool),
    /// 64-bit integer, encoded as a decimal string
    IntegerValue(String),
    /// Double
    DoubleValue(f64),
    /// RFC 3339 timestamp
    TimestampValue(DateTime<Utc>),
    /// UTF-8 string
    StringValue(String),
}

impl Value {
    fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }

    const fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampValue(t) => Some(*t),
            _ => None,
        }
    }
}

/// A Firestore document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: String,
    /// Field values
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    /// Server creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Server update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Decode into a [`Todo`].
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Internal`] if `text` or `userId` is missing.
    pub fn to_todo(&self) -> Result<Todo, BackendError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BackendError::Internal(format!("bad document name: {}", self.name)))?;
        let field = |name: &str| self.fields.get(name);
        let missing = |name: &str| {
            BackendError::Internal(format!("document {id} has no `{name}` field"))
        };

        Ok(Todo {
            id: TodoId::new(id),
            text: field(FIELD_TEXT)
                .and_then(Value::as_str)
                .ok_or_else(|| missing(FIELD_TEXT))?
                .to_string(),
            completed: field(FIELD_COMPLETED)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            owner: UserId::new(
                field(FIELD_OWNER)
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(FIELD_OWNER))?,
            ),
            created_at: field(FIELD_CREATED).and_then(Value::as_timestamp),
            last_modified_at: field(FIELD_LAST_MODIFIED).and_then(Value::as_timestamp),
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Commit (writes)
// ═══════════════════════════════════════════════════════════

/// Body of `documents:commit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRequest {
    /// Writes applied atomically
    pub writes: Vec<Write>,
}

/// One write of a commit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    /// Document to create or update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,
    /// Resource name to delete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    /// Fields touched by `update`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
    /// Server-side transforms applied after `update`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
    /// Existence precondition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

/// Field paths of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    /// Updated fields
    pub field_paths: Vec<String>,
}

/// Server-side field transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    /// Transformed field
    pub field_path: String,
    /// Server value to store
    pub set_to_server_value: String,
}

impl FieldTransform {
    fn request_time(field: &str) -> Self {
        Self {
            field_path: field.to_string(),
            set_to_server_value: REQUEST_TIME.to_string(),
        }
    }
}

/// Write precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Precondition {
    /// Document must (not) exist
    pub exists: bool,
}

/// Create `name` from `todo`, stamping `timestamp` with the commit time.
#[must_use]
pub fn create_write(name: String, todo: &NewTodo) -> Write {
    let fields = HashMap::from([
        (FIELD_TEXT.to_string(), Value::StringValue(todo.text.clone())),
        (FIELD_COMPLETED.to_string(), Value::BooleanValue(false)),
        (
            FIELD_OWNER.to_string(),
            Value::StringValue(todo.owner.as_str().to_string()),
        ),
    ]);
    Write {
        update: Some(Document {
            name,
            fields,
            create_time: None,
            update_time: None,
        }),
        update_transforms: vec![FieldTransform::request_time(FIELD_CREATED)],
        current_document: Some(Precondition { exists: false }),
        ..Write::default()
    }
}

/// Apply `patch` to the existing document `name`.
#[must_use]
pub fn update_write(name: String, patch: &TodoPatch) -> Write {
    let mut fields = HashMap::new();
    if let Some(text) = &patch.text {
        fields.insert(FIELD_TEXT.to_string(), Value::StringValue(text.clone()));
    }
    if let Some(completed) = patch.completed {
        fields.insert(FIELD_COMPLETED.to_string(), Value::BooleanValue(completed));
    }
    let mut field_paths: Vec<String> = fields.keys().cloned().collect();
    field_paths.sort();

    let update_transforms = patch
        .last_modified
        .map(|_| FieldTransform::request_time(FIELD_LAST_MODIFIED))
        .into_iter()
        .collect();

    Write {
        update: Some(Document {
            name,
            fields,
            create_time: None,
            update_time: None,
        }),
        update_mask: Some(DocumentMask { field_paths }),
        update_transforms,
        current_document: Some(Precondition { exists: true }),
        ..Write::default()
    }
}

/// Delete `name`.
#[must_use]
pub fn delete_write(name: String) -> Write {
    Write {
        delete: Some(name),
        ..Write::default()
    }
}

// ═══════════════════════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════════════════════

/// Body of `documents:runQuery` for the todos of `owner`.
///
/// Equality filter only; ordering is applied client-side with
/// [`TodoQuery::sort`](crate::model::TodoQuery::sort), so no composite index
/// is needed and documents still awaiting their timestamp are returned.
#[must_use]
pub fn owner_query(collection: &str, owner: &UserId) -> serde_json::Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": FIELD_OWNER },
                    "op": "EQUAL",
                    "value": { "stringValue": owner.as_str() }
                }
            }
        }
    })
}

/// One element of the `runQuery` response array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    /// Matching document; absent in progress-only elements
    #[serde(default)]
    pub document: Option<Document>,
}

// ═══════════════════════════════════════════════════════════
// Identity Toolkit / Secure Token
// ═══════════════════════════════════════════════════════════

/// Body of `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
    /// Always `true`: ask for id and refresh tokens
    pub return_secure_token: bool,
}

/// Response of `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResponse {
    /// User id
    pub local_id: String,
    /// Account email
    #[serde(default)]
    pub email: String,
    /// Id token
    pub id_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Id token lifetime in seconds, as a decimal string
    pub expires_in: String,
}

/// Body of the Secure Token refresh call.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    /// Always `refresh_token`
    pub grant_type: &'static str,
    /// Current refresh token
    pub refresh_token: &'a str,
}

/// Response of the Secure Token refresh call.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    /// New id token
    pub id_token: String,
    /// New refresh token
    pub refresh_token: String,
    /// Id token lifetime in seconds, as a decimal string
    pub expires_in: String,
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details
    pub error: ErrorBody,
}

/// Google API error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message (Identity Toolkit puts its code here)
    #[serde(default)]
    pub message: String,
    /// Canonical status such as `NOT_FOUND`
    #[serde(default)]
    pub status: Option<String>,
}
