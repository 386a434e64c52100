use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single directory record.
///
/// `last_modified` is absent until the record is first written through the
/// directory; create and replace stamp it and ignore any caller-supplied
/// value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn new(id: i64, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            last_modified: None,
        }
    }
}
