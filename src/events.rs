//! Object-arrival events
//!
//! The partitioner consumes S3 event notifications. Keys in notifications
//! are form-urlencoded (`+` for space, `%XX` escapes) and are decoded here.

use serde::Deserialize;

/// Reference to a newly available source object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// One event carrying one or more object references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectArrivalEvent {
    pub objects: Vec<ObjectRef>,
}

impl ObjectArrivalEvent {
    pub fn single(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            objects: vec![ObjectRef::new(bucket, key)],
        }
    }

    /// Parse an S3 event notification document
    pub fn from_s3_json(json: &str) -> Result<Self, serde_json::Error> {
        let notification: S3Notification = serde_json::from_str(json)?;
        Ok(notification.into())
    }
}

#[derive(Debug, Deserialize)]
struct S3Notification {
    #[serde(rename = "Records", default)]
    records: Vec<S3Record>,
}

#[derive(Debug, Deserialize)]
struct S3Record {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

impl From<S3Notification> for ObjectArrivalEvent {
    fn from(notification: S3Notification) -> Self {
        Self {
            objects: notification
                .records
                .into_iter()
                .map(|record| ObjectRef {
                    bucket: record.s3.bucket.name,
                    key: decode_object_key(&record.s3.object.key),
                })
                .collect(),
        }
    }
}

/// Decode a form-urlencoded S3 notification key
pub fn decode_object_key(raw: &str) -> String {
    // A single `k=<raw>` pair decodes the whole key; `&` and `=` are always
    // escaped in notification keys
    url::form_urlencoded::parse(format!("k={}", raw).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| raw.to_string())
}
