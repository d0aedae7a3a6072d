use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(ItemId, String);
id_newtype!(TaskId, i64);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The four judgments a user can commit for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Yes,
    No,
    DontKnow,
    Trash,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Yes,
        Direction::No,
        Direction::DontKnow,
        Direction::Trash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::DontKnow => "dont-know",
            Self::Trash => "trash",
        }
    }

    /// Screen-space unit vector the card leaves along on commit (y grows downward).
    pub fn unit_vector(&self) -> (f32, f32) {
        match self {
            Self::Yes => (1.0, 0.0),
            Self::No => (-1.0, 0.0),
            Self::DontKnow => (0.0, -1.0),
            Self::Trash => (0.0, 1.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            "dont-know" | "dont_know" | "dontknow" => Ok(Self::DontKnow),
            "trash" => Ok(Self::Trash),
            other => Err(UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// Opaque image reference. The client never decodes image content itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Uri { uri: String },
    Inline { content_type: String, data_b64: String },
}

impl ImageRef {
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri { uri: uri.into() }
    }

    pub fn inline(content_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Inline {
            content_type: content_type.into(),
            data_b64: STANDARD.encode(bytes),
        }
    }

    /// Decoded bytes of an inline blob; `None` for URI references.
    pub fn inline_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        match self {
            Self::Uri { .. } => None,
            Self::Inline { data_b64, .. } => Some(STANDARD.decode(data_b64)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Uri { uri } => uri.clone(),
            Self::Inline {
                content_type,
                data_b64,
            } => format!("<inline {content_type}, {} b64 chars>", data_b64.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub image: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// One unit of work: a prompt and an image that needs exactly one judgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationItem {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub prompt: String,
    pub image: ImageRef,
    #[serde(default)]
    pub reference_images: Vec<ReferenceImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_wire_names_match_judgment_vocabulary() {
        let names: Vec<String> = Direction::ALL
            .iter()
            .map(|d| serde_json::to_string(d).expect("serialize"))
            .collect();
        assert_eq!(names, vec!["\"yes\"", "\"no\"", "\"dont-know\"", "\"trash\""]);
        assert_eq!("dont-know".parse::<Direction>().expect("parse"), Direction::DontKnow);
        assert!("maybe".parse::<Direction>().is_err());
    }

    #[test]
    fn image_ref_accepts_uri_and_inline_shapes() {
        let item: ClassificationItem = serde_json::from_value(serde_json::json!({
            "id": "1234",
            "task_id": 7,
            "prompt": "Is this a Vespa mandarinia?",
            "image": { "content_type": "image/jpeg", "data_b64": "aGk=" },
            "reference_images": [
                { "image": { "uri": "https://example.com/ref1.jpg" }, "caption": "Dorsal view" }
            ]
        }))
        .expect("deserialize");

        assert_eq!(item.id, ItemId::new("1234"));
        assert_eq!(item.task_id, Some(TaskId(7)));
        assert_eq!(item.image, ImageRef::inline("image/jpeg", b"hi"));
        let bytes = item.image.inline_bytes().expect("inline").expect("decode");
        assert_eq!(bytes, b"hi");
        assert_eq!(
            item.reference_images[0].image,
            ImageRef::uri("https://example.com/ref1.jpg")
        );
        assert!(item.reference_images[0].image.inline_bytes().is_none());
    }
}
