//! Conversation message types shared by the connector, the orchestrator
//! and the HTTP wire layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message's content is either a plain string or a list of parts
/// (text and/or image_url), matching the OpenAI multimodal wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Flatten to a single string for contexts (prompts, audit logs)
    /// that only care about text, joining part texts and describing
    /// image parts by URL.
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => text.clone(),
                    ContentPart::ImageUrl { image_url } => format!("[image: {}]", image_url.url),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// True if any part is an image_url part with an http(s) URL that
    /// has not yet been inlined as a `data:` URI.
    pub fn has_remote_images(&self) -> bool {
        match self {
            Content::Text(_) => false,
            Content::Parts(parts) => parts.iter().any(|p| match p {
                ContentPart::ImageUrl { image_url } => {
                    image_url.url.starts_with("http://") || image_url.url.starts_with("https://")
                }
                ContentPart::Text { .. } => false,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }
}

/// A full conversation, as received from a client or threaded through
/// the orchestrator. Request-scoped; deep-copy (`.clone()`) before any
/// mutation so the caller's original input is never disturbed.
pub type Conversation = Vec<Message>;
