use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::achievement::AchievementKind, utils::truncate_text};

pub const MAX_CONTENT_LENGTH: usize = 2000;
pub const MAX_TITLE_LENGTH: usize = 256;
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;
pub const MAX_FIELDS: usize = 25;
pub const MAX_FIELD_NAME_LENGTH: usize = 256;
pub const MAX_FIELD_VALUE_LENGTH: usize = 1024;
pub const MAX_FOOTER_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEmbed {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<UrlEmbed>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    fn truncated(&self) -> Self {
        Self {
            title: self
                .title
                .as_deref()
                .map(|t| truncate_text(t, MAX_TITLE_LENGTH)),
            description: self
                .description
                .as_deref()
                .map(|d| truncate_text(d, MAX_DESCRIPTION_LENGTH)),
            fields: self
                .fields
                .iter()
                .take(MAX_FIELDS)
                .map(|field| Field {
                    name: truncate_text(&field.name, MAX_FIELD_NAME_LENGTH),
                    value: truncate_text(&field.value, MAX_FIELD_VALUE_LENGTH),
                    inline: field.inline,
                })
                .collect(),
            image: self.image.clone(),
            footer: self.footer.as_ref().map(|footer| Footer {
                text: truncate_text(&footer.text, MAX_FOOTER_LENGTH),
            }),
            timestamp: self.timestamp,
        }
    }
}

/// Image accompanying a notification: either a hosted URL or raw PNG bytes
/// uploaded alongside the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    Attachment { file_name: String, bytes: Vec<u8> },
}

/// Endpoint-agnostic message, immutable after the builder hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub kind: AchievementKind,
    pub player_name: String,
    pub text: String,
    pub embeds: Vec<Embed>,
    pub image: Option<ImageRef>,
}

impl NotificationPayload {
    /// Renders the JSON document posted to the webhook, truncating every
    /// field to the service limits.
    pub fn to_webhook_body(&self) -> WebhookBody {
        WebhookBody {
            content: truncate_text(&self.text, MAX_CONTENT_LENGTH),
            embeds: self.embeds.iter().map(Embed::truncated).collect(),
            kind: self.kind,
            player_name: self.player_name.clone(),
        }
    }

    pub fn attachment(&self) -> Option<(&str, &[u8])> {
        match &self.image {
            Some(ImageRef::Attachment { file_name, bytes }) => {
                Some((file_name.as_str(), bytes.as_slice()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    pub content: String,
    pub embeds: Vec<Embed>,

    #[serde(rename = "type")]
    pub kind: AchievementKind,

    pub player_name: String,
}
