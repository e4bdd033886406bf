use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{achievement::ItemStack, world::WorldAttributes};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameContext {
    pub player_name: String,

    #[serde(default)]
    pub world: WorldAttributes,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl GameContext {
    pub fn new(player_name: impl Into<String>, world: WorldAttributes) -> Self {
        Self {
            player_name: player_name.into(),
            world,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSource {
    Game,
    Public,
    Private,
    Clan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    ChatMessage {
        #[serde(default = "default_chat_source")]
        source: ChatSource,
        text: String,
    },
    LootReceived {
        #[serde(default)]
        source: Option<String>,
        items: Vec<ItemStack>,
    },
    LevelChanged {
        skill: String,
        previous_level: u32,
        level: u32,
    },
    PlayerDied {
        #[serde(default)]
        killer: Option<String>,
    },
    WorldChanged,
}

fn default_chat_source() -> ChatSource {
    ChatSource::Game
}

impl GameEvent {
    pub fn game_message(text: impl Into<String>) -> Self {
        GameEvent::ChatMessage {
            source: ChatSource::Game,
            text: text.into(),
        }
    }
}

/// One line of the host stream: the event plus the context it happened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostMessage {
    pub context: GameContext,
    pub event: GameEvent,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// PNG screenshot on disk, uploaded as an attachment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
}

impl HostMessage {
    pub fn new(context: GameContext, event: GameEvent) -> Self {
        Self {
            context,
            event,
            image_url: None,
            screenshot_path: None,
        }
    }
}
