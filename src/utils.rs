use std::collections::HashMap;

use crate::models::{
    achievement::ItemStack,
    world::{WorldAttributes, WorldType},
};

const IGNORED_WORLDS: [WorldType; 5] = [
    WorldType::PvpArena,
    WorldType::QuestSpeedrunning,
    WorldType::BetaWorld,
    WorldType::NosaveMode,
    WorldType::TournamentWorld,
];

const ELLIPSIS: &str = "...";

/// True when any flag of the world suppresses notifications.
pub fn is_ignored_world(attributes: &WorldAttributes) -> bool {
    IGNORED_WORLDS
        .iter()
        .any(|world_type| attributes.contains(*world_type))
}

/// Merges observations sharing an item id. The merged entry sits where the id
/// first appeared and keeps that occurrence's metadata.
pub fn reduce_item_stacks<I>(items: I) -> Vec<ItemStack>
where
    I: IntoIterator<Item = ItemStack>,
{
    let mut slots: HashMap<i32, usize> = HashMap::new();
    let mut reduced: Vec<ItemStack> = Vec::new();

    for item in items {
        match slots.get(&item.id) {
            Some(&slot) => {
                reduced[slot].quantity = reduced[slot].quantity.saturating_add(item.quantity);
            }
            None => {
                slots.insert(item.id, reduced.len());
                reduced.push(item);
            }
        }
    }

    reduced
}

/// Parses numerals like `11,150`.
pub fn parse_grouped_number(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(|c| *c != ',').collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}

/// Cuts `text` to at most `max_chars` characters, ending with `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(&ELLIPSIS[..max_chars.min(ELLIPSIS.len())]);
    truncated
}
