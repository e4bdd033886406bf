use std::collections::HashMap;

use achievement_notifier::{
    models::{
        achievement::ItemStack,
        world::{WorldAttributes, WorldType},
    },
    utils::{is_ignored_world, parse_grouped_number, reduce_item_stacks, truncate_text},
};
use rstest::rstest;

fn stacks(pairs: &[(i32, i64)]) -> Vec<ItemStack> {
    pairs
        .iter()
        .map(|(id, quantity)| ItemStack::new(*id, *quantity))
        .collect()
}

fn totals(items: &[ItemStack]) -> HashMap<i32, i64> {
    let mut totals = HashMap::new();
    for item in items {
        *totals.entry(item.id).or_insert(0) += item.quantity;
    }
    totals
}

/// Test: Observations sharing an id are merged in first-seen order
#[test]
fn test_reduce_merges_shared_ids() {
    let reduced = reduce_item_stacks(stacks(&[(69, 1), (70, 2), (69, 3)]));

    assert_eq!(reduced, stacks(&[(69, 4), (70, 2)]));
}

#[test]
fn test_reduce_empty_is_empty() {
    assert!(reduce_item_stacks(Vec::new()).is_empty());
}

#[rstest]
#[case(&[(1, 5)])]
#[case(&[(1, 5), (1, 5), (1, 5)])]
#[case(&[(995, 1_000_000), (536, 1), (995, 2_500_000), (12073, 1), (536, 3)])]
#[case(&[(7, -2), (7, 3), (8, 0)])]
fn test_reduce_conserves_quantity_without_duplicates(#[case] input: &[(i32, i64)]) {
    let input = stacks(input);
    let reduced = reduce_item_stacks(input.clone());

    assert_eq!(totals(&reduced), totals(&input));

    let mut ids: Vec<i32> = reduced.iter().map(|item| item.id).collect();
    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count, "Reduced output must not repeat an id");

    assert_eq!(reduce_item_stacks(reduced.clone()), reduced, "Reduce must be idempotent");
}

#[test]
fn test_reduce_keeps_first_metadata() {
    let reduced = reduce_item_stacks(vec![
        ItemStack::new(4151, 1).with_metadata("Abyssal whip"),
        ItemStack::new(4151, 1).with_metadata("ignored"),
    ]);

    assert_eq!(reduced, vec![ItemStack::new(4151, 2).with_metadata("Abyssal whip")]);
}

#[rstest]
#[case(WorldType::PvpArena)]
#[case(WorldType::QuestSpeedrunning)]
#[case(WorldType::BetaWorld)]
#[case(WorldType::NosaveMode)]
#[case(WorldType::TournamentWorld)]
fn test_ignored_world_types(#[case] world_type: WorldType) {
    assert!(is_ignored_world(&WorldAttributes::from([world_type])));
    assert!(is_ignored_world(&WorldAttributes::from([
        WorldType::Members,
        world_type
    ])));
}

#[rstest]
#[case(WorldAttributes::empty())]
#[case(WorldAttributes::from([WorldType::Members]))]
#[case(WorldAttributes::from([WorldType::Pvp, WorldType::HighRisk]))]
#[case(WorldAttributes::from([WorldType::Seasonal, WorldType::Deadman, WorldType::SkillTotal]))]
fn test_regular_worlds_are_not_ignored(#[case] attributes: WorldAttributes) {
    assert!(!is_ignored_world(&attributes));
}

/// Test: Adding world flags never un-ignores a world
#[test]
fn test_ignored_world_is_monotonic_under_union() {
    let ignored = WorldAttributes::from([WorldType::BetaWorld]);
    let extras = [
        WorldAttributes::empty(),
        WorldAttributes::from([WorldType::Members]),
        WorldAttributes::from([WorldType::Pvp, WorldType::FreshStartWorld]),
        WorldAttributes::from([WorldType::LastManStanding, WorldType::Seasonal]),
    ];

    for extra in extras {
        assert!(is_ignored_world(&ignored.union(&extra)));
        assert!(is_ignored_world(&extra.union(&ignored)));
    }
}

#[test]
fn test_world_attributes_json() {
    let attributes: WorldAttributes =
        serde_json::from_str(r#"["MEMBERS", "TOURNAMENT_WORLD"]"#).unwrap();

    assert!(attributes.contains(WorldType::TournamentWorld));
    assert!(is_ignored_world(&attributes));
}

#[rstest]
#[case("11,150", Some(11150))]
#[case("125", Some(125))]
#[case(",", None)]
#[case("12a", None)]
fn test_parse_grouped_number(#[case] text: &str, #[case] expected: Option<u32>) {
    assert_eq!(parse_grouped_number(text), expected);
}

#[test]
fn test_truncate_text_counts_characters() {
    assert_eq!(truncate_text("short", 10), "short");
    assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
    assert_eq!(truncate_text("ééééé", 4), "é...");
    assert_eq!(truncate_text("abcdef", 2), "..");
}
