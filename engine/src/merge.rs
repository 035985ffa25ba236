//! Field-wise merge of two divergent snapshots.
//!
//! # Algorithm
//!
//! 1. Scalars (score, level, xp, coins, gems): `max(local, server)` each
//! 2. Unlocked areas: set union, sorted ascending
//! 3. Achievements: set union, server order first then local-only ids
//! 4. Inventory: start from the server entries; for an item present on both
//!    sides take the larger quantity and the earlier `discoveredAt`; append
//!    local-only items unchanged
//! 5. Everything else (`createdAt`, `lastModified`) comes from the server

use crate::{InventoryEntry, ProgressRecord};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Merge `local` into `server`, never losing progress on either side.
pub fn merge_records(local: &ProgressRecord, server: &ProgressRecord) -> ProgressRecord {
    let mut merged = server.clone();

    merged.score = local.score.max(server.score);
    merged.level = local.level.max(server.level);
    merged.xp = local.xp.max(server.xp);
    merged.coins = local.coins.max(server.coins);
    merged.gems = local.gems.max(server.gems);

    merged.unlocked_areas = merge_areas(&local.unlocked_areas, &server.unlocked_areas);
    merged.achievements = merge_achievements(&local.achievements, &server.achievements);
    merged.inventory = merge_inventory(&local.inventory, &server.inventory);

    merged
}

fn merge_areas(local: &[u32], server: &[u32]) -> Vec<u32> {
    server
        .iter()
        .chain(local)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn merge_achievements(local: &[String], server: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    server
        .iter()
        .chain(local)
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn merge_inventory(local: &[InventoryEntry], server: &[InventoryEntry]) -> Vec<InventoryEntry> {
    let mut merged: Vec<InventoryEntry> = server.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, e)| (e.item_id.clone(), i))
        .collect();

    for entry in local {
        match index.get(&entry.item_id) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.quantity = existing.quantity.max(entry.quantity);
                existing.discovered_at = existing.discovered_at.min(entry.discovered_at);
            }
            None => {
                index.insert(entry.item_id.clone(), merged.len());
                merged.push(entry.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_706_745_600_000;

    #[test]
    fn scalars_take_max() {
        let mut local = ProgressRecord::new(T);
        local.score = 300;
        local.level = 2;
        local.xp = 50;
        local.coins = 10;
        local.gems = 7;

        let mut server = ProgressRecord::new(T);
        server.score = 200;
        server.level = 4;
        server.xp = 80;
        server.coins = 25;
        server.gems = 1;

        let merged = merge_records(&local, &server);
        assert_eq!(merged.score, 300);
        assert_eq!(merged.level, 4);
        assert_eq!(merged.xp, 80);
        assert_eq!(merged.coins, 25);
        assert_eq!(merged.gems, 7);
    }

    #[test]
    fn sets_are_unioned() {
        let mut local = ProgressRecord::new(T);
        local.unlocked_areas = vec![5, 1];
        local.achievements = vec!["b".into(), "c".into()];

        let mut server = ProgressRecord::new(T);
        server.unlocked_areas = vec![3, 1];
        server.achievements = vec!["a".into(), "b".into()];

        let merged = merge_records(&local, &server);
        assert_eq!(merged.unlocked_areas, vec![1, 3, 5]);
        assert_eq!(
            merged.achievements,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn inventory_merges_per_item() {
        let mut local = ProgressRecord::new(T);
        local.inventory = vec![
            InventoryEntry::new("a", "Acorn", 1, 2, T),
            InventoryEntry::new("local-only", "Leaf", 1, 3, T + 10),
        ];

        let mut server = ProgressRecord::new(T);
        server.inventory = vec![
            InventoryEntry::new("server-only", "Stone", 2, 1, T - 100),
            InventoryEntry::new("a", "Acorn", 1, 1, T - 500),
        ];

        let merged = merge_records(&local, &server);
        assert_eq!(
            merged.inventory,
            vec![
                InventoryEntry::new("server-only", "Stone", 2, 1, T - 100),
                InventoryEntry::new("a", "Acorn", 1, 2, T - 500),
                InventoryEntry::new("local-only", "Leaf", 1, 3, T + 10),
            ]
        );
    }

    #[test]
    fn other_fields_come_from_server() {
        let mut local = ProgressRecord::new(T);
        local.last_modified = T + 9000;

        let mut server = ProgressRecord::new(T - 1000);
        server.last_modified = T + 2000;

        let merged = merge_records(&local, &server);
        assert_eq!(merged.created_at, T - 1000);
        assert_eq!(merged.last_modified, T + 2000);
    }

    #[test]
    fn merged_record_is_valid() {
        let mut local = ProgressRecord::new(T);
        local.inventory = vec![InventoryEntry::new("a", "Acorn", 1, 2, T)];
        local.unlocked_areas = vec![1, 2];
        let mut server = local.clone();
        server.unlocked_areas = vec![2, 3];

        assert!(merge_records(&local, &server).validate().is_ok());
    }

    mod property_tests {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        fn arb_entry() -> impl Strategy<Value = InventoryEntry> {
            (0u8..6, 1u32..50, 0u64..10_000).prop_map(|(id, quantity, discovered_at)| {
                InventoryEntry::new(format!("item-{id}"), "Item", 1, quantity, discovered_at)
            })
        }

        fn arb_record() -> impl Strategy<Value = ProgressRecord> {
            (
                (0u64..1000, 0u64..50, 0u64..5000, 0u64..5000, 0u64..500),
                vec(arb_entry(), 0..6),
                vec(0u32..20, 0..8),
                vec(0u8..10, 0..8),
            )
                .prop_map(|((score, level, xp, coins, gems), inventory, areas, achievements)| {
                    let mut record = ProgressRecord::new(0);
                    record.score = score;
                    record.level = level;
                    record.xp = xp;
                    record.coins = coins;
                    record.gems = gems;
                    record.inventory = inventory;
                    record.unlocked_areas = areas;
                    record.achievements = achievements
                        .into_iter()
                        .map(|a| format!("ach-{a}"))
                        .collect();
                    record.normalize();
                    record
                })
        }

        proptest! {
            #[test]
            fn prop_scalars_are_max(local in arb_record(), server in arb_record()) {
                let merged = merge_records(&local, &server);
                prop_assert_eq!(merged.score, local.score.max(server.score));
                prop_assert_eq!(merged.level, local.level.max(server.level));
                prop_assert_eq!(merged.xp, local.xp.max(server.xp));
                prop_assert_eq!(merged.coins, local.coins.max(server.coins));
                prop_assert_eq!(merged.gems, local.gems.max(server.gems));
            }

            #[test]
            fn prop_inventory_merge(local in arb_record(), server in arb_record()) {
                let merged = merge_records(&local, &server);
                prop_assert!(merged.validate().is_ok());

                for entry in &merged.inventory {
                    match (local.item(&entry.item_id), server.item(&entry.item_id)) {
                        (Some(l), Some(s)) => {
                            prop_assert_eq!(entry.quantity, l.quantity.max(s.quantity));
                            prop_assert_eq!(entry.discovered_at, l.discovered_at.min(s.discovered_at));
                        }
                        (Some(l), None) => prop_assert_eq!(entry, l),
                        (None, Some(s)) => prop_assert_eq!(entry, s),
                        (None, None) => prop_assert!(false, "invented item {}", entry.item_id),
                    }
                }
                for entry in local.inventory.iter().chain(&server.inventory) {
                    prop_assert!(merged.item(&entry.item_id).is_some());
                }
            }

            #[test]
            fn prop_set_union(local in arb_record(), server in arb_record()) {
                let merged = merge_records(&local, &server);

                let mut expected: Vec<u32> = local
                    .unlocked_areas
                    .iter()
                    .chain(&server.unlocked_areas)
                    .copied()
                    .collect();
                expected.sort_unstable();
                expected.dedup();
                prop_assert_eq!(&merged.unlocked_areas, &expected);

                let unique: HashSet<&String> = merged.achievements.iter().collect();
                prop_assert_eq!(unique.len(), merged.achievements.len());
                for a in local.achievements.iter().chain(&server.achievements) {
                    prop_assert!(merged.achievements.contains(a));
                }
            }
        }
    }
}
