//! Progress record types.

use crate::{error::Result, Error, ItemId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One stack of items in a player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Unique key within one record's inventory
    pub item_id: ItemId,
    /// Display name
    pub name: String,
    /// Item tier (merge level)
    pub tier: u32,
    /// Stack size, always at least 1
    pub quantity: u32,
    /// When the player first obtained this item (milliseconds since epoch)
    pub discovered_at: Timestamp,
}

impl InventoryEntry {
    /// Create a new inventory entry.
    pub fn new(
        item_id: impl Into<ItemId>,
        name: impl Into<String>,
        tier: u32,
        quantity: u32,
        discovered_at: Timestamp,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            tier,
            quantity,
            discovered_at,
        }
    }
}

/// The synchronized player-progress document.
///
/// There is one record per user. `last_modified` is stamped by whichever
/// party writes the record and is the only signal used for recency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub level: u64,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub gems: u64,
    /// Last write time (milliseconds since epoch)
    pub last_modified: Timestamp,
    /// Set once when the record is first created
    pub created_at: Timestamp,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
    /// Append-only set of area ids
    #[serde(default)]
    pub unlocked_areas: Vec<u32>,
    /// Append-only set of achievement ids
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl ProgressRecord {
    /// Create an empty record created (and last modified) at `created_at`.
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            created_at,
            last_modified: created_at,
            ..Self::default()
        }
    }

    /// Look up an inventory entry by item id.
    pub fn item(&self, item_id: &str) -> Option<&InventoryEntry> {
        self.inventory.iter().find(|e| e.item_id == item_id)
    }

    /// Apply a partial update and stamp `last_modified`.
    ///
    /// Provided fields overwrite the current ones; collections are replaced
    /// wholesale. The result is normalized so a sloppy payload cannot break
    /// the record invariants.
    pub fn apply_update(&mut self, update: &ProgressUpdate, now: Timestamp) {
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(score) = update.score {
            self.score = score;
        }
        if let Some(xp) = update.xp {
            self.xp = xp;
        }
        if let Some(coins) = update.coins {
            self.coins = coins;
        }
        if let Some(gems) = update.gems {
            self.gems = gems;
        }
        if let Some(inventory) = &update.inventory {
            self.inventory = inventory.clone();
        }
        if let Some(areas) = &update.unlocked_areas {
            self.unlocked_areas = areas.clone();
        }
        if let Some(achievements) = &update.achievements {
            self.achievements = achievements.clone();
        }
        self.last_modified = now;
        self.normalize();
    }

    /// Restore the record invariants in place.
    ///
    /// Zero-quantity entries are removed, duplicate item ids keep their first
    /// occurrence, and the area and achievement sets are deduplicated in
    /// first-seen order.
    pub fn normalize(&mut self) {
        let mut seen_items = HashSet::new();
        self.inventory
            .retain(|e| e.quantity > 0 && seen_items.insert(e.item_id.clone()));

        let mut seen_areas = HashSet::new();
        self.unlocked_areas.retain(|a| seen_areas.insert(*a));

        let mut seen_achievements = HashSet::new();
        self.achievements
            .retain(|a| seen_achievements.insert(a.clone()));
    }

    /// Check the record invariants, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let mut seen_items = HashSet::new();
        for entry in &self.inventory {
            if entry.quantity == 0 {
                return Err(Error::ZeroQuantity(entry.item_id.clone()));
            }
            if !seen_items.insert(entry.item_id.as_str()) {
                return Err(Error::DuplicateItem(entry.item_id.clone()));
            }
        }

        let mut seen_areas = HashSet::new();
        for area in &self.unlocked_areas {
            if !seen_areas.insert(*area) {
                return Err(Error::DuplicateArea(*area));
            }
        }

        let mut seen_achievements = HashSet::new();
        for achievement in &self.achievements {
            if !seen_achievements.insert(achievement.as_str()) {
                return Err(Error::DuplicateAchievement(achievement.clone()));
            }
        }

        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidRecord(e.to_string()))
    }

    /// Deserialize from JSON and normalize.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut record: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidRecord(e.to_string()))?;
        record.normalize();
        Ok(record)
    }
}

/// A partial update to a [`ProgressRecord`].
///
/// Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gems: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<InventoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_areas: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievements: Option<Vec<String>>,
}

impl ProgressUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: u64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_score(mut self, score: u64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_xp(mut self, xp: u64) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn with_coins(mut self, coins: u64) -> Self {
        self.coins = Some(coins);
        self
    }

    pub fn with_gems(mut self, gems: u64) -> Self {
        self.gems = Some(gems);
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<InventoryEntry>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_unlocked_areas(mut self, areas: Vec<u32>) -> Self {
        self.unlocked_areas = Some(areas);
        self
    }

    pub fn with_achievements(mut self, achievements: Vec<String>) -> Self {
        self.achievements = Some(achievements);
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
