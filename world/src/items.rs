use std::collections::BTreeMap;

use rowfall_core::{ItemType, PlatformId, PlayerId};

/// Sparse map from platform to the item resting on it.
///
/// Cells without an entry carry [`ItemType::None`].
#[derive(Clone, Debug, Default)]
pub(crate) struct ItemStore {
    items: BTreeMap<PlatformId, StoredItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StoredItem {
    item: ItemType,
    owner: Option<PlayerId>,
}

impl ItemStore {
    pub(crate) fn get(&self, platform: PlatformId) -> ItemType {
        self.items
            .get(&platform)
            .map_or(ItemType::None, |stored| stored.item)
    }

    pub(crate) fn owner(&self, platform: PlatformId) -> Option<PlayerId> {
        self.items.get(&platform).and_then(|stored| stored.owner)
    }

    /// Places `item` on the platform, returning whether the visible item changed.
    pub(crate) fn set(
        &mut self,
        platform: PlatformId,
        item: ItemType,
        owner: Option<PlayerId>,
    ) -> bool {
        let previous = self.get(platform);
        if item == ItemType::None {
            let _ = self.items.remove(&platform);
        } else {
            let _ = self.items.insert(platform, StoredItem { item, owner });
        }
        previous != item
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    /// Platforms carrying a priming bomb placed by `owner`, in id order.
    pub(crate) fn primed_by(&self, owner: PlayerId) -> Vec<PlatformId> {
        self.items
            .iter()
            .filter(|(_, stored)| {
                stored.item == ItemType::BombPriming && stored.owner == Some(owner)
            })
            .map(|(platform, _)| *platform)
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PlatformId, ItemType)> + '_ {
        self.items
            .iter()
            .map(|(platform, stored)| (*platform, stored.item))
    }
}

#[cfg(test)]
mod tests {
    use super::ItemStore;
    use rowfall_core::{ItemType, PlatformId, PlayerId};

    #[test]
    fn missing_entries_read_as_empty() {
        let store = ItemStore::default();
        assert_eq!(store.get(PlatformId::new(3)), ItemType::None);
        assert_eq!(store.owner(PlatformId::new(3)), None);
    }

    #[test]
    fn setting_the_same_item_reports_no_change() {
        let mut store = ItemStore::default();
        let platform = PlatformId::new(4);
        assert!(store.set(platform, ItemType::BombCollectible, None));
        assert!(!store.set(platform, ItemType::BombCollectible, None));
        assert!(store.set(platform, ItemType::None, None));
        assert_eq!(store.iter().count(), 0);
    }

    #[test]
    fn primed_bombs_are_tracked_per_owner() {
        let mut store = ItemStore::default();
        let first = PlayerId::new(1);
        let second = PlayerId::new(2);
        let _ = store.set(PlatformId::new(2), ItemType::BombPriming, Some(first));
        let _ = store.set(PlatformId::new(9), ItemType::BombPriming, Some(second));
        let _ = store.set(PlatformId::new(1), ItemType::BombActive, Some(first));

        assert_eq!(store.primed_by(first), vec![PlatformId::new(2)]);
        assert_eq!(store.primed_by(second), vec![PlatformId::new(9)]);
        assert_eq!(store.owner(PlatformId::new(1)), Some(first));
    }
}
