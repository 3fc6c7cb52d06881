use rowfall_core::PlatformId;

const FUSE_EPSILON: f32 = 1e-4;

/// Items carried by a player and the fuses of the bombs they placed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inventory {
    has_bomb: bool,
    fuses: Vec<BombFuse>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BombFuse {
    platform: PlatformId,
    remaining: f32,
}

impl Inventory {
    /// Reports whether the player carries a bomb.
    #[must_use]
    pub const fn has_bomb(&self) -> bool {
        self.has_bomb
    }

    /// Platform and remaining priming time of every placed bomb still priming, oldest first.
    #[must_use]
    pub fn pending_fuses(&self) -> Vec<(PlatformId, f32)> {
        self.fuses
            .iter()
            .map(|fuse| (fuse.platform, fuse.remaining))
            .collect()
    }

    /// Picks up a bomb; returns `false` when the player already carries one.
    pub(crate) fn collect_bomb(&mut self) -> bool {
        if self.has_bomb {
            return false;
        }
        self.has_bomb = true;
        true
    }

    /// Hands over the carried bomb and starts its fuse.
    pub(crate) fn place_bomb(&mut self, platform: PlatformId, priming_time: f32) -> bool {
        if !self.has_bomb {
            return false;
        }
        self.has_bomb = false;
        self.fuses.push(BombFuse {
            platform,
            remaining: priming_time,
        });
        true
    }

    /// Advances every fuse, yielding the platforms whose bombs finished priming.
    pub(crate) fn tick(&mut self, dt: f32) -> Vec<PlatformId> {
        let mut expired = Vec::new();
        self.fuses.retain_mut(|fuse| {
            fuse.remaining -= dt;
            if fuse.remaining > FUSE_EPSILON {
                return true;
            }
            expired.push(fuse.platform);
            false
        });
        expired
    }

    pub(crate) fn drop_fuses(&mut self) {
        self.fuses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Inventory;
    use rowfall_core::PlatformId;

    #[test]
    fn only_one_bomb_can_be_carried() {
        let mut inventory = Inventory::default();
        assert!(inventory.collect_bomb());
        assert!(!inventory.collect_bomb());
        assert!(inventory.has_bomb());
    }

    #[test]
    fn placing_requires_a_bomb() {
        let mut inventory = Inventory::default();
        assert!(!inventory.place_bomb(PlatformId::new(1), 3.0));
        assert!(inventory.pending_fuses().is_empty());
    }

    #[test]
    fn fuse_expires_after_priming_time() {
        let mut inventory = Inventory::default();
        let _ = inventory.collect_bomb();
        assert!(inventory.place_bomb(PlatformId::new(4), 1.0));
        assert!(!inventory.has_bomb());

        assert!(inventory.tick(0.25).is_empty());
        assert!(inventory.tick(0.25).is_empty());
        assert!(inventory.tick(0.25).is_empty());
        assert_eq!(inventory.tick(0.25), vec![PlatformId::new(4)]);
        assert!(inventory.tick(0.25).is_empty());
    }

    #[test]
    fn dropped_fuse_never_fires() {
        let mut inventory = Inventory::default();
        let _ = inventory.collect_bomb();
        let _ = inventory.place_bomb(PlatformId::new(4), 0.5);
        inventory.drop_fuses();
        assert!(inventory.tick(1.0).is_empty());
    }

    #[test]
    fn overlapping_fuses_each_expire() {
        let mut inventory = Inventory::default();
        let _ = inventory.collect_bomb();
        assert!(inventory.place_bomb(PlatformId::new(4), 1.0));
        assert!(inventory.tick(0.5).is_empty());
        let _ = inventory.collect_bomb();
        assert!(inventory.place_bomb(PlatformId::new(9), 1.0));
        assert_eq!(inventory.pending_fuses().len(), 2);

        assert_eq!(inventory.tick(0.5), vec![PlatformId::new(4)]);
        assert_eq!(inventory.tick(0.5), vec![PlatformId::new(9)]);
        assert!(inventory.pending_fuses().is_empty());
    }
}
