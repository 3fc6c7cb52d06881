use std::collections::BTreeMap;

use rowfall_core::PlayerId;

/// Participants of a round and whether they are still alive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LivenessLedger {
    players: BTreeMap<PlayerId, bool>,
}

impl LivenessLedger {
    /// Records a participant as alive unless it is already known.
    ///
    /// Returns `true` when the participant was not known before.
    pub fn register(&mut self, player: PlayerId) -> bool {
        if self.players.contains_key(&player) {
            return false;
        }
        let _ = self.players.insert(player, true);
        true
    }

    /// Records a death; returns `false` when the participant was already dead.
    pub fn mark_dead(&mut self, player: PlayerId) -> bool {
        let alive = self.players.entry(player).or_insert(true);
        let transitioned = *alive;
        *alive = false;
        transitioned
    }

    /// Reports whether the participant is recorded as dead.
    #[must_use]
    pub fn is_dead(&self, player: PlayerId) -> bool {
        self.players.get(&player) == Some(&false)
    }

    /// Participants still alive, in id order.
    #[must_use]
    pub fn alive(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|(_, alive)| **alive)
            .map(|(player, _)| *player)
            .collect()
    }

    /// Number of known participants, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Reports whether no participant is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::LivenessLedger;
    use rowfall_core::PlayerId;

    #[test]
    fn deaths_are_recorded_once() {
        let mut ledger = LivenessLedger::default();
        let player = PlayerId::new(4);
        assert!(ledger.register(player));
        assert!(!ledger.register(player));

        assert!(ledger.mark_dead(player));
        assert!(!ledger.mark_dead(player));
        assert!(ledger.is_dead(player));
        assert!(!ledger.register(player));
        assert!(ledger.is_dead(player));
    }

    #[test]
    fn unknown_players_can_be_marked_dead() {
        let mut ledger = LivenessLedger::default();
        assert!(ledger.mark_dead(PlayerId::new(9)));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.alive().is_empty());
    }

    #[test]
    fn alive_lists_survivors_in_order() {
        let mut ledger = LivenessLedger::default();
        for id in [3, 1, 2] {
            let _ = ledger.register(PlayerId::new(id));
        }
        let _ = ledger.mark_dead(PlayerId::new(2));
        assert_eq!(ledger.alive(), vec![PlayerId::new(1), PlayerId::new(3)]);
    }
}
