use std::collections::VecDeque;

use rowfall_core::PlayerAction;

/// Ordered queue of move intents awaiting execution.
///
/// Player input is appended to the back; actions injected by platforms are
/// pushed to the front so they run before anything the player asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerActionQueue {
    actions: VecDeque<PlayerAction>,
}

impl PlayerActionQueue {
    /// Appends an action behind every queued one.
    pub fn push(&mut self, action: PlayerAction) {
        self.actions.push_back(action);
    }

    /// Places an action ahead of every queued one.
    pub fn push_front(&mut self, action: PlayerAction) {
        self.actions.push_front(action);
    }

    /// Removes the next action, if any.
    pub fn pop(&mut self) -> Option<PlayerAction> {
        self.actions.pop_front()
    }

    /// Next action without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<PlayerAction> {
        self.actions.front().copied()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Reports whether the queue holds no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Drops every queued action.
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::PlayerActionQueue;
    use rowfall_core::PlayerAction;

    #[test]
    fn injected_actions_run_before_player_input() {
        let mut queue = PlayerActionQueue::default();
        queue.push(PlayerAction::MoveUp);
        queue.push(PlayerAction::MoveLeft);
        queue.push_front(PlayerAction::MoveDown);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(PlayerAction::MoveDown));
        assert_eq!(queue.pop(), Some(PlayerAction::MoveUp));
        assert_eq!(queue.pop(), Some(PlayerAction::MoveLeft));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }
}
