//! Behaviour triggered by the platform a stationary player stands on.

use rowfall_core::{Command, PlatformType, PlayerAction};
use rowfall_world::query::PlatformView;

use crate::{DeathCause, PlayerCue, PlayerSimulation, PlayerState};

/// Running total of consecutive downward movement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct FallTracker {
    distance: f32,
}

impl FallTracker {
    pub(crate) fn accumulate(&mut self, distance: f32) {
        self.distance += distance.abs();
    }

    pub(crate) fn reset(&mut self) {
        self.distance = 0.0;
    }

    pub(crate) const fn distance(&self) -> f32 {
        self.distance
    }

    /// Reports whether the fall exceeded `threshold`, then forgets it.
    pub(crate) fn evaluate(&mut self, threshold: f32) -> bool {
        let fatal = self.distance > threshold;
        self.reset();
        fatal
    }
}

/// Escape attempts of a player stuck in slime.
///
/// The same move has to be attempted three times in a row; any other move
/// restarts the count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SlimeEscape {
    attempt: PlayerAction,
    count: u8,
}

const ESCAPE_ATTEMPTS: u8 = 3;

impl Default for SlimeEscape {
    fn default() -> Self {
        Self {
            attempt: PlayerAction::None,
            count: 0,
        }
    }
}

impl SlimeEscape {
    /// Records an attempt, returning the winning move once the player breaks free.
    pub(crate) fn register(&mut self, action: PlayerAction) -> Option<PlayerAction> {
        if !action.is_move() {
            return None;
        }
        if action == self.attempt {
            self.count = self.count.saturating_add(1);
        } else {
            self.attempt = action;
            self.count = 1;
        }
        if self.count < ESCAPE_ATTEMPTS {
            return None;
        }
        *self = Self::default();
        Some(action)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Runs the effect of `platform` on a player that is not moving.
pub(crate) fn dispatch(
    player: &mut PlayerSimulation,
    platform: &PlatformView,
    out: &mut Vec<Command>,
    cues: &mut Vec<PlayerCue>,
) {
    if platform.kind != PlatformType::Slime && player.state == PlayerState::StuckInSlime {
        player.state = PlayerState::NotMoving;
        player.slime.reset();
    }

    match platform.kind {
        PlatformType::None => player.actions.push_front(PlayerAction::MoveDown),
        PlatformType::Normal => check_fall(player, cues),
        PlatformType::Grass => player.fall.reset(),
        PlatformType::Spikes => player.die(DeathCause::Spikes, cues),
        PlatformType::SlideLeft => slide(player, PlayerAction::MoveLeft, cues),
        PlatformType::SlideRight => slide(player, PlayerAction::MoveRight, cues),
        PlatformType::Slime => stick(player, cues),
        PlatformType::Glass => shatter(player, platform, out),
    }
}

fn check_fall(player: &mut PlayerSimulation, cues: &mut Vec<PlayerCue>) {
    let threshold = player.context.fall_death_distance();
    if player.fall.evaluate(threshold) {
        player.die(DeathCause::Fall, cues);
    }
}

fn slide(player: &mut PlayerSimulation, direction: PlayerAction, cues: &mut Vec<PlayerCue>) {
    check_fall(player, cues);
    if player.state != PlayerState::Died {
        player.actions.push_front(direction);
    }
}

fn stick(player: &mut PlayerSimulation, cues: &mut Vec<PlayerCue>) {
    check_fall(player, cues);
    if player.state == PlayerState::Died {
        return;
    }

    if player.state != PlayerState::StuckInSlime {
        player.state = PlayerState::StuckInSlime;
        player.last_action = PlayerAction::None;
        player.slime.reset();
        return;
    }

    if player.last_action.is_move() {
        cues.push(PlayerCue::SlimeStruggle);
        if let Some(winner) = player.slime.register(player.last_action) {
            player.state = PlayerState::NotMoving;
            player.actions.push_front(winner);
            log::debug!("player {} escaped slime", player.id.get());
        }
    }
    player.last_action = PlayerAction::None;
}

fn shatter(player: &mut PlayerSimulation, platform: &PlatformView, out: &mut Vec<Command>) {
    if player.last_action == PlayerAction::MoveDown {
        out.push(Command::BreakGlass {
            platform: platform.id,
        });
        player.last_action = PlayerAction::None;
    }
}

#[cfg(test)]
mod tests {
    use super::{FallTracker, SlimeEscape};
    use rowfall_core::PlayerAction;

    #[test]
    fn fall_exactly_at_threshold_is_survived() {
        let mut fall = FallTracker::default();
        fall.accumulate(1.0);
        fall.accumulate(0.5);
        assert!(!fall.evaluate(1.5));
        assert_eq!(fall.distance(), 0.0);
    }

    #[test]
    fn fall_beyond_threshold_is_fatal() {
        let mut fall = FallTracker::default();
        fall.accumulate(1.5);
        fall.accumulate(0.001);
        assert!(fall.evaluate(1.5));
    }

    #[test]
    fn upward_distance_counts_as_magnitude() {
        let mut fall = FallTracker::default();
        fall.accumulate(-1.0);
        assert_eq!(fall.distance(), 1.0);
    }

    #[test]
    fn three_matching_moves_escape() {
        let mut slime = SlimeEscape::default();
        assert_eq!(slime.register(PlayerAction::MoveLeft), None);
        assert_eq!(slime.register(PlayerAction::MoveLeft), None);
        assert_eq!(
            slime.register(PlayerAction::MoveLeft),
            Some(PlayerAction::MoveLeft)
        );
        assert_eq!(slime, SlimeEscape::default());
    }

    #[test]
    fn changing_direction_restarts_the_count() {
        let mut slime = SlimeEscape::default();
        assert_eq!(slime.register(PlayerAction::MoveLeft), None);
        assert_eq!(slime.register(PlayerAction::MoveRight), None);
        assert_eq!(slime.register(PlayerAction::MoveLeft), None);
        assert_eq!(slime.register(PlayerAction::MoveLeft), None);
        assert_eq!(
            slime.register(PlayerAction::MoveLeft),
            Some(PlayerAction::MoveLeft)
        );
    }

    #[test]
    fn empty_actions_do_not_count() {
        let mut slime = SlimeEscape::default();
        assert_eq!(slime.register(PlayerAction::MoveUp), None);
        assert_eq!(slime.register(PlayerAction::None), None);
        assert_eq!(slime.register(PlayerAction::MoveUp), None);
        assert_eq!(
            slime.register(PlayerAction::MoveUp),
            Some(PlayerAction::MoveUp)
        );
    }
}
