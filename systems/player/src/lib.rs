#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-player movement state machine for Rowfall.
//!
//! A [`PlayerSimulation`] consumes queued move intents, snaps onto the
//! platforms of a read-only [`World`], applies the effect of the platform it
//! stands on and detects every way a player can die. Mutations the player
//! causes on the grid are emitted as [`Command`]s for the owning peer to apply
//! or forward; presentation hooks are emitted as [`PlayerCue`]s.

mod actions;
mod effects;
mod inventory;

use std::f32::consts::PI;

use rowfall_core::{
    Command, Event, ItemType, PlatformId, PlayerAction, PlayerId, SimulationContext,
    SwipeDirection, Vec2,
};
use rowfall_world::{query, World};

use crate::effects::{FallTracker, SlimeEscape};

pub use actions::PlayerActionQueue;
pub use inventory::Inventory;

/// Movement state of a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// Standing on a platform, ready to accept the next move.
    NotMoving,
    /// Travelling toward the move point.
    Moving,
    /// Held by slime until the escape moves are made.
    StuckInSlime,
    /// Terminal state.
    Died,
}

/// Reason a player reached the terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// Dropped below the bottom of the world.
    FellOffWorld,
    /// The row under the player was recycled.
    RowDestroyed,
    /// Landed on spikes.
    Spikes,
    /// Fell further than a landing can absorb.
    Fall,
    /// Stood next to a live bomb.
    Bomb,
    /// Removed by the session, for example after leaving the room.
    Eliminated,
}

/// Presentation hooks raised by a player simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCue {
    /// The player arrived on a platform.
    Landed {
        /// Platform landed on, if any was in range.
        platform: Option<PlatformId>,
        /// Step sound of the platform; empty when landing in the void.
        sound_key: &'static str,
    },
    /// The player attempted to pull free from slime.
    SlimeStruggle,
    /// The player picked up a bomb.
    BombCollected {
        /// Platform the bomb was taken from.
        platform: PlatformId,
    },
    /// The player placed a bomb.
    BombPlaced {
        /// Platform the bomb was placed on.
        platform: PlatformId,
    },
    /// A live bomb next to the player went off.
    BombExploded {
        /// Platform that carried the bomb.
        platform: PlatformId,
    },
    /// The player died. Raised exactly once.
    Died {
        /// What killed the player.
        cause: DeathCause,
    },
}

/// Movement controller of a single participant.
#[derive(Clone, Debug)]
pub struct PlayerSimulation {
    id: PlayerId,
    context: SimulationContext,
    position: Vec2,
    move_point: Vec2,
    state: PlayerState,
    last_action: PlayerAction,
    actions: PlayerActionQueue,
    fall: FallTracker,
    slime: SlimeEscape,
    inventory: Inventory,
    current_platform: Option<PlatformId>,
    death: Option<DeathCause>,
}

impl PlayerSimulation {
    /// Creates a stationary player at `spawn`.
    #[must_use]
    pub fn new(id: PlayerId, spawn: Vec2, context: &SimulationContext) -> Self {
        Self {
            id,
            context: context.clone(),
            position: spawn,
            move_point: spawn,
            state: PlayerState::NotMoving,
            last_action: PlayerAction::None,
            actions: PlayerActionQueue::default(),
            fall: FallTracker::default(),
            slime: SlimeEscape::default(),
            inventory: Inventory::default(),
            current_platform: None,
            death: None,
        }
    }

    /// Identifier of the player.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Current position in world units.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Point the player is travelling toward.
    #[must_use]
    pub const fn move_point(&self) -> Vec2 {
        self.move_point
    }

    /// Current movement state.
    #[must_use]
    pub const fn state(&self) -> PlayerState {
        self.state
    }

    /// Reports whether the player reached the terminal state.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Died
    }

    /// What killed the player, once dead.
    #[must_use]
    pub const fn death_cause(&self) -> Option<DeathCause> {
        self.death
    }

    /// Last move started, cleared by slime and glass once consumed.
    #[must_use]
    pub const fn last_action(&self) -> PlayerAction {
        self.last_action
    }

    /// Distance fallen since the last evaluated landing.
    #[must_use]
    pub fn fall_distance(&self) -> f32 {
        self.fall.distance()
    }

    /// Platform the player last stood on.
    #[must_use]
    pub const fn current_platform(&self) -> Option<PlatformId> {
        self.current_platform
    }

    /// Items carried by the player.
    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Pending move intents.
    #[must_use]
    pub const fn actions(&self) -> &PlayerActionQueue {
        &self.actions
    }

    /// Queues a move intent from player input.
    pub fn push_action(&mut self, action: PlayerAction) {
        if self.is_dead() {
            return;
        }
        self.actions.push(action);
    }

    /// Queues the move matching a classified swipe.
    pub fn swipe(&mut self, direction: SwipeDirection) {
        self.push_action(direction.into());
    }

    /// Places the carried bomb on the platform under the player.
    ///
    /// Returns `false` when the player is dead, carries no bomb or stands on nothing.
    pub fn place_bomb(
        &mut self,
        world: &World,
        out: &mut Vec<Command>,
        cues: &mut Vec<PlayerCue>,
    ) -> bool {
        if self.is_dead() || !self.inventory.has_bomb() {
            return false;
        }
        let Some(platform) = self.platform_under(world, self.position) else {
            return false;
        };
        let priming_time = self.context.config().bomb_priming_time;
        if !self.inventory.place_bomb(platform.id, priming_time) {
            return false;
        }
        out.push(Command::PrimeBomb {
            platform: platform.id,
            owner: self.id,
        });
        cues.push(PlayerCue::BombPlaced {
            platform: platform.id,
        });
        true
    }

    /// Ends the player's round; does nothing when already dead.
    pub fn kill(&mut self, cause: DeathCause, cues: &mut Vec<PlayerCue>) {
        self.die(cause, cues);
    }

    /// Advances the player by one tick.
    ///
    /// `events` are the world events produced by the same tick. Phases run in
    /// a fixed order: death checks, arrival, snap and dispatch, integration,
    /// re-snap.
    pub fn simulate(
        &mut self,
        dt: f32,
        world: &World,
        events: &[Event],
        out: &mut Vec<Command>,
        cues: &mut Vec<PlayerCue>,
    ) {
        if self.is_dead() {
            return;
        }

        self.check_deaths(world, events, out, cues);
        if self.is_dead() {
            return;
        }
        for platform in self.inventory.tick(dt) {
            out.push(Command::ArmBomb { platform });
        }

        let tolerance = self.context.config().player_check_tolerance;
        if self.state == PlayerState::Moving && self.position.distance(self.move_point) < tolerance {
            self.state = PlayerState::NotMoving;
            let landed = self.platform_under(world, self.move_point);
            let sound_key = landed.map_or("", |platform| {
                self.context.platform_table().sound_key(platform.kind)
            });
            cues.push(PlayerCue::Landed {
                platform: landed.map(|platform| platform.id),
                sound_key,
            });
        }

        if matches!(
            self.state,
            PlayerState::NotMoving | PlayerState::StuckInSlime
        ) {
            self.snap_and_dispatch(world, out, cues);
            if self.is_dead() {
                return;
            }
            self.take_next_action();
        }

        self.integrate(dt);
        self.resnap(world);
    }

    fn check_deaths(
        &mut self,
        world: &World,
        events: &[Event],
        out: &mut Vec<Command>,
        cues: &mut Vec<PlayerCue>,
    ) {
        let tolerance = self.context.config().player_check_tolerance;
        if self.position.y < self.context.bottom_border() + tolerance {
            self.die(DeathCause::FellOffWorld, cues);
            return;
        }

        let band = self.context.row_destroyed_band();
        let width = self.context.width();
        let standing_row = match self.state {
            PlayerState::Moving => None,
            _ => self.current_platform.map(|platform| platform.row(width)),
        };
        let destroyed_under_player = events.iter().any(|event| match event {
            Event::PlatformRowDestroyed { row, y } => {
                Some(*row) == standing_row || (self.position.y - y).abs() < band
            }
            _ => false,
        });
        if destroyed_under_player {
            self.die(DeathCause::RowDestroyed, cues);
            return;
        }

        if let Some(platform) = self.adjacent_live_bomb(world) {
            out.push(Command::DetonateBomb { platform });
            cues.push(PlayerCue::BombExploded { platform });
            self.die(DeathCause::Bomb, cues);
        }
    }

    fn adjacent_live_bomb(&self, world: &World) -> Option<PlatformId> {
        let centre = self.position - self.context.config().player_platform_offset;
        let range = self.context.snap_range();
        [
            PlayerAction::MoveUp,
            PlayerAction::MoveDown,
            PlayerAction::MoveLeft,
            PlayerAction::MoveRight,
        ]
        .into_iter()
        .filter_map(|direction| {
            query::platform_within_range(world, centre + self.context.move_delta(direction), range)
        })
        .find(|platform| platform.item == ItemType::BombActive)
        .map(|platform| platform.id)
    }

    fn snap_and_dispatch(
        &mut self,
        world: &World,
        out: &mut Vec<Command>,
        cues: &mut Vec<PlayerCue>,
    ) {
        let Some(platform) = self.platform_under(world, self.position) else {
            self.current_platform = None;
            self.actions.push_front(PlayerAction::MoveDown);
            return;
        };

        self.current_platform = Some(platform.id);
        if platform.item == ItemType::BombCollectible && self.inventory.collect_bomb() {
            out.push(Command::SetItemType {
                platform: platform.id,
                item: ItemType::None,
            });
            cues.push(PlayerCue::BombCollected {
                platform: platform.id,
            });
        }
        effects::dispatch(self, &platform, out, cues);
    }

    fn take_next_action(&mut self) {
        let Some(action) = self.actions.pop() else {
            return;
        };
        if self.state == PlayerState::StuckInSlime {
            self.last_action = action;
            return;
        }
        if action.is_move() {
            self.begin_move(action);
        }
    }

    fn begin_move(&mut self, action: PlayerAction) {
        let delta = self.context.move_delta(action);
        self.move_point += delta;
        self.state = PlayerState::Moving;
        self.last_action = action;
        if action == PlayerAction::MoveDown {
            self.fall.accumulate(delta.y);
        } else {
            self.fall.reset();
        }
    }

    fn integrate(&mut self, dt: f32) {
        let config = self.context.config();
        let step = config.player_speed * dt;
        let remaining = self.move_point - self.position;
        let distance = remaining.length();
        self.position = if distance <= step || distance == 0.0 {
            self.move_point
        } else {
            self.position + remaining / distance * step
        };

        let horizontal_left = self.move_point.x - self.position.x;
        if horizontal_left != 0.0 {
            let fraction = (horizontal_left / config.column_spacing).abs();
            self.position.y += (PI * fraction).sin() * config.jump_height * dt;
        }
    }

    fn resnap(&mut self, world: &World) {
        if let Some(platform) = self.platform_under(world, self.move_point) {
            self.move_point = platform.position + self.context.config().player_platform_offset;
        }
    }

    fn platform_under(&self, world: &World, point: Vec2) -> Option<query::PlatformView> {
        let centre = point - self.context.config().player_platform_offset;
        query::platform_within_range(world, centre, self.context.snap_range())
    }

    fn die(&mut self, cause: DeathCause, cues: &mut Vec<PlayerCue>) {
        if self.is_dead() {
            return;
        }
        self.state = PlayerState::Died;
        self.death = Some(cause);
        self.actions.clear();
        self.inventory.drop_fuses();
        cues.push(PlayerCue::Died { cause });
        log::info!("player {} died: {cause:?}", self.id.get());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowfall_core::SimulationConfig;

    fn player() -> PlayerSimulation {
        let context = SimulationContext::new(SimulationConfig::default()).expect("valid");
        PlayerSimulation::new(PlayerId::new(1), Vec2::new(0.0, 0.85), &context)
    }

    #[test]
    fn downward_moves_accumulate_fall_distance() {
        let mut player = player();
        player.begin_move(PlayerAction::MoveDown);
        player.begin_move(PlayerAction::MoveDown);
        assert_eq!(player.fall_distance(), 2.0);
        assert!(player.move_point().distance(Vec2::new(0.0, -1.15)) < 1e-5);
    }

    #[test]
    fn non_down_move_resets_fall_before_accumulating_again() {
        let mut player = player();
        player.begin_move(PlayerAction::MoveDown);
        player.begin_move(PlayerAction::MoveRight);
        assert_eq!(player.fall_distance(), 0.0);
        player.begin_move(PlayerAction::MoveDown);
        assert_eq!(player.fall_distance(), 1.0);
        assert_eq!(player.state(), PlayerState::Moving);
    }

    #[test]
    fn stuck_players_record_attempts_instead_of_moving() {
        let mut player = player();
        player.state = PlayerState::StuckInSlime;
        player.push_action(PlayerAction::MoveUp);
        player.take_next_action();
        assert_eq!(player.state(), PlayerState::StuckInSlime);
        assert_eq!(player.last_action(), PlayerAction::MoveUp);
        assert_eq!(player.move_point(), Vec2::new(0.0, 0.85));
    }
}
