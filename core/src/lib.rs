#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rowfall simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Peers exchange [`ReplicationMessage`] values so
//! that every participant mirrors the host's canonical grid.

mod config;
pub mod random;

pub use config::{
    ConfigError, ItemChance, PlatformTypeEntry, PlatformTypeTable, PlatformWeights,
    SimulationConfig, SimulationContext,
};
pub use glam::Vec2;

use serde::{Deserialize, Serialize};

/// Stable identifier of a single grid cell.
///
/// Identifiers are assigned row-major over `[0, width * height)` when the
/// world is created and survive row recycling, so deltas can address a cell
/// without resending its row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatformId(u32);

impl PlatformId {
    /// Creates a new platform identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Builds the identifier of the cell at `column` within row slot `row`.
    #[must_use]
    pub const fn from_cell(row: u32, column: u32, width: u32) -> Self {
        Self(row * width + column)
    }

    /// Row slot that owns the cell, given the grid width.
    #[must_use]
    pub const fn row(&self, width: u32) -> u32 {
        self.0 / width
    }

    /// Column of the cell within its row, given the grid width.
    #[must_use]
    pub const fn column(&self, width: u32) -> u32 {
        self.0 % width
    }
}

/// Unique identifier assigned to a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Surface carried by a single platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    /// Empty cell; anyone standing here falls through.
    None,
    /// Plain ground.
    Normal,
    /// Kills on contact.
    Spikes,
    /// Holds the player until they repeat the same move three times.
    Slime,
    /// Pushes the player one column to the left.
    SlideLeft,
    /// Pushes the player one column to the right.
    SlideRight,
    /// Soft ground that absorbs any fall.
    Grass,
    /// Breaks when dropped onto, regenerating after a delay.
    Glass,
}

impl PlatformType {
    /// Every platform type in declaration order.
    pub const ALL: [PlatformType; 8] = [
        PlatformType::None,
        PlatformType::Normal,
        PlatformType::Spikes,
        PlatformType::Slime,
        PlatformType::SlideLeft,
        PlatformType::SlideRight,
        PlatformType::Grass,
        PlatformType::Glass,
    ];

    /// Position of the type within [`PlatformType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Normal => 1,
            Self::Spikes => 2,
            Self::Slime => 3,
            Self::SlideLeft => 4,
            Self::SlideRight => 5,
            Self::Grass => 6,
            Self::Glass => 7,
        }
    }

    /// Reports whether a player can stand on the platform.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Item resting on a platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Nothing on the cell.
    None,
    /// A bomb that can be picked up.
    BombCollectible,
    /// A placed bomb counting down to activation.
    BombPriming,
    /// A live bomb that detonates when a player is adjacent.
    BombActive,
}

/// Discrete move intent consumed by a player simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerAction {
    /// No intent.
    None,
    /// Jump one row up.
    MoveUp,
    /// Drop one row down.
    MoveDown,
    /// Jump one column left.
    MoveLeft,
    /// Jump one column right.
    MoveRight,
}

impl PlayerAction {
    /// Reports whether the action moves the player.
    #[must_use]
    pub const fn is_move(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Unit grid direction of the action; scale by spacing to obtain a world delta.
    #[must_use]
    pub const fn direction(self) -> Vec2 {
        match self {
            Self::None => Vec2::ZERO,
            Self::MoveUp => Vec2::Y,
            Self::MoveDown => Vec2::NEG_Y,
            Self::MoveLeft => Vec2::NEG_X,
            Self::MoveRight => Vec2::X,
        }
    }
}

/// Direction classified by the input collaborator from a swipe gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwipeDirection {
    /// Upward swipe.
    Up,
    /// Downward swipe.
    Down,
    /// Leftward swipe.
    Left,
    /// Rightward swipe.
    Right,
}

impl From<SwipeDirection> for PlayerAction {
    fn from(direction: SwipeDirection) -> Self {
        match direction {
            SwipeDirection::Up => Self::MoveUp,
            SwipeDirection::Down => Self::MoveDown,
            SwipeDirection::Left => Self::MoveLeft,
            SwipeDirection::Right => Self::MoveRight,
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Scrolls every row down and advances platform timers.
    Advance {
        /// Seconds of simulated time that elapsed since the previous tick.
        dt: f32,
    },
    /// Overwrites the type of a platform.
    SetPlatformType {
        /// Cell to mutate.
        platform: PlatformId,
        /// Type to assign.
        kind: PlatformType,
    },
    /// Overwrites the item resting on a platform.
    SetItemType {
        /// Cell to mutate.
        platform: PlatformId,
        /// Item to assign.
        item: ItemType,
    },
    /// Breaks a glass platform and arms its regeneration timer.
    BreakGlass {
        /// Cell that was dropped onto.
        platform: PlatformId,
    },
    /// Places a priming bomb owned by `owner` on a platform.
    PrimeBomb {
        /// Cell that receives the bomb.
        platform: PlatformId,
        /// Player that placed the bomb.
        owner: PlayerId,
    },
    /// Turns a priming bomb into a live one.
    ArmBomb {
        /// Cell carrying the priming bomb.
        platform: PlatformId,
    },
    /// Removes a live bomb after it went off.
    DetonateBomb {
        /// Cell carrying the live bomb.
        platform: PlatformId,
    },
    /// Clears every priming bomb placed by a player that left the round.
    DisarmBombs {
        /// Player whose bombs are cleared.
        owner: PlayerId,
    },
    /// Replaces the whole grid with a replicated snapshot.
    RestoreSnapshot {
        /// Canonical grid state received from the host.
        snapshot: WorldSnapshot,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Seconds of simulated time that elapsed in the tick.
        dt: f32,
    },
    /// A row crossed the bottom border; anyone standing on it lost their footing.
    PlatformRowDestroyed {
        /// Row slot that crossed the border.
        row: u32,
        /// Vertical position of the row before it was recycled.
        y: f32,
    },
    /// A row was repositioned at the top border and regenerated.
    RowRecycled {
        /// Row slot that was recycled.
        row: u32,
        /// Vertical position assigned to the row.
        y: f32,
    },
    /// A platform changed type.
    PlatformTypeChanged {
        /// Cell that changed.
        platform: PlatformId,
        /// Type now carried by the cell.
        kind: PlatformType,
    },
    /// The item resting on a platform changed.
    ItemChanged {
        /// Cell that changed.
        platform: PlatformId,
        /// Item now carried by the cell.
        item: ItemType,
    },
    /// A glass platform broke.
    GlassBroken {
        /// Cell that broke.
        platform: PlatformId,
    },
    /// A broken glass platform regenerated.
    GlassRestored {
        /// Cell that regenerated.
        platform: PlatformId,
    },
    /// A bomb went off.
    BombExploded {
        /// Cell that carried the bomb.
        platform: PlatformId,
    },
    /// The grid was replaced by a replicated snapshot.
    SnapshotRestored,
}

/// Full grid state sent to joining peers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of platforms per row.
    pub width: u32,
    /// Row slots in id order.
    pub rows: Vec<RowSnapshot>,
    /// Non-empty items keyed by platform.
    pub items: Vec<(PlatformId, ItemType)>,
}

/// State of a single row inside a [`WorldSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowSnapshot {
    /// Vertical position of the row.
    pub y: f32,
    /// Platform types from the leftmost column to the rightmost.
    pub kinds: Vec<PlatformType>,
}

/// Messages exchanged between the host and its clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReplicationMessage {
    /// Initial or recovery snapshot of the canonical grid.
    Snapshot(WorldSnapshot),
    /// Canonical platform type of a cell.
    SetPlatformType {
        /// Cell to mutate.
        platform: PlatformId,
        /// Type to assign.
        kind: PlatformType,
    },
    /// Canonical item of a cell.
    SetItemType {
        /// Cell to mutate.
        platform: PlatformId,
        /// Item to assign.
        item: ItemType,
    },
    /// Advisory position of a player, published by its owner.
    PlayerMoved {
        /// Player that moved.
        player: PlayerId,
        /// Position reported by the owner.
        position: Vec2,
    },
    /// A player reached the terminal state.
    PlayerDied {
        /// Player that died.
        player: PlayerId,
    },
    /// The round ended.
    GameOver {
        /// Player whose death ended the round.
        loser: PlayerId,
    },
    /// A client asks the host to perform a world mutation on its behalf.
    Intent {
        /// Player that caused the mutation.
        player: PlayerId,
        /// Mutation to perform.
        command: Command,
    },
    /// A client lost track of the grid and asks for a fresh snapshot.
    RequestSnapshot {
        /// Player asking.
        player: PlayerId,
    },
}

impl ReplicationMessage {
    /// Player the message is scoped to, if any.
    #[must_use]
    pub const fn player(&self) -> Option<PlayerId> {
        match self {
            Self::PlayerMoved { player, .. }
            | Self::PlayerDied { player }
            | Self::Intent { player, .. }
            | Self::RequestSnapshot { player } => Some(*player),
            Self::Snapshot(_)
            | Self::SetPlatformType { .. }
            | Self::SetItemType { .. }
            | Self::GameOver { .. } => None,
        }
    }
}
