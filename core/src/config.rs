use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ItemType, PlatformType, PlayerAction};

const DEFAULT_WIDTH: u32 = 5;
const DEFAULT_HEIGHT: u32 = 6;
const DEFAULT_COLUMN_SPACING: f32 = 1.5;
const DEFAULT_ROW_SPACING: f32 = 1.0;
const DEFAULT_SCROLL_SPEED: f32 = 0.2;
const DEFAULT_PERCENT_OF_RANDOM_ROWS: f32 = 0.1;
const DEFAULT_FALL_DEATH_MULTIPLIER: f32 = 1.5;
const DEFAULT_SNAP_RANGE_FRACTION: f32 = 0.8;
const DEFAULT_GLASS_REGENERATION_TIME: f32 = 2.0;
const DEFAULT_BOMB_PRIMING_TIME: f32 = 3.0;
const DEFAULT_PLAYER_SPEED: f32 = 6.0;
const DEFAULT_PLAYER_CHECK_TOLERANCE: f32 = 0.05;
const DEFAULT_JUMP_HEIGHT: f32 = 1.0;
const DEFAULT_PLAYER_PLATFORM_OFFSET: Vec2 = Vec2::new(0.0, 0.35);
const DEFAULT_COLUMN_SNAP_TOLERANCE: f32 = 0.5;
const DEFAULT_SEED: u64 = 0x5eed_0f_a11_c0de;

/// Factor applied to the player's platform offset when deciding whether a
/// destroyed row took the player with it.
const ROW_DESTROYED_BAND_FACTOR: f32 = 1.5;

/// Immutable session configuration supplied at world creation.
///
/// Every field carries a default so partial TOML documents deserialize into a
/// playable configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of platforms per row.
    pub width: u32,
    /// Number of rows in the conveyor.
    pub height: u32,
    /// Horizontal distance between neighbouring platforms.
    pub column_spacing: f32,
    /// Vertical distance between neighbouring rows.
    pub row_spacing: f32,
    /// Distance every row scrolls down per second.
    pub scroll_speed: f32,
    /// Spawn weight of every platform type for random rows.
    pub platform_weights: PlatformWeights,
    /// Item trials walked in order when a cell is generated.
    pub item_chances: Vec<ItemChance>,
    /// Row templates used when a recycle does not roll a random row.
    pub predefined_rows: Vec<Vec<PlatformType>>,
    /// Probability that a recycled row is generated randomly instead of from a template.
    pub percent_of_random_rows: f32,
    /// Fall distance, in rows, that a player survives.
    pub fall_death_multiplier: f32,
    /// Fraction of the smaller spacing used as the snap radius.
    pub snap_range_fraction: f32,
    /// Seconds a broken glass platform stays empty.
    pub glass_regeneration_time: f32,
    /// Seconds a placed bomb primes before going live.
    pub bomb_priming_time: f32,
    /// Distance a player covers per second while moving.
    pub player_speed: f32,
    /// Distance under which a player counts as having arrived.
    pub player_check_tolerance: f32,
    /// Height of the jump arc drawn during horizontal moves.
    pub jump_height: f32,
    /// Offset between a platform centre and the player standing on it.
    pub player_platform_offset: Vec2,
    /// Maximum distance, in column spacings, for a position to belong to a column.
    pub column_snap_tolerance: f32,
    /// Seed for every random draw made by the host.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            column_spacing: DEFAULT_COLUMN_SPACING,
            row_spacing: DEFAULT_ROW_SPACING,
            scroll_speed: DEFAULT_SCROLL_SPEED,
            platform_weights: PlatformWeights::default(),
            item_chances: vec![ItemChance {
                item: ItemType::BombCollectible,
                chance: 0.05,
            }],
            predefined_rows: default_predefined_rows(),
            percent_of_random_rows: DEFAULT_PERCENT_OF_RANDOM_ROWS,
            fall_death_multiplier: DEFAULT_FALL_DEATH_MULTIPLIER,
            snap_range_fraction: DEFAULT_SNAP_RANGE_FRACTION,
            glass_regeneration_time: DEFAULT_GLASS_REGENERATION_TIME,
            bomb_priming_time: DEFAULT_BOMB_PRIMING_TIME,
            player_speed: DEFAULT_PLAYER_SPEED,
            player_check_tolerance: DEFAULT_PLAYER_CHECK_TOLERANCE,
            jump_height: DEFAULT_JUMP_HEIGHT,
            player_platform_offset: DEFAULT_PLAYER_PLATFORM_OFFSET,
            column_snap_tolerance: DEFAULT_COLUMN_SNAP_TOLERANCE,
            seed: DEFAULT_SEED,
        }
    }
}

impl SimulationConfig {
    /// Checks the configuration for values the simulation cannot run with.
    ///
    /// A weight table summing to zero is accepted; row generation then falls
    /// back to empty platforms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }

        for (field, value) in [
            ("column_spacing", self.column_spacing),
            ("row_spacing", self.row_spacing),
            ("snap_range_fraction", self.snap_range_fraction),
            ("glass_regeneration_time", self.glass_regeneration_time),
            ("bomb_priming_time", self.bomb_priming_time),
            ("player_speed", self.player_speed),
            ("player_check_tolerance", self.player_check_tolerance),
            ("fall_death_multiplier", self.fall_death_multiplier),
            ("column_snap_tolerance", self.column_snap_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if !(self.scroll_speed.is_finite() && self.scroll_speed >= 0.0) {
            return Err(ConfigError::NonPositive {
                field: "scroll_speed",
                value: self.scroll_speed,
            });
        }

        if !(0.0..=1.0).contains(&self.percent_of_random_rows) {
            return Err(ConfigError::RatioOutOfRange {
                value: self.percent_of_random_rows,
            });
        }

        for kind in PlatformType::ALL {
            let weight = self.platform_weights.weight(kind);
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(ConfigError::NegativeWeight { kind, weight });
            }
        }

        for entry in &self.item_chances {
            if !(0.0..=1.0).contains(&entry.chance) {
                return Err(ConfigError::ChanceOutOfRange {
                    item: entry.item,
                    chance: entry.chance,
                });
            }
        }

        for (index, template) in self.predefined_rows.iter().enumerate() {
            if template.len() != self.width as usize {
                return Err(ConfigError::TemplateWidth {
                    index,
                    expected: self.width,
                    found: template.len(),
                });
            }
        }

        Ok(())
    }
}

/// Spawn weight of each platform type for randomly generated rows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformWeights {
    /// Weight of empty cells.
    pub none: f32,
    /// Weight of plain platforms.
    pub normal: f32,
    /// Weight of spikes.
    pub spikes: f32,
    /// Weight of slime.
    pub slime: f32,
    /// Weight of left slides.
    pub slide_left: f32,
    /// Weight of right slides.
    pub slide_right: f32,
    /// Weight of grass.
    pub grass: f32,
    /// Weight of glass.
    pub glass: f32,
}

impl Default for PlatformWeights {
    fn default() -> Self {
        Self {
            none: 2.0,
            normal: 6.0,
            spikes: 1.0,
            slime: 1.0,
            slide_left: 1.0,
            slide_right: 1.0,
            grass: 2.0,
            glass: 1.0,
        }
    }
}

impl PlatformWeights {
    /// Weight configured for the provided platform type.
    #[must_use]
    pub const fn weight(&self, kind: PlatformType) -> f32 {
        match kind {
            PlatformType::None => self.none,
            PlatformType::Normal => self.normal,
            PlatformType::Spikes => self.spikes,
            PlatformType::Slime => self.slime,
            PlatformType::SlideLeft => self.slide_left,
            PlatformType::SlideRight => self.slide_right,
            PlatformType::Grass => self.grass,
            PlatformType::Glass => self.glass,
        }
    }
}

/// Chance that an item spawns on a freshly generated cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemChance {
    /// Item placed when the trial succeeds.
    pub item: ItemType,
    /// Probability in `[0, 1]` of the trial succeeding.
    pub chance: f32,
}

/// Errors raised while validating a [`SimulationConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The grid has no rows or no columns.
    #[error("grid must have at least one row and one column, got {width}x{height}")]
    EmptyGrid {
        /// Configured width.
        width: u32,
        /// Configured height.
        height: u32,
    },
    /// A quantity that must be strictly positive is not.
    #[error("`{field}` must be positive, got {value}")]
    NonPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: f32,
    },
    /// The random row ratio lies outside `[0, 1]`.
    #[error("`percent_of_random_rows` must lie in [0, 1], got {value}")]
    RatioOutOfRange {
        /// Configured value.
        value: f32,
    },
    /// A platform weight is negative or not finite.
    #[error("weight of {kind:?} must be non-negative, got {weight}")]
    NegativeWeight {
        /// Platform type carrying the weight.
        kind: PlatformType,
        /// Configured weight.
        weight: f32,
    },
    /// An item chance lies outside `[0, 1]`.
    #[error("chance of {item:?} must lie in [0, 1], got {chance}")]
    ChanceOutOfRange {
        /// Item carrying the chance.
        item: ItemType,
        /// Configured chance.
        chance: f32,
    },
    /// A predefined row does not span the grid width.
    #[error("predefined row {index} has {found} cells, expected {expected}")]
    TemplateWidth {
        /// Position of the template in the configuration.
        index: usize,
        /// Grid width.
        expected: u32,
        /// Template length.
        found: usize,
    },
}

/// Presentation keys and spawn weight of one platform type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlatformTypeEntry {
    /// Platform type described by the entry.
    pub kind: PlatformType,
    /// Sound played when a player lands on the platform.
    pub sound_key: &'static str,
    /// Sprite drawn for the platform.
    pub sprite_key: &'static str,
    /// Spawn weight used for random rows.
    pub weight: f32,
}

/// Static mapping from platform type to its presentation keys and spawn weight.
#[derive(Clone, Debug, PartialEq)]
pub struct PlatformTypeTable {
    entries: [PlatformTypeEntry; 8],
}

impl PlatformTypeTable {
    /// Builds the table from configured weights.
    #[must_use]
    pub fn new(weights: &PlatformWeights) -> Self {
        let entries = PlatformType::ALL.map(|kind| {
            let (sound_key, sprite_key) = presentation_keys(kind);
            PlatformTypeEntry {
                kind,
                sound_key,
                sprite_key,
                weight: weights.weight(kind),
            }
        });
        Self { entries }
    }

    /// Entry describing the provided platform type.
    #[must_use]
    pub fn entry(&self, kind: PlatformType) -> &PlatformTypeEntry {
        &self.entries[kind.index()]
    }

    /// Sound key of the provided platform type; empty for [`PlatformType::None`].
    #[must_use]
    pub fn sound_key(&self, kind: PlatformType) -> &'static str {
        self.entry(kind).sound_key
    }

    /// Spawn weights ordered like [`PlatformType::ALL`].
    #[must_use]
    pub fn weights(&self) -> [f32; 8] {
        self.entries.map(|entry| entry.weight)
    }
}

fn presentation_keys(kind: PlatformType) -> (&'static str, &'static str) {
    match kind {
        PlatformType::None => ("", ""),
        PlatformType::Normal => ("Step Normal", "platform_normal"),
        PlatformType::Spikes => ("Step Spike", "platform_spikes"),
        PlatformType::Slime => ("Step Slime", "platform_slime"),
        PlatformType::SlideLeft => ("Step Slide", "platform_slide_left"),
        PlatformType::SlideRight => ("Step Slide", "platform_slide_right"),
        PlatformType::Grass => ("Step Grass", "platform_grass"),
        PlatformType::Glass => ("Step Glass", "platform_glass"),
    }
}

fn default_predefined_rows() -> Vec<Vec<PlatformType>> {
    use PlatformType::{Glass, Normal, Slime, SlideLeft, SlideRight, Spikes};
    const N: PlatformType = PlatformType::None;

    vec![
        vec![N, SlideLeft, Spikes, SlideRight, N],
        vec![N, Glass, Normal, Slime, N],
        vec![Normal, N, Normal, N, Normal],
        vec![Spikes, SlideLeft, Normal, Spikes, SlideLeft],
        vec![Glass, N, Glass, N, Glass],
        vec![Normal, Slime, Slime, Glass, Normal],
        vec![SlideRight, Glass, Glass, Glass, SlideLeft],
        vec![Normal, Spikes, Normal, Spikes, Normal],
    ]
}

/// Validated configuration plus the geometry derived from it.
///
/// Constructed once per session and passed by reference to the world, every
/// player simulation and the replication peers.
#[derive(Clone, Debug)]
pub struct SimulationContext {
    config: SimulationConfig,
    platform_table: PlatformTypeTable,
    top_border: f32,
    bottom_border: f32,
    snap_range: f32,
    column_positions: Vec<f32>,
    row_positions: Vec<f32>,
}

impl SimulationContext {
    /// Validates the configuration and derives the grid geometry.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let width = config.width as f32;
        let height = config.height as f32;
        let top_border = height * config.row_spacing / 2.0;
        let column_positions = (0..config.width)
            .map(|column| (column as f32 - width / 2.0 + 0.5) * config.column_spacing)
            .collect();
        let row_positions = (0..config.height)
            .map(|row| (row as f32 - height / 2.0 + 0.5) * config.row_spacing)
            .collect();

        Ok(Self {
            platform_table: PlatformTypeTable::new(&config.platform_weights),
            top_border,
            bottom_border: -top_border,
            snap_range: config.column_spacing.min(config.row_spacing) * config.snap_range_fraction,
            column_positions,
            row_positions,
            config,
        })
    }

    /// Configuration the context was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Presentation keys and weights of every platform type.
    #[must_use]
    pub fn platform_table(&self) -> &PlatformTypeTable {
        &self.platform_table
    }

    /// Number of platforms per row.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Vertical position recycled rows are moved to.
    #[must_use]
    pub const fn top_border(&self) -> f32 {
        self.top_border
    }

    /// Vertical position at which a row is recycled.
    #[must_use]
    pub const fn bottom_border(&self) -> f32 {
        self.bottom_border
    }

    /// Radius within which a position snaps onto a platform.
    #[must_use]
    pub const fn snap_range(&self) -> f32 {
        self.snap_range
    }

    /// Horizontal centre of every column, leftmost first.
    #[must_use]
    pub fn column_positions(&self) -> &[f32] {
        &self.column_positions
    }

    /// Vertical position of every row slot at world creation.
    #[must_use]
    pub fn initial_row_positions(&self) -> &[f32] {
        &self.row_positions
    }

    /// Fall distance beyond which a landing is fatal.
    #[must_use]
    pub fn fall_death_distance(&self) -> f32 {
        self.config.fall_death_multiplier * self.config.row_spacing
    }

    /// Vertical band around a destroyed row inside which a player dies with it.
    #[must_use]
    pub fn row_destroyed_band(&self) -> f32 {
        ROW_DESTROYED_BAND_FACTOR * self.config.player_platform_offset.y
    }

    /// World-space displacement of a single move.
    #[must_use]
    pub fn move_delta(&self, action: PlayerAction) -> Vec2 {
        action.direction() * Vec2::new(self.config.column_spacing, self.config.row_spacing)
    }

    /// Column whose centre lies closest to `x`, if it is within the snap tolerance.
    #[must_use]
    pub fn nearest_column(&self, x: f32) -> Option<usize> {
        let tolerance = self.config.column_snap_tolerance * self.config.column_spacing;
        let mut best: Option<(usize, f32)> = None;
        for (column, centre) in self.column_positions.iter().enumerate() {
            let distance = (centre - x).abs();
            if distance > tolerance {
                continue;
            }
            match best {
                Some((_, closest)) if closest <= distance => {}
                _ => best = Some((column, distance)),
            }
        }
        best.map(|(column, _)| column)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SimulationConfig, SimulationContext};
    use crate::{ItemChance, ItemType, PlatformType, PlayerAction, Vec2};

    #[test]
    fn default_configuration_is_valid() {
        let context = SimulationContext::new(SimulationConfig::default()).expect("valid");
        assert_eq!(context.width(), 5);
        assert_eq!(context.height(), 6);
        assert!((context.top_border() - 3.0).abs() < f32::EPSILON);
        assert!((context.bottom_border() + 3.0).abs() < f32::EPSILON);
        assert!((context.snap_range() - 0.8).abs() < 1e-6);
        assert_eq!(context.config().predefined_rows.len(), 8);
    }

    #[test]
    fn geometry_is_centred_on_origin() {
        let context = SimulationContext::new(SimulationConfig::default()).expect("valid");
        assert_eq!(context.column_positions(), &[-3.0, -1.5, 0.0, 1.5, 3.0]);
        assert_eq!(
            context.initial_row_positions(),
            &[-2.5, -1.5, -0.5, 0.5, 1.5, 2.5]
        );
    }

    #[test]
    fn move_delta_scales_by_spacing() {
        let context = SimulationContext::new(SimulationConfig::default()).expect("valid");
        assert_eq!(
            context.move_delta(PlayerAction::MoveRight),
            Vec2::new(1.5, 0.0)
        );
        assert_eq!(
            context.move_delta(PlayerAction::MoveDown),
            Vec2::new(0.0, -1.0)
        );
        assert_eq!(context.move_delta(PlayerAction::None), Vec2::ZERO);
    }

    #[test]
    fn nearest_column_respects_tolerance() {
        let context = SimulationContext::new(SimulationConfig::default()).expect("valid");
        assert_eq!(context.nearest_column(0.1), Some(2));
        assert_eq!(context.nearest_column(-2.9), Some(0));
        assert_eq!(context.nearest_column(4.0), None);
    }

    #[test]
    fn sound_keys_follow_platform_types() {
        let context = SimulationContext::new(SimulationConfig::default()).expect("valid");
        let table = context.platform_table();
        assert_eq!(table.sound_key(PlatformType::None), "");
        assert_eq!(table.sound_key(PlatformType::Spikes), "Step Spike");
        assert_eq!(table.sound_key(PlatformType::SlideLeft), "Step Slide");
        assert_eq!(table.sound_key(PlatformType::SlideRight), "Step Slide");
        assert_eq!(table.weights()[PlatformType::Normal.index()], 6.0);
    }

    #[test]
    fn rejects_templates_of_the_wrong_width() {
        let config = SimulationConfig {
            width: 4,
            ..SimulationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TemplateWidth {
                index: 0,
                expected: 4,
                found: 5,
            })
        );
    }

    #[test]
    fn rejects_chances_outside_unit_interval() {
        let config = SimulationConfig {
            item_chances: vec![ItemChance {
                item: ItemType::BombCollectible,
                chance: 1.5,
            }],
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChanceOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_empty_grid() {
        let config = SimulationConfig {
            height: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            SimulationContext::new(config),
            Err(ConfigError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn zero_weights_are_accepted() {
        let mut config = SimulationConfig::default();
        config.platform_weights = super::PlatformWeights {
            none: 0.0,
            normal: 0.0,
            spikes: 0.0,
            slime: 0.0,
            slide_left: 0.0,
            slide_right: 0.0,
            grass: 0.0,
            glass: 0.0,
        };
        assert!(config.validate().is_ok());
    }
}
