use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rowfall_core::{
    random::{select_weighted, trial},
    Event, ItemChance, ItemType, PlatformId, PlatformType, SimulationContext,
};

use crate::items::ItemStore;

/// Single grid cell. The vertical coordinate is owned by the enclosing row.
#[derive(Clone, Debug)]
pub(crate) struct Platform {
    pub(crate) id: PlatformId,
    pub(crate) x: f32,
    pub(crate) kind: PlatformType,
}

/// Horizontal slice of platforms sharing a vertical coordinate.
///
/// Rows are created once per slot and mutated in place when they recycle.
#[derive(Clone, Debug)]
pub(crate) struct Row {
    pub(crate) y: f32,
    pub(crate) platforms: Vec<Platform>,
}

impl Row {
    /// Creates the row occupying `slot`, filled with empty platforms.
    pub(crate) fn empty(slot: u32, y: f32, column_positions: &[f32]) -> Self {
        let width = column_positions.len() as u32;
        let platforms = column_positions
            .iter()
            .enumerate()
            .map(|(column, x)| Platform {
                id: PlatformId::from_cell(slot, column as u32, width),
                x: *x,
                kind: PlatformType::None,
            })
            .collect();
        Self { y, platforms }
    }

    /// Assigns a generated layout to every cell, replacing prior items.
    pub(crate) fn generate(
        &mut self,
        layout: &RowLayout,
        items: &mut ItemStore,
        out_events: &mut Vec<Event>,
    ) {
        for (platform, (kind, item)) in self
            .platforms
            .iter_mut()
            .zip(layout.kinds.iter().zip(layout.items.iter()))
        {
            if platform.kind != *kind {
                platform.kind = *kind;
                out_events.push(Event::PlatformTypeChanged {
                    platform: platform.id,
                    kind: *kind,
                });
            }
            if items.set(platform.id, *item, None) {
                out_events.push(Event::ItemChanged {
                    platform: platform.id,
                    item: *item,
                });
            }
        }
    }

    /// Moves the row to `y`; regenerates its cells when a layout is supplied.
    pub(crate) fn recycle_to(
        &mut self,
        y: f32,
        layout: Option<&RowLayout>,
        items: &mut ItemStore,
        out_events: &mut Vec<Event>,
    ) {
        self.y = y;
        if let Some(layout) = layout {
            self.generate(layout, items, out_events);
        }
    }
}

/// Platform types and items assigned to a row in one generation pass.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RowLayout {
    pub(crate) kinds: Vec<PlatformType>,
    pub(crate) items: Vec<ItemType>,
}

/// Seeded source of row layouts owned by the authoritative world.
#[derive(Clone, Debug)]
pub(crate) struct RowGenerator {
    rng: ChaCha8Rng,
    width: usize,
    weights: [f32; 8],
    item_chances: Vec<ItemChance>,
    templates: Vec<Vec<PlatformType>>,
    percent_of_random_rows: f32,
}

impl RowGenerator {
    pub(crate) fn new(context: &SimulationContext) -> Self {
        let config = context.config();
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            width: config.width as usize,
            weights: context.platform_table().weights(),
            item_chances: config.item_chances.clone(),
            templates: config.predefined_rows.clone(),
            percent_of_random_rows: config.percent_of_random_rows,
        }
    }

    /// Draws the next layout: a random row or one of the templates.
    pub(crate) fn next_layout(&mut self) -> RowLayout {
        let use_random =
            self.templates.is_empty() || trial(self.percent_of_random_rows, &mut self.rng);

        let kinds = if use_random {
            (0..self.width)
                .map(|_| PlatformType::ALL[select_weighted(&self.weights, &mut self.rng)])
                .collect()
        } else {
            let index = self.rng.gen_range(0..self.templates.len());
            self.templates[index].clone()
        };

        let items = (0..self.width).map(|_| self.roll_item()).collect();
        RowLayout { kinds, items }
    }

    fn roll_item(&mut self) -> ItemType {
        for entry in &self.item_chances {
            if trial(entry.chance, &mut self.rng) {
                return entry.item;
            }
        }
        ItemType::None
    }
}

#[cfg(test)]
mod tests {
    use super::{Row, RowGenerator, RowLayout};
    use crate::items::ItemStore;
    use rowfall_core::{
        Event, ItemChance, ItemType, PlatformId, PlatformType, SimulationConfig, SimulationContext,
    };

    fn context(config: SimulationConfig) -> SimulationContext {
        SimulationContext::new(config).expect("valid configuration")
    }

    #[test]
    fn templates_are_used_when_random_rows_are_disabled() {
        let config = SimulationConfig {
            percent_of_random_rows: 0.0,
            item_chances: Vec::new(),
            ..SimulationConfig::default()
        };
        let templates = config.predefined_rows.clone();
        let mut generator = RowGenerator::new(&context(config));

        for _ in 0..32 {
            let layout = generator.next_layout();
            assert!(templates.contains(&layout.kinds));
            assert!(layout.items.iter().all(|item| *item == ItemType::None));
        }
    }

    #[test]
    fn random_rows_follow_weights() {
        let mut config = SimulationConfig {
            percent_of_random_rows: 1.0,
            ..SimulationConfig::default()
        };
        config.platform_weights.none = 0.0;
        config.platform_weights.normal = 0.0;
        config.platform_weights.spikes = 0.0;
        config.platform_weights.slime = 0.0;
        config.platform_weights.slide_left = 0.0;
        config.platform_weights.slide_right = 0.0;
        config.platform_weights.grass = 1.0;
        config.platform_weights.glass = 0.0;
        let mut generator = RowGenerator::new(&context(config));

        let layout = generator.next_layout();
        assert_eq!(layout.kinds, vec![PlatformType::Grass; 5]);
    }

    #[test]
    fn first_successful_item_trial_wins() {
        let config = SimulationConfig {
            item_chances: vec![
                ItemChance {
                    item: ItemType::BombCollectible,
                    chance: 1.0,
                },
                ItemChance {
                    item: ItemType::BombActive,
                    chance: 1.0,
                },
            ],
            ..SimulationConfig::default()
        };
        let mut generator = RowGenerator::new(&context(config));

        let layout = generator.next_layout();
        assert_eq!(layout.items, vec![ItemType::BombCollectible; 5]);
    }

    #[test]
    fn generation_reports_only_changed_cells() {
        let mut row = Row::empty(1, 0.5, &[-1.0, 0.0, 1.0]);
        let mut items = ItemStore::default();
        let mut events = Vec::new();
        let layout = RowLayout {
            kinds: vec![PlatformType::None, PlatformType::Glass, PlatformType::None],
            items: vec![ItemType::None, ItemType::None, ItemType::BombCollectible],
        };

        row.generate(&layout, &mut items, &mut events);

        assert_eq!(
            events,
            vec![
                Event::PlatformTypeChanged {
                    platform: PlatformId::new(4),
                    kind: PlatformType::Glass,
                },
                Event::ItemChanged {
                    platform: PlatformId::new(5),
                    item: ItemType::BombCollectible,
                },
            ]
        );
    }

    #[test]
    fn recycling_without_layout_only_moves_the_row() {
        let mut row = Row::empty(0, -2.0, &[0.0]);
        row.platforms[0].kind = PlatformType::Slime;
        let mut items = ItemStore::default();
        let mut events = Vec::new();

        row.recycle_to(3.0, None, &mut items, &mut events);

        assert_eq!(row.y, 3.0);
        assert_eq!(row.platforms[0].kind, PlatformType::Slime);
        assert!(events.is_empty());
    }
}
