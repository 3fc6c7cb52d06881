#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Rowfall.
//!
//! The world is an endless conveyor of platform rows. Every tick the rows
//! scroll down; a row crossing the bottom border is moved back to the top and,
//! on the authoritative host, regenerated. Client worlds are mirrors: they
//! scroll locally but receive platform contents through replicated commands.

mod items;
mod row;

use std::collections::BTreeMap;

use rowfall_core::{
    Command, Event, ItemType, PlatformId, PlatformType, PlayerId, SimulationContext, WorldSnapshot,
};

use crate::{
    items::ItemStore,
    row::{Row, RowGenerator},
};

/// Remaining time under which a countdown counts as elapsed.
const TIMER_EPSILON: f32 = 1e-4;

/// Represents the Rowfall world state owned by one participant.
#[derive(Debug)]
pub struct World {
    context: SimulationContext,
    rows: Vec<Row>,
    items: ItemStore,
    glass_timers: BTreeMap<PlatformId, f32>,
    generator: Option<RowGenerator>,
    synchronized: bool,
    tick_index: u64,
}

impl World {
    /// Creates the authoritative world, generating every row from the configured seed.
    #[must_use]
    pub fn new(context: &SimulationContext) -> Self {
        let mut world = Self::with_rows(context, Some(RowGenerator::new(context)));
        let mut discarded = Vec::new();
        for slot in 0..world.rows.len() {
            world.regenerate_row(slot, &mut discarded);
        }
        world.synchronized = true;
        world
    }

    /// Creates a client mirror whose platforms stay empty until a snapshot arrives.
    #[must_use]
    pub fn mirror(context: &SimulationContext) -> Self {
        Self::with_rows(context, None)
    }

    fn with_rows(context: &SimulationContext, generator: Option<RowGenerator>) -> Self {
        let rows = context
            .initial_row_positions()
            .iter()
            .enumerate()
            .map(|(slot, y)| Row::empty(slot as u32, *y, context.column_positions()))
            .collect();
        Self {
            context: context.clone(),
            rows,
            items: ItemStore::default(),
            glass_timers: BTreeMap::new(),
            generator,
            synchronized: false,
            tick_index: 0,
        }
    }

    fn is_authoritative(&self) -> bool {
        self.generator.is_some()
    }

    fn regenerate_row(&mut self, slot: usize, out_events: &mut Vec<Event>) {
        let Some(generator) = self.generator.as_mut() else {
            return;
        };
        let layout = generator.next_layout();
        let Some(row) = self.rows.get_mut(slot) else {
            return;
        };
        for platform in &row.platforms {
            let _ = self.glass_timers.remove(&platform.id);
        }
        row.generate(&layout, &mut self.items, out_events);
    }

    fn platform_mut(&mut self, id: PlatformId) -> Option<&mut row::Platform> {
        let width = self.context.width();
        let row = self.rows.get_mut(id.row(width) as usize)?;
        row.platforms.get_mut(id.column(width) as usize)
    }

    fn contains(&self, id: PlatformId) -> bool {
        id.get() < self.context.width() * self.context.height()
    }

    fn scroll(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let distance = self.context.config().scroll_speed * dt;
        for row in &mut self.rows {
            row.y -= distance;
        }

        let bottom = self.context.bottom_border();
        let top = self.context.top_border();
        for slot in 0..self.rows.len() {
            let previous_y = self.rows[slot].y;
            if previous_y > bottom {
                continue;
            }

            out_events.push(Event::PlatformRowDestroyed {
                row: slot as u32,
                y: previous_y,
            });

            let layout = self
                .generator
                .as_mut()
                .map(|generator| generator.next_layout());
            if layout.is_some() {
                for platform in &self.rows[slot].platforms {
                    let _ = self.glass_timers.remove(&platform.id);
                }
            }
            self.rows[slot].recycle_to(top, layout.as_ref(), &mut self.items, out_events);
            out_events.push(Event::RowRecycled {
                row: slot as u32,
                y: top,
            });
            log::debug!("row {slot} recycled from {previous_y:.3} to {top:.3}");
        }
    }

    fn tick_glass(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let mut restored = Vec::new();
        for (platform, remaining) in &mut self.glass_timers {
            *remaining -= dt;
            if *remaining <= TIMER_EPSILON {
                restored.push(*platform);
            }
        }

        for id in restored {
            let _ = self.glass_timers.remove(&id);
            let Some(platform) = self.platform_mut(id) else {
                continue;
            };
            if platform.kind != PlatformType::None {
                continue;
            }
            platform.kind = PlatformType::Glass;
            out_events.push(Event::GlassRestored { platform: id });
            out_events.push(Event::PlatformTypeChanged {
                platform: id,
                kind: PlatformType::Glass,
            });
            log::debug!("glass platform {} regenerated", id.get());
        }
    }

    fn set_platform_type(
        &mut self,
        id: PlatformId,
        kind: PlatformType,
        out_events: &mut Vec<Event>,
    ) {
        let _ = self.glass_timers.remove(&id);
        let Some(platform) = self.platform_mut(id) else {
            log::warn!("ignoring type change for unknown platform {}", id.get());
            return;
        };
        if platform.kind == kind {
            return;
        }
        platform.kind = kind;
        out_events.push(Event::PlatformTypeChanged { platform: id, kind });
    }

    fn set_item(
        &mut self,
        id: PlatformId,
        item: ItemType,
        owner: Option<PlayerId>,
        out_events: &mut Vec<Event>,
    ) {
        if !self.contains(id) {
            log::warn!("ignoring item change for unknown platform {}", id.get());
            return;
        }
        if self.items.set(id, item, owner) {
            out_events.push(Event::ItemChanged { platform: id, item });
        }
    }

    fn restore(&mut self, snapshot: WorldSnapshot, out_events: &mut Vec<Event>) {
        if snapshot.width != self.context.width() || snapshot.rows.len() != self.rows.len() {
            log::warn!(
                "ignoring snapshot of {} rows by {} columns",
                snapshot.rows.len(),
                snapshot.width
            );
            return;
        }
        if snapshot
            .rows
            .iter()
            .any(|row| row.kinds.len() != snapshot.width as usize)
        {
            log::warn!("ignoring snapshot with ragged rows");
            return;
        }

        for (row, restored) in self.rows.iter_mut().zip(snapshot.rows) {
            row.y = restored.y;
            for (platform, kind) in row.platforms.iter_mut().zip(restored.kinds) {
                platform.kind = kind;
            }
        }

        self.items.clear();
        for (platform, item) in snapshot.items {
            if self.contains(platform) {
                let _ = self.items.set(platform, item, None);
            }
        }
        self.glass_timers.clear();
        self.synchronized = true;
        out_events.push(Event::SnapshotRestored);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands that would not change anything emit no events, so replicated
/// deltas can be applied any number of times.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Advance { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.scroll(dt, out_events);
            if world.is_authoritative() {
                world.tick_glass(dt, out_events);
            }
        }
        Command::SetPlatformType { platform, kind } => {
            world.set_platform_type(platform, kind, out_events);
        }
        Command::SetItemType { platform, item } => {
            world.set_item(platform, item, None, out_events);
        }
        Command::BreakGlass { platform } => {
            let regeneration = world.context.config().glass_regeneration_time;
            let authoritative = world.is_authoritative();
            let Some(cell) = world.platform_mut(platform) else {
                return;
            };
            if cell.kind != PlatformType::Glass {
                return;
            }
            cell.kind = PlatformType::None;
            out_events.push(Event::GlassBroken { platform });
            out_events.push(Event::PlatformTypeChanged {
                platform,
                kind: PlatformType::None,
            });
            if authoritative {
                let _ = world.glass_timers.insert(platform, regeneration);
            }
            log::debug!("glass platform {} broke", platform.get());
        }
        Command::PrimeBomb { platform, owner } => {
            world.set_item(platform, ItemType::BombPriming, Some(owner), out_events);
        }
        Command::ArmBomb { platform } => {
            if world.items.get(platform) == ItemType::BombPriming {
                let owner = world.items.owner(platform);
                world.set_item(platform, ItemType::BombActive, owner, out_events);
                log::debug!("bomb on platform {} is live", platform.get());
            }
        }
        Command::DetonateBomb { platform } => {
            if world.items.get(platform) == ItemType::BombActive {
                out_events.push(Event::BombExploded { platform });
                world.set_item(platform, ItemType::None, None, out_events);
            }
        }
        Command::DisarmBombs { owner } => {
            for platform in world.items.primed_by(owner) {
                world.set_item(platform, ItemType::None, None, out_events);
            }
        }
        Command::RestoreSnapshot { snapshot } => {
            world.restore(snapshot, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use rowfall_core::{
        ItemType, PlatformId, PlatformType, PlayerId, RowSnapshot, SimulationContext, Vec2,
        WorldSnapshot,
    };

    use super::World;

    /// Immutable representation of a single platform used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PlatformView {
        /// Stable identifier of the cell.
        pub id: PlatformId,
        /// Centre of the platform in world units.
        pub position: Vec2,
        /// Type currently carried by the platform.
        pub kind: PlatformType,
        /// Item currently resting on the platform.
        pub item: ItemType,
    }

    /// Context the world was created with.
    #[must_use]
    pub fn context(world: &World) -> &SimulationContext {
        &world.context
    }

    /// Number of `Advance` commands applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Reports whether the world owns row generation and timers.
    #[must_use]
    pub fn is_authoritative(world: &World) -> bool {
        world.is_authoritative()
    }

    /// Reports whether the world holds the canonical grid or a restored snapshot of it.
    #[must_use]
    pub fn is_synchronized(world: &World) -> bool {
        world.synchronized
    }

    /// Reports whether `id` addresses a cell of the grid.
    #[must_use]
    pub fn contains(world: &World, id: PlatformId) -> bool {
        world.contains(id)
    }

    /// Every platform in row-major order.
    pub fn platforms(world: &World) -> impl Iterator<Item = PlatformView> + '_ {
        world.rows.iter().flat_map(move |row| {
            row.platforms.iter().map(move |platform| PlatformView {
                id: platform.id,
                position: Vec2::new(platform.x, row.y),
                kind: platform.kind,
                item: world.items.get(platform.id),
            })
        })
    }

    /// Looks up a single platform by identifier.
    #[must_use]
    pub fn platform(world: &World, id: PlatformId) -> Option<PlatformView> {
        let width = world.context.width();
        let row = world.rows.get(id.row(width) as usize)?;
        let platform = row.platforms.get(id.column(width) as usize)?;
        Some(PlatformView {
            id,
            position: Vec2::new(platform.x, row.y),
            kind: platform.kind,
            item: world.items.get(id),
        })
    }

    /// Vertical position of every row slot.
    #[must_use]
    pub fn row_positions(world: &World) -> Vec<f32> {
        world.rows.iter().map(|row| row.y).collect()
    }

    /// Player that placed the bomb resting on a platform, if any.
    #[must_use]
    pub fn bomb_owner(world: &World, id: PlatformId) -> Option<PlayerId> {
        world.items.owner(id)
    }

    /// Remaining regeneration time of a broken glass platform.
    #[must_use]
    pub fn glass_regeneration_remaining(world: &World, id: PlatformId) -> Option<f32> {
        world.glass_timers.get(&id).copied()
    }

    /// Closest platform to `position` within `range`.
    ///
    /// Ties resolve to the platform met first in row-major order.
    #[must_use]
    pub fn platform_within_range(
        world: &World,
        position: Vec2,
        range: f32,
    ) -> Option<PlatformView> {
        closest(platforms(world), position)
            .filter(|(_, distance)| *distance <= range)
            .map(|(platform, _)| platform)
    }

    /// Closest platform to `position` whose type is not excluded.
    #[must_use]
    pub fn platform_closest_to(
        world: &World,
        position: Vec2,
        excluded: &[PlatformType],
    ) -> Option<PlatformView> {
        closest(
            platforms(world).filter(|platform| !excluded.contains(&platform.kind)),
            position,
        )
        .map(|(platform, _)| platform)
    }

    /// Nearest walkable platform strictly below `position` in the column closest to it.
    ///
    /// Returns `None` when no column lies within the configured snap tolerance.
    #[must_use]
    pub fn platform_below_position(world: &World, position: Vec2) -> Option<PlatformView> {
        let column = world.context.nearest_column(position.x)?;
        let width = world.context.width();
        platforms(world)
            .filter(|platform| platform.id.column(width) as usize == column)
            .filter(|platform| platform.position.y < position.y && platform.kind.is_walkable())
            .fold(None, |best: Option<PlatformView>, platform| match best {
                Some(current) if current.position.y >= platform.position.y => Some(current),
                _ => Some(platform),
            })
    }

    /// Captures the full grid for replication to a joining peer.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        WorldSnapshot {
            width: world.context.width(),
            rows: world
                .rows
                .iter()
                .map(|row| RowSnapshot {
                    y: row.y,
                    kinds: row.platforms.iter().map(|platform| platform.kind).collect(),
                })
                .collect(),
            items: world.items.iter().collect(),
        }
    }

    fn closest(
        candidates: impl Iterator<Item = PlatformView>,
        position: Vec2,
    ) -> Option<(PlatformView, f32)> {
        let mut best: Option<(PlatformView, f32)> = None;
        for platform in candidates {
            let distance = platform.position.distance(position);
            match best {
                Some((_, closest)) if closest <= distance => {}
                _ => best = Some((platform, distance)),
            }
        }
        best
    }
}
