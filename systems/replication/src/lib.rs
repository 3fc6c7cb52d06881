#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Host-authoritative replication for Rowfall.
//!
//! Every participant runs a [`Peer`]. The host peer owns the canonical grid:
//! it generates rows, runs platform timers, applies intents sent by clients
//! and broadcasts each resulting cell change. Client peers mirror the grid by
//! applying those deltas, run their own player optimistically and forward the
//! grid mutations their player causes to the host.

pub mod codec;
mod ledger;
mod loopback;

use std::collections::BTreeMap;

use rowfall_core::{
    Command, Event, ItemType, PlatformType, PlayerId, ReplicationMessage, SimulationContext,
    SwipeDirection, Vec2,
};
use rowfall_system_player::{DeathCause, PlayerCue, PlayerSimulation};
use rowfall_world::{self as world, query, World};
use thiserror::Error;

pub use codec::CodecError;
pub use ledger::LivenessLedger;
pub use loopback::{LoopbackHub, LoopbackLink};

/// Platform types a player is never spawned on.
const UNSAFE_SPAWN_TYPES: [PlatformType; 5] = [
    PlatformType::None,
    PlatformType::Spikes,
    PlatformType::Slime,
    PlatformType::SlideLeft,
    PlatformType::SlideRight,
];

/// Errors reported by a [`Broadcaster`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link to the remote side is gone.
    #[error("peer unreachable")]
    Unreachable,
    /// The message could not be encoded for the wire.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Fire-and-forget delivery of replication messages.
pub trait Broadcaster {
    /// Delivers a message to every other participant.
    fn send_to_all(&mut self, message: &ReplicationMessage) -> Result<(), TransportError>;

    /// Delivers a message to the host.
    fn send_to_host(&mut self, message: &ReplicationMessage) -> Result<(), TransportError>;
}

/// Authority held by a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns the canonical grid.
    Host,
    /// Mirrors the host's grid.
    Client,
}

/// Result of a finished round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Player whose death ended the round.
    pub loser: PlayerId,
    /// Last player standing, if any.
    pub winner: Option<PlayerId>,
    /// Reports whether the host is the winner.
    pub host_won: bool,
}

/// One participant of a replicated session.
#[derive(Debug)]
pub struct Peer<B> {
    id: PlayerId,
    host: PlayerId,
    role: Role,
    world: World,
    local: Option<PlayerSimulation>,
    ledger: LivenessLedger,
    broadcaster: B,
    connected: bool,
    snapshot_requested: bool,
    remote_positions: BTreeMap<PlayerId, Vec2>,
    outcome: Option<MatchOutcome>,
    cues: Vec<PlayerCue>,
}

impl<B> Peer<B>
where
    B: Broadcaster,
{
    /// Creates the host peer, generating the canonical grid.
    pub fn host(id: PlayerId, context: &SimulationContext, broadcaster: B) -> Self {
        Self::with_world(id, id, Role::Host, World::new(context), broadcaster)
    }

    /// Creates a client peer that mirrors the grid owned by `host`.
    pub fn client(
        id: PlayerId,
        host: PlayerId,
        context: &SimulationContext,
        broadcaster: B,
    ) -> Self {
        Self::with_world(id, host, Role::Client, World::mirror(context), broadcaster)
    }

    fn with_world(id: PlayerId, host: PlayerId, role: Role, world: World, broadcaster: B) -> Self {
        let mut ledger = LivenessLedger::default();
        let _ = ledger.register(id);
        let _ = ledger.register(host);
        Self {
            id,
            host,
            role,
            world,
            local: None,
            ledger,
            broadcaster,
            connected: true,
            snapshot_requested: false,
            remote_positions: BTreeMap::new(),
            outcome: None,
            cues: Vec::new(),
        }
    }

    /// Identifier of the local participant.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Authority held by the peer.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Grid as seen by this peer.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Locally owned player, once spawned.
    #[must_use]
    pub const fn local_player(&self) -> Option<&PlayerSimulation> {
        self.local.as_ref()
    }

    /// Participants known to the peer and their liveness.
    #[must_use]
    pub const fn ledger(&self) -> &LivenessLedger {
        &self.ledger
    }

    /// Outcome of the round, once resolved.
    #[must_use]
    pub const fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Reports whether the transport still accepts messages.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Last advisory position received for another participant.
    #[must_use]
    pub fn remote_position(&self, player: PlayerId) -> Option<Vec2> {
        self.remote_positions.get(&player).copied()
    }

    /// Takes the presentation cues raised by the local player since the last call.
    pub fn drain_cues(&mut self) -> Vec<PlayerCue> {
        std::mem::take(&mut self.cues)
    }

    /// Records a participant of the round.
    pub fn join(&mut self, player: PlayerId) {
        let _ = self.ledger.register(player);
    }

    /// Picks a safe platform near `hint` for `player` and forces it to plain ground.
    ///
    /// Only the host assigns spawns; returns the position to spawn at.
    pub fn assign_spawn(&mut self, player: PlayerId, hint: Vec2) -> Option<Vec2> {
        if self.role != Role::Host {
            return None;
        }
        let platform = query::platform_closest_to(&self.world, hint, &UNSAFE_SPAWN_TYPES)?;
        self.join(player);
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::SetPlatformType {
                platform: platform.id,
                kind: PlatformType::Normal,
            },
            &mut events,
        );
        self.broadcast_deltas(&events);
        let offset = query::context(&self.world).config().player_platform_offset;
        Some(platform.position + offset)
    }

    /// Creates the locally owned player at `position`.
    pub fn spawn_local(&mut self, position: Vec2) {
        let context = query::context(&self.world);
        self.local = Some(PlayerSimulation::new(self.id, position, context));
    }

    /// Forwards a classified swipe to the local player.
    pub fn swipe(&mut self, direction: SwipeDirection) {
        if let Some(player) = self.local.as_mut() {
            player.swipe(direction);
        }
    }

    /// Places the local player's bomb; returns whether one was placed.
    pub fn place_bomb(&mut self) -> bool {
        let Some(player) = self.local.as_mut() else {
            return false;
        };
        let mut commands = Vec::new();
        if !player.place_bomb(&self.world, &mut commands, &mut self.cues) {
            return false;
        }
        self.submit(commands);
        true
    }

    /// Advances the grid and the local player by one tick.
    pub fn tick(&mut self, dt: f32) {
        if self.role == Role::Client && !query::is_synchronized(&self.world) {
            self.resync();
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Advance { dt }, &mut events);
        if self.role == Role::Host {
            self.broadcast_deltas(&events);
        }

        if !query::is_synchronized(&self.world) {
            return;
        }
        let Some(player) = self.local.as_mut() else {
            return;
        };
        if player.is_dead() {
            return;
        }

        let mut commands = Vec::new();
        player.simulate(dt, &self.world, &events, &mut commands, &mut self.cues);
        let position = player.position();
        let died = player.is_dead();
        self.submit(commands);

        if died {
            self.report_local_death();
        } else {
            let moved = ReplicationMessage::PlayerMoved {
                player: self.id,
                position,
            };
            match self.role {
                Role::Host => self.send_to_all(&moved),
                Role::Client => self.send_to_host(&moved),
            }
        }
    }

    /// Handles a message delivered by the transport.
    pub fn receive(&mut self, message: ReplicationMessage) {
        if let Some(player) = message.player() {
            if player != self.id && self.ledger.is_dead(player) {
                log::debug!("dropping message about dead player {}", player.get());
                return;
            }
        }

        match self.role {
            Role::Host => self.receive_as_host(message),
            Role::Client => self.receive_as_client(message),
        }
    }

    /// Handles a participant leaving the session; leaving counts as losing.
    pub fn player_left(&mut self, player: PlayerId) {
        log::info!("player {} left the session", player.get());
        match self.role {
            Role::Host => self.record_death(player),
            Role::Client => {
                if !self.ledger.mark_dead(player) {
                    return;
                }
                if player == self.host {
                    self.resolve_outcome(player);
                }
            }
        }
    }

    fn receive_as_host(&mut self, message: ReplicationMessage) {
        match message {
            ReplicationMessage::Intent { player, command } => {
                if !accepts_intent(&self.world, player, &command) {
                    log::warn!("rejecting intent {command:?} from player {}", player.get());
                    return;
                }
                self.join(player);
                let mut events = Vec::new();
                world::apply(&mut self.world, command, &mut events);
                self.broadcast_deltas(&events);
            }
            ReplicationMessage::PlayerMoved { player, position } => {
                self.join(player);
                let _ = self.remote_positions.insert(player, position);
                self.send_to_all(&ReplicationMessage::PlayerMoved { player, position });
            }
            ReplicationMessage::PlayerDied { player } => self.record_death(player),
            ReplicationMessage::RequestSnapshot { player } => {
                log::debug!("sending snapshot to player {}", player.get());
                self.join(player);
                let snapshot = query::snapshot(&self.world);
                self.send_to_all(&ReplicationMessage::Snapshot(snapshot));
            }
            ReplicationMessage::Snapshot(_)
            | ReplicationMessage::SetPlatformType { .. }
            | ReplicationMessage::SetItemType { .. }
            | ReplicationMessage::GameOver { .. } => {
                log::warn!("host ignoring authoritative message from a client");
            }
        }
    }

    fn receive_as_client(&mut self, message: ReplicationMessage) {
        match message {
            ReplicationMessage::Snapshot(snapshot) => {
                let mut events = Vec::new();
                world::apply(
                    &mut self.world,
                    Command::RestoreSnapshot { snapshot },
                    &mut events,
                );
                self.snapshot_requested = false;
            }
            ReplicationMessage::SetPlatformType { platform, kind } => {
                self.apply_delta(Command::SetPlatformType { platform, kind });
            }
            ReplicationMessage::SetItemType { platform, item } => {
                self.apply_delta(Command::SetItemType { platform, item });
            }
            ReplicationMessage::PlayerMoved { player, position } => {
                if player == self.id {
                    return;
                }
                self.join(player);
                let _ = self.remote_positions.insert(player, position);
            }
            ReplicationMessage::PlayerDied { player } => {
                if !self.ledger.mark_dead(player) {
                    return;
                }
                if player == self.id {
                    if let Some(local) = self.local.as_mut() {
                        local.kill(DeathCause::Eliminated, &mut self.cues);
                    }
                }
            }
            ReplicationMessage::GameOver { loser } => {
                let _ = self.ledger.mark_dead(loser);
                self.resolve_outcome(loser);
            }
            ReplicationMessage::Intent { .. } | ReplicationMessage::RequestSnapshot { .. } => {
                log::warn!("client ignoring message addressed to the host");
            }
        }
    }

    fn apply_delta(&mut self, command: Command) {
        let platform = match &command {
            Command::SetPlatformType { platform, .. } | Command::SetItemType { platform, .. } => {
                *platform
            }
            _ => return,
        };
        if !query::contains(&self.world, platform) {
            log::warn!("delta for unknown platform {}", platform.get());
            self.resync();
            return;
        }
        if !query::is_synchronized(&self.world) {
            self.resync();
        }
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
    }

    fn submit(&mut self, commands: Vec<Command>) {
        for command in commands {
            let mut events = Vec::new();
            world::apply(&mut self.world, command.clone(), &mut events);
            match self.role {
                Role::Host => self.broadcast_deltas(&events),
                Role::Client => self.send_to_host(&ReplicationMessage::Intent {
                    player: self.id,
                    command,
                }),
            }
        }
    }

    fn report_local_death(&mut self) {
        match self.role {
            Role::Host => self.record_death(self.id),
            Role::Client => {
                let _ = self.ledger.mark_dead(self.id);
                self.send_to_host(&ReplicationMessage::PlayerDied { player: self.id });
            }
        }
    }

    fn record_death(&mut self, player: PlayerId) {
        if !self.ledger.mark_dead(player) {
            return;
        }
        log::info!("player {} is out", player.get());
        if player == self.id {
            if let Some(local) = self.local.as_mut() {
                local.kill(DeathCause::Eliminated, &mut self.cues);
            }
        }
        self.send_to_all(&ReplicationMessage::PlayerDied { player });

        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::DisarmBombs { owner: player },
            &mut events,
        );
        self.broadcast_deltas(&events);

        if self.outcome.is_none() && self.ledger.alive().len() <= 1 {
            self.resolve_outcome(player);
            self.send_to_all(&ReplicationMessage::GameOver { loser: player });
        }
    }

    fn resolve_outcome(&mut self, loser: PlayerId) {
        if self.outcome.is_some() {
            return;
        }
        let alive = self.ledger.alive();
        let winner = match alive.as_slice() {
            [survivor] => Some(*survivor),
            _ => None,
        };
        let outcome = MatchOutcome {
            loser,
            winner,
            host_won: winner == Some(self.host),
        };
        log::info!(
            "round over: loser {}, winner {:?}",
            loser.get(),
            winner.map(|player| player.get())
        );
        self.outcome = Some(outcome);
    }

    fn broadcast_deltas(&mut self, events: &[Event]) {
        for event in events {
            let message = match event {
                Event::PlatformTypeChanged { platform, kind } => {
                    ReplicationMessage::SetPlatformType {
                        platform: *platform,
                        kind: *kind,
                    }
                }
                Event::ItemChanged { platform, item } => ReplicationMessage::SetItemType {
                    platform: *platform,
                    item: *item,
                },
                _ => continue,
            };
            self.send_to_all(&message);
        }
    }

    fn resync(&mut self) {
        if self.snapshot_requested {
            return;
        }
        self.snapshot_requested = true;
        self.send_to_host(&ReplicationMessage::RequestSnapshot { player: self.id });
    }

    fn send_to_all(&mut self, message: &ReplicationMessage) {
        if !self.connected {
            return;
        }
        let result = self.broadcaster.send_to_all(message);
        self.note_send(result);
    }

    fn send_to_host(&mut self, message: &ReplicationMessage) {
        if !self.connected {
            return;
        }
        let result = self.broadcaster.send_to_host(message);
        self.note_send(result);
    }

    fn note_send(&mut self, result: Result<(), TransportError>) {
        match result {
            Ok(()) => {}
            Err(TransportError::Unreachable) => {
                log::warn!("peer {} lost its link; no longer sending", self.id.get());
                self.connected = false;
            }
            Err(error) => log::warn!("dropping message: {error}"),
        }
    }
}

/// Reports whether `player` may cause `command` on the host grid.
///
/// Players only clear collectibles, break glass, prime their own bombs and arm
/// bombs they primed; any player may set off a live bomb next to them.
fn accepts_intent(world: &World, player: PlayerId, command: &Command) -> bool {
    match command {
        Command::SetItemType { platform, item } => {
            *item == ItemType::None
                && query::platform(world, *platform)
                    .is_some_and(|view| view.item == ItemType::BombCollectible)
        }
        Command::PrimeBomb { owner, .. } => *owner == player,
        Command::ArmBomb { platform } => query::bomb_owner(world, *platform) == Some(player),
        Command::BreakGlass { .. } | Command::DetonateBomb { .. } => true,
        Command::Advance { .. }
        | Command::SetPlatformType { .. }
        | Command::DisarmBombs { .. }
        | Command::RestoreSnapshot { .. } => false,
    }
}
