//! Headless match between bot-driven peers connected through a loopback hub.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rowfall_core::{PlayerId, SimulationContext, SwipeDirection, Vec2};
use rowfall_system_player::{DeathCause, PlayerCue, PlayerState};
use rowfall_system_replication::{CodecError, LoopbackHub, LoopbackLink, MatchOutcome, Peer};
use rowfall_world::query;

const SWIPES: [SwipeDirection; 4] = [
    SwipeDirection::Up,
    SwipeDirection::Down,
    SwipeDirection::Left,
    SwipeDirection::Right,
];

/// Probability per tick that a bot carrying a bomb drops it.
const BOMB_CHANCE: f64 = 0.02;

/// Ticks between two status lines.
const STATUS_INTERVAL: u32 = 60;

/// Random swipe input standing in for a touch screen.
#[derive(Debug)]
struct Bot {
    rng: ChaCha8Rng,
    swipe_chance: f32,
}

impl Bot {
    fn new(seed: u64, swipe_chance: f32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            swipe_chance,
        }
    }

    fn drive(&mut self, peer: &mut Peer<LoopbackLink>) {
        let Some(player) = peer.local_player() else {
            return;
        };
        if player.is_dead() {
            return;
        }
        let idle = player.actions().is_empty() && player.state() != PlayerState::Moving;
        let carries_bomb = player.inventory().has_bomb();

        if carries_bomb && self.rng.gen_bool(BOMB_CHANCE) {
            let _ = peer.place_bomb();
        }
        if idle && self.rng.gen::<f32>() < self.swipe_chance {
            peer.swipe(SWIPES[self.rng.gen_range(0..SWIPES.len())]);
        }
    }
}

#[derive(Debug)]
struct Participant {
    peer: Peer<LoopbackLink>,
    bot: Bot,
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MatchReport {
    /// Ticks simulated before the run stopped.
    pub(crate) ticks: u32,
    /// Outcome resolved by the host, if the round ended.
    pub(crate) outcome: Option<MatchOutcome>,
    /// Deaths in the order they were observed by their owners.
    pub(crate) deaths: Vec<(PlayerId, DeathCause)>,
    /// Number of landings across all players.
    pub(crate) landings: usize,
}

/// Host plus clients advancing in lockstep on one thread.
#[derive(Debug)]
pub(crate) struct Match {
    hub: LoopbackHub,
    participants: Vec<Participant>,
    deaths: Vec<(PlayerId, DeathCause)>,
    landings: usize,
}

impl Match {
    /// Connects `players` peers, the first one hosting, and spawns every player.
    pub(crate) fn new(context: &SimulationContext, players: u32, swipe_chance: f32) -> Self {
        let hub = LoopbackHub::new();
        let seed = context.config().seed;
        let host_id = PlayerId::new(1);

        let mut participants: Vec<Participant> = (1..=players)
            .map(|index| {
                let id = PlayerId::new(index);
                let peer = if id == host_id {
                    Peer::host(id, context, hub.connect(id, true))
                } else {
                    Peer::client(id, host_id, context, hub.connect(id, false))
                };
                Participant {
                    peer,
                    bot: Bot::new(seed.wrapping_add(u64::from(index)), swipe_chance),
                }
            })
            .collect();

        let ids: Vec<PlayerId> = participants.iter().map(|p| p.peer.id()).collect();
        let spawns: Vec<Option<Vec2>> = match participants.first_mut() {
            Some(Participant { peer: host, .. }) => {
                for id in &ids {
                    host.join(*id);
                }
                ids.iter()
                    .enumerate()
                    .map(|(slot, id)| host.assign_spawn(*id, spawn_hint(context, slot)))
                    .collect()
            }
            None => Vec::new(),
        };
        for (participant, spawn) in participants.iter_mut().zip(spawns) {
            match spawn {
                Some(position) => participant.peer.spawn_local(position),
                None => log::warn!("no spawn platform for player {}", participant.peer.id().get()),
            }
        }

        Self {
            hub,
            participants,
            deaths: Vec::new(),
            landings: 0,
        }
    }

    /// Runs up to `ticks` steps of `dt` seconds, stopping once the round is decided.
    pub(crate) fn run(&mut self, ticks: u32, dt: f32) -> Result<MatchReport, CodecError> {
        let mut simulated = 0;
        for tick in 0..ticks {
            for participant in &mut self.participants {
                participant.bot.drive(&mut participant.peer);
                participant.peer.tick(dt);
            }
            self.pump()?;
            self.collect_cues();
            simulated = tick + 1;

            if tick % STATUS_INTERVAL == 0 {
                self.log_status(tick);
            }
            if self.host_outcome().is_some() {
                break;
            }
        }

        Ok(MatchReport {
            ticks: simulated,
            outcome: self.host_outcome(),
            deaths: self.deaths.clone(),
            landings: self.landings,
        })
    }

    fn host_outcome(&self) -> Option<MatchOutcome> {
        self.participants
            .first()
            .and_then(|participant| participant.peer.outcome())
    }

    fn pump(&mut self) -> Result<(), CodecError> {
        loop {
            let mut delivered = false;
            for participant in &mut self.participants {
                let messages = self.hub.drain(participant.peer.id())?;
                delivered |= !messages.is_empty();
                for message in messages {
                    participant.peer.receive(message);
                }
            }
            if !delivered {
                return Ok(());
            }
        }
    }

    fn collect_cues(&mut self) {
        for participant in &mut self.participants {
            let id = participant.peer.id();
            for cue in participant.peer.drain_cues() {
                match cue {
                    PlayerCue::Died { cause } => self.deaths.push((id, cause)),
                    PlayerCue::Landed { .. } => self.landings += 1,
                    _ => {}
                }
            }
        }
    }

    fn log_status(&self, tick: u32) {
        for participant in &self.participants {
            let Some(player) = participant.peer.local_player() else {
                continue;
            };
            let position = player.position();
            let below = query::platform_below_position(participant.peer.world(), position)
                .map(|platform| platform.kind);
            log::debug!(
                "tick {tick}: player {} at ({:.2}, {:.2}) {:?}, below {below:?}",
                player.id().get(),
                position.x,
                position.y,
                player.state()
            );
        }
    }
}

/// Point near which the player in `slot` spawns: the middle row, spread across columns.
fn spawn_hint(context: &SimulationContext, slot: usize) -> Vec2 {
    let columns = context.column_positions();
    let rows = context.initial_row_positions();
    let x = columns[(slot * 2) % columns.len()];
    let y = rows[rows.len() / 2];
    Vec2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::Match;
    use rowfall_core::{PlayerId, SimulationConfig, SimulationContext};
    use rowfall_system_player::DeathCause;

    const DT: f32 = 1.0 / 60.0;

    fn context(seed: u64) -> SimulationContext {
        SimulationContext::new(SimulationConfig {
            seed,
            ..SimulationConfig::default()
        })
        .expect("valid configuration")
    }

    #[test]
    fn idle_player_rides_its_row_to_the_bottom() {
        let context = context(5);
        let mut session = Match::new(&context, 1, 0.0);

        let report = session.run(3_000, DT).expect("run");

        let outcome = report.outcome.expect("round decided");
        assert_eq!(outcome.loser, PlayerId::new(1));
        assert_eq!(outcome.winner, None);
        assert_eq!(
            report.deaths,
            vec![(PlayerId::new(1), DeathCause::RowDestroyed)]
        );
        assert!(report.ticks < 3_000);
    }

    #[test]
    fn same_seed_replays_the_same_match() {
        let first = Match::new(&context(17), 3, 0.2)
            .run(1_500, DT)
            .expect("run");
        let second = Match::new(&context(17), 3, 0.2)
            .run(1_500, DT)
            .expect("run");

        assert_eq!(first, second);
        assert!(first.landings > 0);
    }

    #[test]
    fn every_player_gets_a_spawn() {
        let context = context(3);
        let session = Match::new(&context, 4, 0.0);

        for participant in &session.participants {
            assert!(participant.peer.local_player().is_some());
        }
    }
}
