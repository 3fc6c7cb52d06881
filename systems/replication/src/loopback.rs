//! In-memory transport connecting peers that run in the same process.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet, VecDeque},
    rc::Rc,
};

use rowfall_core::{PlayerId, ReplicationMessage};

use crate::{
    codec::{self, CodecError},
    Broadcaster, TransportError,
};

/// Shared mailboxes of every connected peer.
///
/// Messages are encoded on send and decoded on delivery, so the loopback
/// exercises the same bytes a network transport would carry.
#[derive(Clone, Debug, Default)]
pub struct LoopbackHub {
    state: Rc<RefCell<HubState>>,
}

#[derive(Debug, Default)]
struct HubState {
    host: Option<PlayerId>,
    mailboxes: BTreeMap<PlayerId, VecDeque<Vec<u8>>>,
    disconnected: BTreeSet<PlayerId>,
}

impl LoopbackHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a mailbox for `player` and returns its sending side.
    pub fn connect(&self, player: PlayerId, is_host: bool) -> LoopbackLink {
        let mut state = self.state.borrow_mut();
        let _ = state.mailboxes.entry(player).or_default();
        let _ = state.disconnected.remove(&player);
        if is_host {
            state.host = Some(player);
        }
        LoopbackLink {
            hub: self.clone(),
            player,
        }
    }

    /// Cuts `player` off; its pending messages are discarded.
    pub fn disconnect(&self, player: PlayerId) {
        let mut state = self.state.borrow_mut();
        let _ = state.disconnected.insert(player);
        let _ = state.mailboxes.remove(&player);
    }

    /// Takes every message waiting for `player`, oldest first.
    pub fn drain(&self, player: PlayerId) -> Result<Vec<ReplicationMessage>, CodecError> {
        let pending: Vec<Vec<u8>> = self
            .state
            .borrow_mut()
            .mailboxes
            .get_mut(&player)
            .map(|mailbox| mailbox.drain(..).collect())
            .unwrap_or_default();
        pending.iter().map(|bytes| codec::decode(bytes)).collect()
    }
}

/// Sending side of a peer connected to a [`LoopbackHub`].
#[derive(Clone, Debug)]
pub struct LoopbackLink {
    hub: LoopbackHub,
    player: PlayerId,
}

impl LoopbackLink {
    fn ensure_connected(&self, state: &HubState) -> Result<(), TransportError> {
        if state.disconnected.contains(&self.player) {
            return Err(TransportError::Unreachable);
        }
        Ok(())
    }
}

impl Broadcaster for LoopbackLink {
    fn send_to_all(&mut self, message: &ReplicationMessage) -> Result<(), TransportError> {
        let bytes = codec::encode(message)?;
        let mut state = self.hub.state.borrow_mut();
        self.ensure_connected(&state)?;
        for (player, mailbox) in state.mailboxes.iter_mut() {
            if *player != self.player {
                mailbox.push_back(bytes.clone());
            }
        }
        Ok(())
    }

    fn send_to_host(&mut self, message: &ReplicationMessage) -> Result<(), TransportError> {
        let bytes = codec::encode(message)?;
        let mut state = self.hub.state.borrow_mut();
        self.ensure_connected(&state)?;
        let host = state.host.ok_or(TransportError::Unreachable)?;
        if host == self.player {
            return Ok(());
        }
        let mailbox = state
            .mailboxes
            .get_mut(&host)
            .ok_or(TransportError::Unreachable)?;
        mailbox.push_back(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LoopbackHub;
    use crate::{Broadcaster, TransportError};
    use rowfall_core::{PlayerId, ReplicationMessage};

    #[test]
    fn broadcasts_reach_everyone_but_the_sender() {
        let hub = LoopbackHub::new();
        let host = PlayerId::new(1);
        let guest = PlayerId::new(2);
        let other = PlayerId::new(3);
        let mut host_link = hub.connect(host, true);
        let _guest_link = hub.connect(guest, false);
        let _other_link = hub.connect(other, false);

        let message = ReplicationMessage::PlayerDied { player: guest };
        host_link.send_to_all(&message).expect("send");

        assert!(hub.drain(host).expect("drain").is_empty());
        assert_eq!(hub.drain(guest).expect("drain"), vec![message.clone()]);
        assert_eq!(hub.drain(other).expect("drain"), vec![message]);
    }

    #[test]
    fn messages_to_the_host_skip_other_clients() {
        let hub = LoopbackHub::new();
        let host = PlayerId::new(1);
        let guest = PlayerId::new(2);
        let _host_link = hub.connect(host, true);
        let mut guest_link = hub.connect(guest, false);

        let message = ReplicationMessage::RequestSnapshot { player: guest };
        guest_link.send_to_host(&message).expect("send");

        assert_eq!(hub.drain(host).expect("drain"), vec![message]);
        assert!(hub.drain(guest).expect("drain").is_empty());
    }

    #[test]
    fn disconnected_links_are_unreachable() {
        let hub = LoopbackHub::new();
        let host = PlayerId::new(1);
        let guest = PlayerId::new(2);
        let mut host_link = hub.connect(host, true);
        let mut guest_link = hub.connect(guest, false);

        hub.disconnect(host);

        let message = ReplicationMessage::PlayerDied { player: guest };
        assert!(matches!(
            host_link.send_to_all(&message),
            Err(TransportError::Unreachable)
        ));
        assert!(matches!(
            guest_link.send_to_host(&message),
            Err(TransportError::Unreachable)
        ));
    }
}
