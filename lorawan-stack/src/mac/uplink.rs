//! MAC answers awaiting the next uplink.
//!
//! Plain answers ride exactly one uplink. The four sticky answers
//! (`RXParamSetupAns`, `RXTimingSetupAns`, `DlChannelAns`,
//! `TXParamSetupAns`) are repeated in every uplink until any downlink is
//! received for this device; the sticky set is kept ordered by CID so
//! emission is deterministic.
use heapless::Vec;
use lorawan_codec::maccommands::SerializableMacCommand;

pub(crate) const FOPTS_MAX_LEN: usize = 15;

/// A serialized MAC command queued for uplink.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MacAnswer {
    cid: u8,
    payload: Vec<u8, 4>,
}

impl MacAnswer {
    pub(crate) fn from_cmd<M: SerializableMacCommand>(cmd: &M) -> Self {
        Self {
            cid: cmd.cid(),
            payload: Vec::from_slice(cmd.payload_bytes()).unwrap_or_default(),
        }
    }
}

impl SerializableMacCommand for MacAnswer {
    fn payload_bytes(&self) -> &[u8] {
        &self.payload
    }

    fn cid(&self) -> u8 {
        self.cid
    }

    fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uplink {
    pending: Vec<MacAnswer, 8>,
    sticky: Vec<MacAnswer, 4>,
    confirmed: bool,
}

impl Uplink {
    /// An acknowledgement bit is owed for a received confirmed downlink.
    pub(crate) fn set_downlink_confirmation(&mut self) {
        self.confirmed = true;
    }

    pub(crate) fn clear_downlink_confirmation(&mut self) {
        self.confirmed = false;
    }

    pub(crate) fn confirms_downlink(&self) -> bool {
        self.confirmed
    }

    /// Queues an answer for the next uplink only. Silently dropped when
    /// the queue is full; the network will repeat its request.
    pub(crate) fn queue<M: SerializableMacCommand>(&mut self, cmd: &M) {
        let _ = self.pending.push(MacAnswer::from_cmd(cmd));
    }

    /// Queues an answer repeated in every uplink until a downlink arrives.
    /// A newer answer with the same CID replaces the older one.
    pub(crate) fn queue_sticky<M: SerializableMacCommand>(&mut self, cmd: &M) {
        let answer = MacAnswer::from_cmd(cmd);
        if let Some(existing) = self.sticky.iter_mut().find(|a| a.cid == answer.cid) {
            *existing = answer;
            return;
        }
        let at = self.sticky.iter().position(|a| a.cid > answer.cid).unwrap_or(self.sticky.len());
        let _ = self.sticky.insert(at, answer);
    }

    /// Any downlink for this device retires the sticky answers.
    pub(crate) fn downlink_received(&mut self) {
        self.sticky.clear();
    }

    /// Collects the answers for the uplink being built, clearing the
    /// one-shot set.
    pub(crate) fn take_answers(&mut self) -> Vec<MacAnswer, 12> {
        let mut out = Vec::new();
        for a in self.pending.iter().chain(self.sticky.iter()) {
            let _ = out.push(a.clone());
        }
        self.pending.clear();
        out
    }

    pub(crate) fn has_sticky(&self) -> bool {
        !self.sticky.is_empty()
    }
}
