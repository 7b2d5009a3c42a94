//! [`Session`] drives one [`Round`] sequence to completion; [`MultiHandler`]
//! wraps it with the input/output queues a caller actually interacts with.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::echo::{EchoAccumulator, EchoPayload};
use super::{AbortReason, Advance, Message, Round, SessionInfo};
use crate::error::Error;
use crate::party::PartyId;
use crate::tools::collections::Accumulator;
use crate::tools::hashing::Hash;

/// The content of a [`Message`]: either protocol-round bytes, or the
/// echo-round's per-sender hash bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Protocol(Vec<u8>),
    Echo(Vec<u8>),
}

#[derive(Debug)]
enum Phase {
    Collecting,
    Echoing,
}

/// The outcome of a session, once it can no longer make progress without
/// more input.
pub enum Status<O> {
    InProgress,
    Output(O),
    Abort(AbortReason),
}

/// Drives a single protocol ([`Round`] sequence) through rounds, echo
/// phases, and finalize calls.
pub struct Session<R: Round> {
    info: SessionInfo,
    transcript: Hash,
    round: Option<R>,
    current_round_number: u32,
    direct_acc: Accumulator<Vec<u8>>,
    broadcast_acc: Accumulator<Vec<u8>>,
    echo_acc: EchoAccumulator,
    phase: Phase,
    buffered: BTreeMap<u32, Vec<Message>>,
    cancelled: bool,
    done: bool,
}

impl<R: Round> Session<R> {
    /// Starts a session for `round` (the protocol's first phase),
    /// returning it along with the outbound messages for round 1.
    pub fn new(info: SessionInfo, round: R, rng: &mut dyn CryptoRngCore) -> (Self, Vec<Message>) {
        let transcript = info.initial_transcript();
        let peers = other_parties(&info);
        let round_number = round.round_number();
        let mut session = Self {
            info,
            transcript,
            round: Some(round),
            current_round_number: round_number,
            direct_acc: Accumulator::new(peers.clone()),
            broadcast_acc: Accumulator::new(peers),
            echo_acc: EchoAccumulator::new(),
            phase: Phase::Collecting,
            buffered: BTreeMap::new(),
            cancelled: false,
            done: false,
        };
        let initial = session.outgoing_for_round(rng);
        (session, initial)
    }

    fn outgoing_for_round(&mut self, rng: &mut dyn CryptoRngCore) -> Vec<Message> {
        let round = self.round.as_ref().expect("round present while collecting");
        let mut out = Vec::new();
        if round.has_direct() {
            for (to, content) in round.direct_messages(rng) {
                out.push(Message {
                    from: self.info.self_id.clone(),
                    to: Some(to),
                    session_id: self.info.session_id,
                    round_number: self.current_round_number,
                    content: encode(&Payload::Protocol(content)),
                });
            }
        }
        if round.has_broadcast() {
            if let Some(content) = round.broadcast_message(rng) {
                out.push(Message {
                    from: self.info.self_id.clone(),
                    to: None,
                    session_id: self.info.session_id,
                    round_number: self.current_round_number,
                    content: encode(&Payload::Protocol(content)),
                });
            }
        }
        out
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.done = true;
    }

    /// Feeds one inbound message, returning newly produced outbound
    /// messages and the session's status after processing it.
    pub fn receive(&mut self, rng: &mut dyn CryptoRngCore, msg: Message) -> (Vec<Message>, Status<R::Output>) {
        if self.cancelled || self.done {
            return (Vec::new(), Status::Abort(AbortReason::Cancelled));
        }
        if msg.from == self.info.self_id {
            return (Vec::new(), Status::InProgress);
        }
        if !self.info.participants.contains(&msg.from) {
            warn!(?msg.from, "message from unknown party rejected");
            return self.abort(AbortReason::Protocol {
                culprit: msg.from,
                error: Error::InvalidContent(self.info.self_id.clone()),
            });
        }
        if msg.session_id != self.info.session_id {
            warn!(?msg.from, "message for a different session_id rejected");
            return self.abort(AbortReason::Protocol {
                culprit: msg.from.clone(),
                error: Error::SessionMismatch(msg.from),
            });
        }

        match msg.round_number.cmp(&self.current_round_number) {
            core::cmp::Ordering::Less => {
                debug!(round = msg.round_number, "discarding message for a past round");
                (Vec::new(), Status::InProgress)
            }
            core::cmp::Ordering::Greater => {
                debug!(round = msg.round_number, "buffering message for a future round");
                self.buffered.entry(msg.round_number).or_default().push(msg);
                (Vec::new(), Status::InProgress)
            }
            core::cmp::Ordering::Equal => self.receive_current(rng, msg),
        }
    }

    fn receive_current(&mut self, rng: &mut dyn CryptoRngCore, msg: Message) -> (Vec<Message>, Status<R::Output>) {
        let payload: Payload = match decode(&msg.content) {
            Ok(p) => p,
            Err(_) => {
                return self.abort(AbortReason::Protocol {
                    culprit: msg.from,
                    error: Error::Deserialization("malformed wire payload".into()),
                });
            }
        };

        match (&self.phase, payload) {
            (Phase::Collecting, Payload::Protocol(content)) => self.receive_protocol(rng, msg.from, msg.to, content),
            (Phase::Echoing, Payload::Echo(bytes)) => self.receive_echo(rng, msg.from, bytes),
            _ => self.abort(AbortReason::Protocol {
                culprit: msg.from.clone(),
                error: Error::RoundMismatch(msg.from, msg.round_number, self.current_round_number),
            }),
        }
    }

    fn receive_protocol(
        &mut self,
        rng: &mut dyn CryptoRngCore,
        from: PartyId,
        to: Option<PartyId>,
        content: Vec<u8>,
    ) -> (Vec<Message>, Status<R::Output>) {
        let round = self.round.as_ref().expect("round present while collecting");
        let is_broadcast = to.is_none();
        let verify_result = if is_broadcast {
            round.verify_broadcast(&from, &content)
        } else {
            round.verify_direct(&from, &content)
        };
        if let Err(error) = verify_result {
            error!(?from, "message rejected");
            return self.abort(AbortReason::Protocol { culprit: from, error });
        }

        let inserted = if is_broadcast {
            self.broadcast_acc.insert(from.clone(), content)
        } else {
            self.direct_acc.insert(from.clone(), content)
        };
        if !inserted {
            return self.abort(AbortReason::Protocol {
                culprit: from.clone(),
                error: Error::DuplicateMessage(from, self.current_round_number),
            });
        }

        match self.try_advance_current(rng) {
            Some(result) => result,
            None => (Vec::new(), Status::InProgress),
        }
    }

    /// If the round currently being collected has everything it needs
    /// (including the trivial case of a round with neither direct nor
    /// broadcast messages, which is ready the moment it's entered — a
    /// purely local verification step, as CMP keygen's round 4 is),
    /// advances it. Returns `None` if still waiting on more input.
    fn try_advance_current(&mut self, rng: &mut dyn CryptoRngCore) -> Option<(Vec<Message>, Status<R::Output>)> {
        let round = self.round.as_ref().expect("round present while collecting");
        let direct_ready = !round.has_direct() || self.direct_acc.is_complete();
        let broadcast_ready = !round.has_broadcast() || self.broadcast_acc.is_complete();
        if !(direct_ready && broadcast_ready) {
            return None;
        }

        Some(if round.has_broadcast() {
            self.enter_echo_phase(rng)
        } else {
            self.finalize_round(rng)
        })
    }

    fn enter_echo_phase(&mut self, rng: &mut dyn CryptoRngCore) -> (Vec<Message>, Status<R::Output>) {
        let raw: BTreeMap<PartyId, Vec<u8>> = self.broadcast_acc.clone_entries();
        let own_payload = EchoPayload::from_received(&raw);
        self.echo_acc.insert(self.info.self_id.clone(), own_payload.clone());
        self.phase = Phase::Echoing;

        let out = alloc::vec![Message {
            from: self.info.self_id.clone(),
            to: None,
            session_id: self.info.session_id,
            round_number: self.current_round_number,
            content: encode(&Payload::Echo(encode(&own_payload))),
        }];
        let _ = rng; // no randomness needed to build the echo payload itself
        (out, Status::InProgress)
    }

    fn receive_echo(&mut self, rng: &mut dyn CryptoRngCore, from: PartyId, bytes: Vec<u8>) -> (Vec<Message>, Status<R::Output>) {
        let payload: EchoPayload = match decode(&bytes) {
            Ok(p) => p,
            Err(_) => {
                return self.abort(AbortReason::Protocol {
                    culprit: from,
                    error: Error::Deserialization("malformed echo payload".into()),
                });
            }
        };
        self.echo_acc.insert(from, payload);

        let expected: Vec<PartyId> = self.info.participants.iter().cloned().collect();
        if !self.echo_acc.is_complete(&expected) {
            return (Vec::new(), Status::InProgress);
        }

        if let Some(culprit) = self.echo_acc.find_inconsistency() {
            error!(?culprit, "echo round found inconsistent broadcast");
            return self.abort(AbortReason::Protocol {
                culprit,
                error: Error::EchoMismatch(self.info.self_id.clone()),
            });
        }

        self.finalize_round(rng)
    }

    fn finalize_round(&mut self, rng: &mut dyn CryptoRngCore) -> (Vec<Message>, Status<R::Output>) {
        let round = self.round.take().expect("round present at finalize");
        let direct = core::mem::replace(&mut self.direct_acc, Accumulator::new(Vec::new())).into_map();
        let broadcast = core::mem::replace(&mut self.broadcast_acc, Accumulator::new(Vec::new())).into_map();
        self.echo_acc = EchoAccumulator::new();

        match round.finalize(rng, direct, broadcast, &mut self.transcript) {
            Ok(Advance::Output(output)) => {
                self.done = true;
                (Vec::new(), Status::Output(output))
            }
            Ok(Advance::Next(next)) => {
                self.current_round_number = next.round_number();
                let peers = other_parties(&self.info);
                self.direct_acc = Accumulator::new(peers.clone());
                self.broadcast_acc = Accumulator::new(peers);
                self.phase = Phase::Collecting;
                self.round = Some(next);
                let mut out = self.outgoing_for_round(rng);

                // A round with neither direct nor broadcast messages (a
                // purely local step) is ready to finalize immediately,
                // with no inbound message ever going to trigger it.
                if let Some((more, status)) = self.try_advance_current(rng) {
                    out.extend(more);
                    return (out, status);
                }

                if let Some(buffered) = self.buffered.remove(&self.current_round_number) {
                    for msg in buffered {
                        let (more, status) = self.receive(rng, msg);
                        out.extend(more);
                        if let Status::Output(_) | Status::Abort(_) = status {
                            return (out, status);
                        }
                    }
                }
                (out, Status::InProgress)
            }
            Err(error) => {
                let culprit = error.culprit().cloned();
                self.done = true;
                match culprit {
                    Some(culprit) => (Vec::new(), Status::Abort(AbortReason::Protocol { culprit, error })),
                    None => (Vec::new(), Status::Abort(AbortReason::Local(alloc::format!("{error}")))),
                }
            }
        }
    }

    fn abort(&mut self, reason: AbortReason) -> (Vec<Message>, Status<R::Output>) {
        self.done = true;
        (Vec::new(), Status::Abort(reason))
    }
}

fn other_parties(info: &SessionInfo) -> Vec<PartyId> {
    info.participants.iter().filter(|id| **id != info.self_id).cloned().collect()
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    rmp_serde::to_vec(value).expect("payload serialization is infallible for these types")
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

/// The caller-facing handle: feed it inbound [`Message`]s, drain outbound
/// ones, until it reports [`Status::Output`] or [`Status::Abort`].
///
/// Mirrors the `sessions.rs` constructor pattern, generalized from one
/// protocol to any [`Round`] implementation.
pub struct MultiHandler<R: Round> {
    session: Session<R>,
    outbox: VecDeque<Message>,
}

impl<R: Round> MultiHandler<R> {
    pub fn new(info: SessionInfo, round: R, rng: &mut dyn CryptoRngCore) -> Self {
        let (session, initial) = Session::new(info, round, rng);
        Self {
            session,
            outbox: initial.into(),
        }
    }

    pub fn pop_outgoing(&mut self) -> Option<Message> {
        self.outbox.pop_front()
    }

    pub fn deliver(&mut self, rng: &mut dyn CryptoRngCore, msg: Message) -> Status<R::Output> {
        let (to_send, status) = self.session.receive(rng, msg);
        self.outbox.extend(to_send);
        status
    }

    pub fn cancel(&mut self) {
        self.session.cancel();
    }
}
