//! FIFO clip sequencer.
//!
//! Each clip occupies a slot in a queue. A slot is either `Pending`
//! (reserved, audio not yet available) or `Ready`. Only the head slot may
//! play, and only when nothing else is playing, so a pending head holds back
//! every clip behind it. The head leaves the queue when its playback reaches
//! a terminal state (finished, failed, or refused by the sink).

use std::collections::VecDeque;

use tracing::{debug, warn};

use niva_core::events::{EventEmitter, Notification, NotificationKind, SessionEvent};
use niva_core::types::{ClipRef, ClipTicket, Timestamp};

use crate::error::PlaybackError;
use crate::sink::AudioSink;

#[derive(Debug)]
enum Slot {
    Pending,
    Ready(ClipRef),
}

#[derive(Debug)]
struct QueuedClip {
    ticket: ClipTicket,
    slot: Slot,
}

pub struct PlaybackSequencer {
    sink: Box<dyn AudioSink>,
    queue: VecDeque<QueuedClip>,
    active: Option<ClipTicket>,
    next_ticket: u64,
    events: EventEmitter,
}

impl std::fmt::Debug for PlaybackSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSequencer")
            .field("queue", &self.queue)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl PlaybackSequencer {
    pub fn new(sink: Box<dyn AudioSink>, events: EventEmitter) -> Self {
        Self {
            sink,
            queue: VecDeque::new(),
            active: None,
            next_ticket: 0,
            events,
        }
    }

    /// Clip currently handed to the sink.
    pub fn active(&self) -> Option<ClipTicket> {
        self.active
    }

    /// Number of slots, including the active one.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Append a clip whose audio is already available.
    pub fn enqueue(&mut self, clip: ClipRef) -> ClipTicket {
        let ticket = self.push(Slot::Ready(clip));
        self.advance(false);
        ticket
    }

    /// Append an empty slot. Clips queued later wait for it to be fulfilled
    /// or forfeited.
    pub fn reserve(&mut self) -> ClipTicket {
        self.push(Slot::Pending)
    }

    /// Attach audio to a reserved slot.
    pub fn fulfill(&mut self, ticket: ClipTicket, clip: ClipRef) -> Result<(), PlaybackError> {
        let queued = self
            .queue
            .iter_mut()
            .find(|q| q.ticket == ticket)
            .ok_or(PlaybackError::UnknownTicket(ticket))?;
        if !matches!(queued.slot, Slot::Pending) {
            return Err(PlaybackError::NotPending(ticket));
        }
        debug!(%ticket, %clip, "Clip slot fulfilled");
        queued.slot = Slot::Ready(clip);
        self.advance(false);
        Ok(())
    }

    /// Drop a reserved slot that will never receive audio.
    pub fn forfeit(&mut self, ticket: ClipTicket) -> Result<(), PlaybackError> {
        let pos = self
            .queue
            .iter()
            .position(|q| q.ticket == ticket)
            .ok_or(PlaybackError::UnknownTicket(ticket))?;
        if !matches!(self.queue[pos].slot, Slot::Pending) {
            return Err(PlaybackError::NotPending(ticket));
        }
        self.queue.remove(pos);
        debug!(%ticket, "Clip slot forfeited");
        self.advance(true);
        Ok(())
    }

    /// The active clip played to the end.
    pub fn on_playback_finished(&mut self) {
        self.finish_active(false);
    }

    /// The active clip failed while playing. Treated like the end of the clip.
    pub fn on_playback_error(&mut self) {
        self.finish_active(true);
    }

    fn push(&mut self, slot: Slot) -> ClipTicket {
        let ticket = ClipTicket(self.next_ticket);
        self.next_ticket += 1;
        self.queue.push_back(QueuedClip { ticket, slot });
        debug!(%ticket, queued = self.queue.len(), "Clip slot queued");
        self.events.emit(SessionEvent::ClipQueued {
            ticket,
            timestamp: Timestamp::now(),
        });
        ticket
    }

    fn finish_active(&mut self, failed: bool) {
        let Some(ticket) = self.active.take() else {
            debug!("Playback completion with nothing active, ignoring");
            return;
        };
        if let Some(pos) = self.queue.iter().position(|q| q.ticket == ticket) {
            self.queue.remove(pos);
        }
        if failed {
            warn!(%ticket, "Clip playback failed");
            self.notify_failure();
        }
        self.emit_ended(ticket, failed);
        self.advance(true);
    }

    /// Start the head clip if it is ready and nothing is playing. Clips the
    /// sink refuses are terminal and removed; the next head is tried.
    ///
    /// `slot_ended` is set when the caller just removed a slot. `PlaybackIdle`
    /// is emitted here, once, when a removal leaves the queue empty.
    fn advance(&mut self, mut slot_ended: bool) {
        while self.active.is_none() {
            let Some(head) = self.queue.front() else {
                break;
            };
            let ticket = head.ticket;
            let Slot::Ready(clip) = &head.slot else {
                debug!(%ticket, "Head clip still pending");
                break;
            };

            match self.sink.play(clip) {
                Ok(()) => {
                    debug!(%ticket, "Clip playback started");
                    self.active = Some(ticket);
                    self.events.emit(SessionEvent::PlaybackStarted {
                        ticket,
                        timestamp: Timestamp::now(),
                    });
                }
                Err(e) => {
                    warn!(%ticket, error = %e, "Sink refused clip");
                    self.queue.pop_front();
                    self.notify_failure();
                    self.emit_ended(ticket, true);
                    slot_ended = true;
                }
            }
        }
        if slot_ended && self.active.is_none() && self.queue.is_empty() {
            self.emit_idle();
        }
    }

    fn emit_ended(&self, ticket: ClipTicket, failed: bool) {
        self.events.emit(SessionEvent::PlaybackEnded {
            ticket,
            failed,
            timestamp: Timestamp::now(),
        });
    }

    fn emit_idle(&self) {
        self.events.emit(SessionEvent::PlaybackIdle {
            timestamp: Timestamp::now(),
        });
    }

    fn notify_failure(&self) {
        self.events.notify(Notification::new(
            NotificationKind::PlaybackFailure,
            "Playback Error",
            "Could not play the audio response.",
        ));
    }
}
