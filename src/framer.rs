//! Byte-stream to packet-stream converter: an internal buffer, `push_bytes`
//! to extend it, `next_packet` to pull validated packets out of it one at a
//! time, tolerating misaligned or corrupted data by discarding and
//! resynchronizing a byte at a time.

use crate::packet::{self, RawPacket};
use crate::protocol::{self, DATA_HEADER, DATA_PACKET_LEN};
use tracing::{debug, trace, warn};

/// Above this many consecutively-discarded bytes, the framer reports a
/// [`DropEvent::SuspectedBaudrateMismatch`] instead of silently resyncing.
const DISCARD_REPORT_THRESHOLD: usize = 50;

/// Upper bound on how large the internal buffer is allowed to grow before
/// the framer starts dropping the oldest bytes.
const MAX_BUFFER_LEN: usize = 4096;

/// An 11-byte packet that has passed the checksum invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPacket {
    pub type_byte: u8,
    pub payload: [u8; 8],
}

/// Informational, non-fatal observation emitted while resynchronizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEvent {
    SuspectedBaudrateMismatch { discarded: usize },
}

/// A single call to [`PacketFramer::next_packet`] either yields a packet
/// or reports a drop observation — never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    Packet(ValidatedPacket),
    Drop(DropEvent),
}

#[derive(Debug, Default)]
pub struct PacketFramer {
    buf: Vec<u8>,
    discard_run: usize,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_BUFFER_LEN {
            let overflow = self.buf.len() - MAX_BUFFER_LEN;
            warn!(overflow, "framer buffer exceeded cap, discarding oldest bytes");
            self.buf.drain(..overflow);
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Extract at most one validated packet, or report a resync
    /// observation. Returns `None` when there isn't enough buffered data
    /// to make progress.
    pub fn next_packet(&mut self) -> Option<FrameEvent> {
        loop {
            if self.buf.len() < DATA_PACKET_LEN {
                return None;
            }

            let header_pos = self.buf.iter().position(|&b| b == DATA_HEADER);
            let Some(pos) = header_pos else {
                let discarded = self.buf.len();
                self.buf.clear();
                return self.report_or_continue(discarded, false);
            };

            if pos > 0 {
                self.buf.drain(..pos);
                if let Some(event) = self.report_or_continue(pos, true) {
                    return Some(event);
                }
                continue;
            }

            if self.buf.len() < DATA_PACKET_LEN {
                return None;
            }

            if protocol::is_valid_data_packet(&self.buf[..DATA_PACKET_LEN]) {
                self.discard_run = 0;
                let type_byte = self.buf[1];
                let mut payload = [0u8; 8];
                payload.copy_from_slice(&self.buf[2..DATA_PACKET_LEN - 1]);
                self.buf.drain(..DATA_PACKET_LEN);
                trace!(type_byte, "framed packet");
                return Some(FrameEvent::Packet(ValidatedPacket { type_byte, payload }));
            } else {
                self.buf.drain(..1);
                if let Some(event) = self.report_or_continue(1, true) {
                    return Some(event);
                }
                continue;
            }
        }
    }

    /// Accumulate `just_discarded` bytes into the running discard count. If
    /// `keep_looping` and the threshold isn't exceeded, returns `None` so
    /// the caller keeps resyncing; otherwise returns the drop event to
    /// surface to the caller (resetting the run either way).
    fn report_or_continue(&mut self, just_discarded: usize, keep_looping: bool) -> Option<FrameEvent> {
        self.discard_run += just_discarded;
        if self.discard_run > DISCARD_REPORT_THRESHOLD {
            let discarded = self.discard_run;
            self.discard_run = 0;
            debug!(discarded, "suspected baudrate mismatch");
            return Some(FrameEvent::Drop(DropEvent::SuspectedBaudrateMismatch { discarded }));
        }
        if keep_looping {
            None
        } else {
            self.discard_run = 0;
            None
        }
    }

    /// Decode a validated packet's payload into its typed fields. Unknown
    /// types and under-length payloads are reported as `Error::Decode`,
    /// never panics.
    pub fn decode(packet: ValidatedPacket) -> crate::error::Result<RawPacket> {
        packet::decode_payload(packet.type_byte, &packet.payload)
    }
}

#[cfg(test)]
#[path = "tests/framer.rs"]
mod framer_tests;
