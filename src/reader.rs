//! Iterator adapter over any [`std::io::Read`], feeding bytes through a
//! [`PacketFramer`] and yielding validated packets one at a time. Includes a
//! drain-before-read optimization: once the framer's internal buffer holds
//! enough to keep producing packets, the reader keeps draining it instead
//! of issuing more reads.

use crate::framer::{FrameEvent, PacketFramer, ValidatedPacket};
use std::io::{self, Read};

const READ_CHUNK: usize = 4096;

pub struct PacketReader<R: Read> {
    reader: R,
    framer: PacketFramer,
    scratch: [u8; READ_CHUNK],
    drain_internal: bool,
}

impl<R: Read> PacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: PacketFramer::new(),
            scratch: [0u8; READ_CHUNK],
            drain_internal: false,
        }
    }

    pub fn framer(&self) -> &PacketFramer {
        &self.framer
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for PacketReader<R> {
    type Item = io::Result<ValidatedPacket>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.drain_internal || self.framer.buffered_len() >= 11 {
                match self.framer.next_packet() {
                    Some(FrameEvent::Packet(p)) => {
                        self.drain_internal = self.framer.buffered_len() >= 11;
                        return Some(Ok(p));
                    }
                    Some(FrameEvent::Drop(_)) => continue,
                    None => self.drain_internal = false,
                }
            }

            match self.reader.read(&mut self.scratch) {
                Ok(0) => return None,
                Ok(n) => {
                    self.framer.push_bytes(&self.scratch[..n]);
                    self.drain_internal = true;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
                {
                    // No data within this read's timeout: yield control back
                    // to the caller rather than spinning.
                    return None;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_sequential_packets_from_a_byte_slice() {
        use crate::protocol::checksum;

        let mut stream = Vec::new();
        for val in [1i16, 2, 3] {
            let mut pkt = vec![0x55, 0x51];
            pkt.extend_from_slice(&val.to_le_bytes());
            pkt.extend_from_slice(&0i16.to_le_bytes());
            pkt.extend_from_slice(&0i16.to_le_bytes());
            pkt.extend_from_slice(&2500i16.to_le_bytes());
            let cs = checksum(&pkt);
            pkt.push(cs);
            stream.extend_from_slice(&pkt);
        }

        let cursor = io::Cursor::new(stream);
        let reader = PacketReader::new(cursor);
        let packets: Vec<_> = reader.collect::<io::Result<Vec<_>>>().unwrap();
        assert_eq!(packets.len(), 3);
        assert!(packets.iter().all(|p| p.type_byte == 0x51));
    }

    #[test]
    fn empty_input_yields_no_packets() {
        let cursor = io::Cursor::new(Vec::<u8>::new());
        let reader = PacketReader::new(cursor);
        assert_eq!(reader.count(), 0);
    }
}
