use super::*;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

/// A virtual sensor that logs every byte written to it and can be told to
/// echo a `0x5F` register-read response for the next read command.
struct VirtualSensor {
    log: Vec<u8>,
    to_read: VecDeque<u8>,
    echo_reads: bool,
}

impl VirtualSensor {
    fn new(echo_reads: bool) -> Self {
        Self {
            log: Vec::new(),
            to_read: VecDeque::new(),
            echo_reads,
        }
    }
}

fn register_response_packet(r1: i16, r2: i16, r3: i16, r4: i16) -> Vec<u8> {
    use crate::protocol::checksum;
    let mut bytes = vec![0x55, 0x5F];
    bytes.extend_from_slice(&r1.to_le_bytes());
    bytes.extend_from_slice(&r2.to_le_bytes());
    bytes.extend_from_slice(&r3.to_le_bytes());
    bytes.extend_from_slice(&r4.to_le_bytes());
    let cs = checksum(&bytes);
    bytes.push(cs);
    bytes
}

impl Write for VirtualSensor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.extend_from_slice(buf);
        if self.echo_reads && buf.len() == 5 && buf[0] == 0xFF && buf[1] == 0xAA && buf[2] == 0x27
        {
            self.to_read
                .extend(register_response_packet(0x001E, 0x0006, 0x0002, 0));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for VirtualSensor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.to_read.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.to_read.pop_front().unwrap();
        }
        Ok(n)
    }
}

fn test_cfg() -> ConfigProtocolConfig {
    ConfigProtocolConfig {
        read_timeout: Duration::from_millis(50),
        write_retries: 3,
        unlock_settle: Duration::from_millis(0),
        save_settle: Duration::from_millis(0),
        restart_settle: Duration::from_millis(0),
        factory_reset_settle: Duration::from_millis(0),
    }
}

#[test]
fn write_register_produces_the_5_byte_command() {
    let sensor = VirtualSensor::new(false);
    let mut proto = ConfigProtocol::new(sensor, test_cfg());
    proto.write_register(register::KEY, UNLOCK_KEY).unwrap();
    assert_eq!(proto.into_inner().log, vec![0xFF, 0xAA, 0x69, 0x88, 0xB5]);
}

#[test]
fn read_register_returns_none_on_timeout() {
    let sensor = VirtualSensor::new(false);
    let mut proto = ConfigProtocol::new(sensor, test_cfg());
    assert_eq!(proto.read_register(register::RSW).unwrap(), None);
}

#[test]
fn read_register_returns_first_value_when_echoed() {
    let sensor = VirtualSensor::new(true);
    let mut proto = ConfigProtocol::new(sensor, test_cfg());
    let value = proto.read_register(register::RSW).unwrap();
    assert_eq!(value, Some(0x001E));
}

#[test]
fn verify_factory_reset_state_matches_expected_defaults() {
    let sensor = VirtualSensor::new(true);
    let mut proto = ConfigProtocol::new(sensor, test_cfg());
    assert!(proto.verify_factory_reset_state().unwrap());
}

#[test]
fn factory_reset_byte_sequence() {
    let sensor = VirtualSensor::new(false);
    let mut proto = ConfigProtocol::new(sensor, test_cfg());
    proto.factory_reset().unwrap();
    let log = proto.into_inner().log;
    assert_eq!(&log[0..5], &[0xFF, 0xAA, 0x69, 0x88, 0xB5]);
    assert_eq!(&log[5..10], &[0xFF, 0xAA, 0x00, 0x01, 0x00]);
    assert_eq!(&log[10..15], &[0xFF, 0xAA, 0x00, 0x00, 0x00]);
    assert_eq!(&log[15..20], &[0xFF, 0xAA, 0x00, 0xFF, 0x00]);
}

#[test]
fn rate_and_baud_code_tables() {
    assert_eq!(rate_code(10.0), Some(6));
    assert_eq!(rate_code(200.0), Some(11));
    assert_eq!(baud_code(9600), Some(2));
    assert_eq!(baud_code(115200), Some(6));
}
