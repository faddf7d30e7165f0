//! We use this mocking module in unit tests to emulate the UPS serial port.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::response::RESPONSE_LEN;

/// Status reply captured from a real unit: 210 V in, 108 V out, 29 %, 60 Hz,
/// battery 100 %, 38 C, beeper on, UPS OK, on AC power.
pub const CAPTURE: [u8; RESPONSE_LEN] = [
    0x3D, 0x08, 0x34, 0x08, 0x34, 0x04, 0x38, 0x01, 0x22, 0x02, 0x58, 0x03, 0xE8, 0x01, 0x7C,
    0x29, 0x01, 0x0D,
];

/// What the next call to `read()` does.
enum ReadStep {
    /// Hand out these bytes, possibly over several reads.
    Data(heapless::Vec<u8, 64>),
    /// Nothing arrived before the port timeout.
    Idle,
    /// Hard I/O failure.
    Fail,
}

/// Our mock type used to emulate a serial port.
///
/// Bytes queued with [`MockSerial::queue_read`] are on the line straight away. Replies
/// queued with [`MockSerial::queue_reply`] only become readable once a command has been
/// written and flushed, one reply per command, like the real device.
pub struct MockSerial {
    /// Buffer to store data written to the mock serial port
    write_buffer: heapless::Vec<u8, 2048>,
    /// Scripted outcomes for successive reads
    reads: heapless::Deque<ReadStep, 32>,
    /// Read steps released by each flushed command
    replies: heapless::Deque<heapless::Vec<ReadStep, 2>, 32>,
    /// Sent for every command once `replies` runs out
    repeated_reply: Option<heapless::Vec<u8, 64>>,
    /// Number of times read() was called
    read_calls: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Simulated timeout error
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
}

impl fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        if let Some(steps) = self.replies.pop_front() {
            for step in steps {
                self.push(step);
            }
        } else if let Some(reply) = self.repeated_reply.clone() {
            self.push(ReadStep::Data(reply));
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_calls += 1;
        match self.reads.pop_front() {
            Some(ReadStep::Data(chunk)) => {
                let n = core::cmp::min(buf.len(), chunk.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = heapless::Vec::from_slice(&chunk[n..])
                        .map_err(|_| MockSerialError::BufferOverflow)?;
                    let _ = self.reads.push_front(ReadStep::Data(rest));
                }
                Ok(n)
            }
            Some(ReadStep::Fail) => Err(MockSerialError::SimulatedError),
            Some(ReadStep::Idle) | None => Err(MockSerialError::Timeout),
        }
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with nothing scripted
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            reads: heapless::Deque::new(),
            replies: heapless::Deque::new(),
            repeated_reply: None,
            read_calls: 0,
            should_error_on_write: false,
        }
    }

    /// Queue bytes to be returned by the next read(s)
    pub fn queue_read(&mut self, data: &[u8]) {
        self.push(ReadStep::Data(chunk(data)));
    }

    /// Queue the answer to the next command sent
    pub fn queue_reply(&mut self, data: &[u8]) {
        let mut steps = heapless::Vec::new();
        let _ = steps.push(ReadStep::Data(chunk(data)));
        self.push_reply(steps);
    }

    /// Queue an answer to the next command that breaks off with a read error
    pub fn queue_broken_reply(&mut self, data: &[u8]) {
        let mut steps = heapless::Vec::new();
        let _ = steps.push(ReadStep::Data(chunk(data)));
        let _ = steps.push(ReadStep::Fail);
        self.push_reply(steps);
    }

    /// Answer every command with `data` once the queued replies are used up
    pub fn always_reply(&mut self, data: &[u8]) {
        self.repeated_reply = Some(chunk(data));
    }

    fn push_reply(&mut self, steps: heapless::Vec<ReadStep, 2>) {
        if self.replies.push_back(steps).is_err() {
            panic!("too many scripted replies");
        }
    }

    /// Queue one read that times out with no data
    pub fn queue_idle(&mut self) {
        self.push(ReadStep::Idle);
    }

    /// Queue one read that fails
    pub fn queue_failure(&mut self) {
        self.push(ReadStep::Fail);
    }

    fn push(&mut self, step: ReadStep) {
        if self.reads.push_back(step).is_err() {
            panic!("too many scripted reads");
        }
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }
}

impl Default for MockSerial {
    fn default() -> Self {
        Self::new()
    }
}

fn chunk(data: &[u8]) -> heapless::Vec<u8, 64> {
    heapless::Vec::from_slice(data).expect("chunk too large for mock")
}

/// Records requested sleeps, in milliseconds, instead of sleeping.
pub struct RecordingDelay {
    calls: heapless::Vec<u32, 1024>,
}

impl Default for RecordingDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self {
            calls: heapless::Vec::new(),
        }
    }

    pub fn calls(&self) -> &[u32] {
        &self.calls
    }
}

impl DelayNs for RecordingDelay {
    /// Rounded up to whole milliseconds, so a short sleep still shows up as one call.
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns.div_ceil(1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms).expect("too many delays recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        mock.write(b"Q").unwrap();
        mock.write(&[0xFF, 0x0D]).unwrap();
        assert_eq!(mock.written_data(), &[b'Q', 0xFF, 0x0D]);
    }

    #[test]
    fn test_write_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(mock.write(b"test"), Err(MockSerialError::SimulatedError)));
        assert!(matches!(mock.flush(), Err(MockSerialError::SimulatedError)));
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_chunk_split_across_reads() {
        let mut mock = MockSerial::new();
        mock.queue_read(b"Hello World");

        let mut buffer1 = [0u8; 5];
        let mut buffer2 = [0u8; 6];
        assert_eq!(mock.read(&mut buffer1).unwrap(), 5);
        assert_eq!(mock.read(&mut buffer2).unwrap(), 6);
        assert_eq!(&buffer1, b"Hello");
        assert_eq!(&buffer2, b" World");
    }

    #[test]
    fn test_scripted_outcomes_in_order() {
        let mut mock = MockSerial::new();
        mock.queue_idle();
        mock.queue_read(b"ab");
        mock.queue_failure();

        let mut buffer = [0u8; 4];
        assert_eq!(mock.read(&mut buffer).unwrap_err().kind(), embedded_io::ErrorKind::TimedOut);
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert_eq!(mock.read(&mut buffer).unwrap_err().kind(), embedded_io::ErrorKind::Other);
        // Exhausted script behaves like a silent line.
        assert_eq!(mock.read(&mut buffer).unwrap_err().kind(), embedded_io::ErrorKind::TimedOut);
        assert_eq!(mock.read_calls(), 4);
    }

    #[test]
    fn test_recording_delay() {
        let mut delay = RecordingDelay::default();
        delay.delay_ms(15);
        delay.delay_us(250_000);
        delay.delay_us(500);
        assert_eq!(delay.calls(), &[15, 250, 1]);
    }

    #[test]
    fn test_replies_released_per_command() {
        let mut mock = MockSerial::default();
        mock.queue_reply(b"one");
        mock.queue_broken_reply(b"tw");
        mock.always_reply(b"again");

        let mut buffer = [0u8; 8];
        // Nothing on the line before a command is sent.
        assert_eq!(mock.read(&mut buffer).unwrap_err().kind(), embedded_io::ErrorKind::TimedOut);

        mock.write(b"Q").unwrap();
        mock.flush().unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[..3], b"one");

        mock.flush().unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert_eq!(mock.read(&mut buffer).unwrap_err().kind(), embedded_io::ErrorKind::Other);

        for _ in 0..2 {
            mock.flush().unwrap();
            assert_eq!(mock.read(&mut buffer).unwrap(), 5);
            assert_eq!(&buffer[..5], b"again");
        }
    }
}
