//! Byte level exchange with the UPS.
//!
//! The serial link is polled: the device trickles its 18 byte reply in over
//! several reads, so [`Session::receive_fixed`] keeps reading, with a short
//! sleep before each attempt, until the whole frame is in.

use embedded_hal::delay::DelayNs;
use embedded_io::Error as _;
use fugit::MillisDurationU32;
use tracing::{debug, trace};

use crate::{
    command::CommandFrame,
    error::{Error, Result},
    response::{RESPONSE_LEN, RawResponseFrame},
};

/// Sleep before each read attempt.
pub const POLL_INTERVAL: MillisDurationU32 = MillisDurationU32::millis(15);
/// Upper bound on reads spent discarding stale input, for a line that never goes quiet.
const DISCARD_READ_LIMIT: usize = 16;

/// You can create a session over any interface which implements [embedded_io::Read] & [embedded_io::Write].
///
/// A read that returns no bytes, or fails with [`embedded_io::ErrorKind::TimedOut`], means
/// nothing has arrived yet. Any other read error is fatal.
pub struct Session<S: embedded_io::Read + embedded_io::Write, D: DelayNs> {
    interface: S,
    delay: D,
    poll_interval: MillisDurationU32,
    /// Give up after this many read attempts. `None` waits forever.
    poll_limit: Option<u32>,
}

impl<S: embedded_io::Read + embedded_io::Write, D: DelayNs> Session<S, D> {
    pub fn new(interface: S, delay: D) -> Self {
        Self {
            interface,
            delay,
            poll_interval: POLL_INTERVAL,
            poll_limit: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: MillisDurationU32) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound [`Session::receive_fixed`] to `limit` read attempts.
    pub fn with_poll_limit(mut self, limit: Option<u32>) -> Self {
        self.poll_limit = limit;
        self
    }

    /// Write the frame as-is. Control commands get no reply, so nothing is read back.
    pub fn send(&mut self, frame: CommandFrame) -> Result<(), S::Error> {
        debug!("tx {:02X?}", frame.as_bytes());
        self.interface
            .write_all(frame.as_bytes())
            .map_err(Error::Transport)?;
        self.interface.flush().map_err(Error::Transport)
    }

    /// Accumulate exactly `N` bytes from the interface.
    ///
    /// __Note:__ without a poll limit this blocks until the bytes arrive or the
    /// interface reports an error.
    pub fn receive_fixed<const N: usize>(&mut self) -> Result<[u8; N], S::Error> {
        let mut buff = [0u8; N];
        let mut filled = 0;
        let mut polls: u32 = 0;

        while filled < N {
            if self.poll_limit.is_some_and(|limit| polls >= limit) {
                debug!(polls, filled, "gave up waiting for reply");
                return Err(Error::Timeout { polls });
            }
            self.delay.delay_ms(self.poll_interval.to_millis());
            polls += 1;

            match self.interface.read(&mut buff[filled..]) {
                Ok(bytes_read) => {
                    filled += bytes_read;
                    trace!(bytes_read, filled, "partial read");
                }
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => {}
                Err(e) => return Err(Error::Transport(e)),
            }
        }

        Ok(buff)
    }

    /// Read and drop whatever is already waiting on the line, until a read comes back empty.
    ///
    /// Returns the number of bytes dropped.
    pub fn discard_pending(&mut self) -> Result<usize, S::Error> {
        let mut scratch = [0u8; 64];
        let mut discarded = 0;

        for _ in 0..DISCARD_READ_LIMIT {
            match self.interface.read(&mut scratch) {
                Ok(0) => break,
                Ok(bytes_read) => discarded += bytes_read,
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => break,
                Err(e) => return Err(Error::Transport(e)),
            }
        }

        if discarded > 0 {
            debug!(discarded, "dropped stale bytes");
        }
        Ok(discarded)
    }

    /// Receive one 18 byte reply.
    pub fn receive_response(&mut self) -> Result<RawResponseFrame, S::Error> {
        let bytes = self.receive_fixed::<RESPONSE_LEN>()?;
        debug!("rx {:02X?}", bytes);
        Ok(RawResponseFrame::new(bytes))
    }

    pub fn pause(&mut self, duration: MillisDurationU32) {
        self.delay.delay_ms(duration.to_millis());
    }

    /// Hand back the interface and delay.
    pub fn release(self) -> (S, D) {
        (self.interface, self.delay)
    }
}
