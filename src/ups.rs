use embedded_hal::delay::DelayNs;
use fugit::MillisDurationU32;
use tracing::{debug, warn};

use crate::{
    command::{CommandKind, build_command},
    error::{Error, Result},
    response::{DeviceInfo, RawResponseFrame, decode, decode_analog_fields},
    session::{POLL_INTERVAL, Session},
    snapshot::StatusSnapshot,
    validate::validate,
};

/// Timing and retry behaviour of [`Ups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Implausible replies tolerated before a status query is abandoned.
    ///
    /// The default of 2 gives three attempts in total.
    pub max_failed_attempts: u8,
    /// Pause after an implausible reply before asking again.
    pub retry_delay: MillisDurationU32,
    /// Pause before each read attempt while a reply is coming in.
    pub poll_interval: MillisDurationU32,
    /// Read attempts allowed per reply. `None` waits forever.
    pub poll_limit: Option<u32>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 2,
            retry_delay: MillisDurationU32::millis(250),
            poll_interval: POLL_INTERVAL,
            poll_limit: None,
        }
    }
}

/// You can create a Ups using any interface which implements [embedded_io::Read] & [embedded_io::Write],
/// plus a [`DelayNs`] used to pace the polling.
///
/// The interface must already be configured for raw 8N1 at the device baud rate (2400 on the
/// units tested). The `Ups` owns it exclusively; there is never more than one command in flight.
pub struct Ups<S: embedded_io::Read + embedded_io::Write, D: DelayNs> {
    session: Session<S, D>,
    config: QueryConfig,
}

impl<S: embedded_io::Read + embedded_io::Write, D: DelayNs> Ups<S, D> {
    pub fn new(interface: S, delay: D) -> Self {
        Self::with_config(interface, delay, QueryConfig::default())
    }

    pub fn with_config(interface: S, delay: D, config: QueryConfig) -> Self {
        let session = Session::new(interface, delay)
            .with_poll_interval(config.poll_interval)
            .with_poll_limit(config.poll_limit);
        Self { session, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Start a 10 second battery test.
    pub fn start_test(&mut self) -> Result<(), S::Error> {
        self.session.send(build_command(CommandKind::StartTest))
    }

    /// Interrupt a running battery test.
    pub fn abort_test(&mut self) -> Result<(), S::Error> {
        self.session.send(build_command(CommandKind::AbortTest))
    }

    /// Toggle the buzzer. The device does not report which state it ended up in,
    /// check [`StatusSnapshot::beeper_on`] afterwards.
    pub fn switch_buzzer(&mut self) -> Result<(), S::Error> {
        self.session.send(build_command(CommandKind::SwitchBuzzer))
    }

    /// Send any known command and, if the device answers it, return the raw reply.
    pub fn command(&mut self, kind: CommandKind) -> Result<Option<RawResponseFrame>, S::Error> {
        self.session.send(build_command(kind))?;
        if kind.expects_reply() {
            self.session.receive_response().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read the model name and firmware version. Not retried.
    pub fn query_device_info(&mut self) -> Result<DeviceInfo, S::Error> {
        self.session.send(build_command(CommandKind::DeviceInfo))?;
        let raw = self.session.receive_response()?;
        DeviceInfo::decode(&raw).ok_or(Error::InvalidResponse)
    }

    /// Read the current UPS state.
    ///
    /// The reply is only trusted if it starts with the status marker and every
    /// reading is inside its [`ValueRange`](crate::validate::ValueRange). Otherwise
    /// the query is repeated after [`QueryConfig::retry_delay`], up to
    /// [`QueryConfig::max_failed_attempts`] times. Transport errors are not retried.
    pub fn query_status(&mut self) -> Result<StatusSnapshot, S::Error> {
        let max_failed_attempts = u16::from(self.config.max_failed_attempts);
        let mut failed_attempts: u16 = 0;

        loop {
            self.session.send(build_command(CommandKind::QueryStatus))?;
            let raw = self.session.receive_response()?;

            let out_of_range = validate(&decode_analog_fields(&raw));
            if !raw.has_status_marker() {
                warn!(marker = raw.marker(), "status reply has wrong marker");
            } else if out_of_range == 0 {
                debug!(failed_attempts, "status reply accepted");
                return Ok(decode(&raw));
            } else {
                warn!(out_of_range, "status reply has implausible values");
            }

            failed_attempts += 1;
            if failed_attempts > max_failed_attempts {
                return Err(Error::ValidationExhausted {
                    attempts: failed_attempts,
                    out_of_range,
                });
            }
            self.session.pause(self.config.retry_delay);
            // A rejected reply may have been misaligned; realign on the next query.
            self.session.discard_pending()?;
        }
    }

    /// Hand back the interface and delay.
    pub fn release(self) -> (S, D) {
        self.session.release()
    }
}
