//! Our error types for the SMS nobreak protocol.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Failures surfaced while talking to the UPS.
///
/// `Transport` and `Timeout` mean the link is bad (the device is not
/// responding), while `ValidationExhausted` means the device answered but the
/// data never looked physically plausible.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Device not responding: serial transport error ({0:?})")]
    Transport(I),
    #[error("Device not responding: no complete frame after {polls} reads")]
    Timeout { polls: u32 },
    /// `out_of_range` counts the readings rejected in the last reply. It is 0 when
    /// that reply was rejected for its marker byte alone.
    #[error(
        "Device responding but values implausible after {attempts} attempts ({out_of_range} readings out of range on the last)"
    )]
    ValidationExhausted { attempts: u16, out_of_range: usize },
    #[error("Invalid response received")]
    InvalidResponse,
}

impl<I: embedded_io::Error> Error<I> {
    /// `true` when the failure came from the serial link rather than the data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout { .. })
    }
}
