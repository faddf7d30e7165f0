//! This module defines the fixed command frames understood by the SMS nobreaks.
//!
//! Every command is exactly 7 bytes: an ASCII opcode, four parameter bytes, a
//! checksum byte and the `0x0D` terminator. The device accepts nothing else, so
//! frames are constants rather than built at runtime.

use strum_macros::{EnumCount, EnumIter};

/// Length of every outbound frame.
pub const COMMAND_LEN: usize = 7;
/// Final byte of every outbound frame.
pub const COMMAND_TERMINATOR: u8 = 0x0D;

/// All commands known to work with the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, EnumCount)]
pub enum CommandKind {
    /// __D__ - Interrupt the battery test. No reply.
    AbortTest,
    /// __F__ - Replies with `;` followed by spaces. Meaning unknown.
    UnknownF,
    /// __G__ - Sent by the vendor software at startup. No reply.
    UnknownG,
    /// __I__ - Replies with the model name and firmware version.
    DeviceInfo,
    /// __M__ - Toggle the buzzer on/off. No reply.
    SwitchBuzzer,
    /// __Q__ - Replies with the 18 byte status frame.
    QueryStatus,
    /// __T__ - Test the battery for 10 seconds. No reply.
    StartTest,
}

impl CommandKind {
    /// The frame transmitted for this command.
    pub const fn frame(self) -> CommandFrame {
        match self {
            CommandKind::AbortTest => CommandFrame([b'D', 0xFF, 0xFF, 0xFF, 0xFF, 0xC0, 0x0D]),
            CommandKind::UnknownF => CommandFrame([b'F', 0xFF, 0xFF, 0xFF, 0xFF, 0xBE, 0x0D]),
            CommandKind::UnknownG => CommandFrame([b'G', 0x01, 0xFF, 0xFF, 0xFF, 0xBB, 0x0D]),
            CommandKind::DeviceInfo => CommandFrame([b'I', 0xFF, 0xFF, 0xFF, 0xFF, 0xBB, 0x0D]),
            CommandKind::SwitchBuzzer => CommandFrame([b'M', 0xFF, 0xFF, 0xFF, 0xFF, 0xB7, 0x0D]),
            CommandKind::QueryStatus => CommandFrame([b'Q', 0xFF, 0xFF, 0xFF, 0xFF, 0xB3, 0x0D]),
            CommandKind::StartTest => CommandFrame([b'T', 0x00, 0x10, 0x00, 0x00, 0x9C, 0x0D]),
        }
    }

    /// Whether the device sends an 18 byte frame back for this command.
    pub const fn expects_reply(self) -> bool {
        matches!(
            self,
            CommandKind::UnknownF | CommandKind::DeviceInfo | CommandKind::QueryStatus
        )
    }
}

/// A complete outbound frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandFrame([u8; COMMAND_LEN]);

impl CommandFrame {
    pub const fn opcode(&self) -> u8 {
        self.0[0]
    }

    /// Checksum byte. The device computes it, we only ever replay known values.
    pub const fn checksum(&self) -> u8 {
        self.0[5]
    }

    pub const fn as_bytes(&self) -> &[u8; COMMAND_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Select the fixed frame for `kind`.
pub const fn build_command(kind: CommandKind) -> CommandFrame {
    kind.frame()
}
