//! Decoding of the fixed 18 byte frames the UPS sends back.
//!
//! Status frame layout (reply to `Q`):
//!
//! | offset | content |
//! |---|---|
//! | 0 | marker `=` (`0x3D`) |
//! | 1..=14 | seven analog readings, two bytes each, big-endian, tenths |
//! | 15 | state bits, see [`StatusBits`] |
//! | 16 | unknown |
//! | 17 | terminator `0x0D` |

use modular_bitfield::prelude::*;
use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

use crate::snapshot::StatusSnapshot;

/// Length of every reply frame.
pub const RESPONSE_LEN: usize = 18;
/// First byte of a status reply.
pub const STATUS_MARKER: u8 = 0x3D;
/// First byte of a device info reply.
pub const INFO_MARKER: u8 = b':';
/// Last byte of every reply.
pub const RESPONSE_TERMINATOR: u8 = 0x0D;

const FLAGS_OFFSET: usize = 15;

/// The seven analog readings, in frame order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, EnumCount, IntoStaticStr)]
pub enum AnalogField {
    #[strum(serialize = "Last Input(Vac)")]
    LastInputVoltage,
    #[strum(serialize = "Input(Vac)")]
    InputVoltage,
    #[strum(serialize = "Output(Vac)")]
    OutputVoltage,
    #[strum(serialize = "Output Power(%)")]
    OutputPower,
    #[strum(serialize = "Output(Hz)")]
    OutputFrequency,
    #[strum(serialize = "Battery level(%)")]
    BatteryLevel,
    #[strum(serialize = "Temperature(C)")]
    Temperature,
}

pub const ANALOG_FIELDS: usize = 7;

impl AnalogField {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Offsets of the high and low byte of this field.
    pub const fn offsets(self) -> (usize, usize) {
        let i = self.index();
        (2 * i + 1, 2 * i + 2)
    }
}

/// "State bits" byte at offset 15, least significant bit first.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBits {
    pub beeper_on: bool,
    pub shutdown_active: bool,
    pub test_active: bool,
    pub ups_ok: bool,
    pub boost_active: bool,
    pub on_ac_power: bool,
    pub low_battery: bool,
    pub on_battery: bool,
}

impl StatusBits {
    pub fn as_array(&self) -> [bool; 8] {
        [
            self.beeper_on(),
            self.shutdown_active(),
            self.test_active(),
            self.ups_ok(),
            self.boost_active(),
            self.on_ac_power(),
            self.low_battery(),
            self.on_battery(),
        ]
    }
}

/// Exactly the bytes read for one reply. Only lives between receive and decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawResponseFrame([u8; RESPONSE_LEN]);

impl RawResponseFrame {
    pub const fn new(bytes: [u8; RESPONSE_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; RESPONSE_LEN] {
        &self.0
    }

    pub const fn marker(&self) -> u8 {
        self.0[0]
    }

    pub const fn has_status_marker(&self) -> bool {
        self.marker() == STATUS_MARKER
    }
}

impl From<[u8; RESPONSE_LEN]> for RawResponseFrame {
    fn from(bytes: [u8; RESPONSE_LEN]) -> Self {
        Self(bytes)
    }
}

/// Decode one analog reading.
///
/// The firmware sends the value as two bytes that, printed as `0x{hi:02x}{lo:02x}`
/// and parsed as hex, give the reading in tenths.
pub fn decode_analog(raw: &RawResponseFrame, field: AnalogField) -> f32 {
    let (hi, lo) = field.offsets();
    let tenths = u16::from_be_bytes([raw.0[hi], raw.0[lo]]);
    f32::from(tenths) / 10.0
}

pub fn decode_analog_fields(raw: &RawResponseFrame) -> [f32; ANALOG_FIELDS] {
    use AnalogField as AF;
    [
        decode_analog(raw, AF::LastInputVoltage),
        decode_analog(raw, AF::InputVoltage),
        decode_analog(raw, AF::OutputVoltage),
        decode_analog(raw, AF::OutputPower),
        decode_analog(raw, AF::OutputFrequency),
        decode_analog(raw, AF::BatteryLevel),
        decode_analog(raw, AF::Temperature),
    ]
}

pub fn decode_status_bits(raw: &RawResponseFrame) -> StatusBits {
    StatusBits::from_bytes([raw.0[FLAGS_OFFSET]])
}

/// Flags in order: beeper, shutdown, test, UPS OK, boost, AC power, low battery, on battery.
pub fn decode_flags(raw: &RawResponseFrame) -> [bool; 8] {
    decode_status_bits(raw).as_array()
}

pub fn decode(raw: &RawResponseFrame) -> StatusSnapshot {
    StatusSnapshot::from_parts(decode_analog_fields(raw), decode_status_bits(raw))
}

/// Reply to the `I` command, e.g. `:SENOIDAL    7.0b\r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: heapless::String<12>,
    pub firmware: heapless::String<4>,
}

impl DeviceInfo {
    /// Returns `None` if the marker is wrong or the text is not printable ASCII.
    pub fn decode(raw: &RawResponseFrame) -> Option<Self> {
        if raw.marker() != INFO_MARKER {
            return None;
        }
        Some(Self {
            model: ascii_field(&raw.0[1..13])?,
            firmware: ascii_field(&raw.0[13..17])?,
        })
    }
}

fn ascii_field<const N: usize>(bytes: &[u8]) -> Option<heapless::String<N>> {
    if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        return None;
    }
    let text = core::str::from_utf8(bytes).ok()?.trim_end();
    heapless::String::try_from(text).ok()
}
