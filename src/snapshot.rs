//! Decoded telemetry handed to the caller after a successful status query.

use core::fmt;

use crate::response::{ANALOG_FIELDS, AnalogField, StatusBits};

/// One trusted reading of the UPS state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// Volts AC. Not meaningful on the units tested, so it is not printed.
    pub last_input_voltage: f32,
    /// Volts AC.
    pub input_voltage: f32,
    /// Volts AC.
    pub output_voltage: f32,
    /// Percent of rated load.
    pub output_power: f32,
    /// Hertz.
    pub output_frequency: f32,
    /// Percent.
    pub battery_level: f32,
    /// Degrees Celsius.
    pub temperature_c: f32,

    pub beeper_on: bool,
    pub shutdown_active: bool,
    pub test_active: bool,
    pub ups_ok: bool,
    pub boost_active: bool,
    pub on_ac_power: bool,
    pub low_battery: bool,
    pub on_battery: bool,
}

/// Flag labels in bit order.
const FLAG_LABELS: [&str; 8] = [
    "Beep on",
    "Active shutdown",
    "Active test",
    "UPS OK",
    "Boost ON",
    "On AC Power",
    "Low battery",
    "On battery power",
];

impl StatusSnapshot {
    pub(crate) fn from_parts(analog: [f32; ANALOG_FIELDS], bits: StatusBits) -> Self {
        use AnalogField as AF;
        Self {
            last_input_voltage: analog[AF::LastInputVoltage.index()],
            input_voltage: analog[AF::InputVoltage.index()],
            output_voltage: analog[AF::OutputVoltage.index()],
            output_power: analog[AF::OutputPower.index()],
            output_frequency: analog[AF::OutputFrequency.index()],
            battery_level: analog[AF::BatteryLevel.index()],
            temperature_c: analog[AF::Temperature.index()],
            beeper_on: bits.beeper_on(),
            shutdown_active: bits.shutdown_active(),
            test_active: bits.test_active(),
            ups_ok: bits.ups_ok(),
            boost_active: bits.boost_active(),
            on_ac_power: bits.on_ac_power(),
            low_battery: bits.low_battery(),
            on_battery: bits.on_battery(),
        }
    }

    pub fn analog(&self, field: AnalogField) -> f32 {
        match field {
            AnalogField::LastInputVoltage => self.last_input_voltage,
            AnalogField::InputVoltage => self.input_voltage,
            AnalogField::OutputVoltage => self.output_voltage,
            AnalogField::OutputPower => self.output_power,
            AnalogField::OutputFrequency => self.output_frequency,
            AnalogField::BatteryLevel => self.battery_level,
            AnalogField::Temperature => self.temperature_c,
        }
    }

    pub fn flags(&self) -> [bool; 8] {
        [
            self.beeper_on,
            self.shutdown_active,
            self.test_active,
            self.ups_ok,
            self.boost_active,
            self.on_ac_power,
            self.low_battery,
            self.on_battery,
        ]
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AnalogField as AF;
        let printed = [
            AF::InputVoltage,
            AF::OutputVoltage,
            AF::OutputPower,
            AF::OutputFrequency,
            AF::BatteryLevel,
            AF::Temperature,
        ];
        for field in printed {
            writeln!(f, "{:>20}:{:.2}", field.label(), self.analog(field))?;
        }
        for (label, flag) in FLAG_LABELS.iter().zip(self.flags()) {
            writeln!(f, "{:>20}:{}", label, u8::from(flag))?;
        }
        Ok(())
    }
}
