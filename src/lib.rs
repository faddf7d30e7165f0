//! This crate provides an interface for querying and controlling SMS brand UPS units ("nobreaks")
//! over their serial port.
//!
//! It supports `no-std` environments by disabling the default `std` feature.
//!
//! The protocol is a fixed set of 7 byte commands, the status query answered with an 18 byte
//! frame holding seven analog readings and eight state bits. Replies carry no verifiable
//! checksum, so a status reply is only trusted when every reading is physically plausible; the
//! query is retried a bounded number of times otherwise. See [`ups::Ups`] for the entry point.
//!
//! Units known to work with this:
//! * SMS Senoidal (firmware 7.0b)
//!
//! The serial port used for UPS comms should be configured like so:
//! * Baud rate: 2400
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//! * Raw mode (no echo, no canonical processing, no signals)

#![cfg_attr(not(feature = "std"), no_std)]

pub mod command;
#[cfg(feature = "std")]
pub mod delay;
pub mod error;
pub mod response;
pub mod session;
pub mod snapshot;
pub mod ups;
pub mod validate;

#[cfg(test)]
mod mock_serial;
