//! Bit-level SPI NOR flash model for simulation testbenches.
//!
//! The [`flash::FlashDevice`] is advanced one bus edge at a time by whatever
//! loop drives the simulated SPI lines. [`bus::SpiBus`] is a ready-made bus
//! owner for tests and scripted runs.

pub mod bus;
pub mod flash;
pub mod host;
pub mod protocol;
pub mod script;
