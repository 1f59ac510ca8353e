//! # Mini ECU
//!
//! Runtime core of a simulated engine control unit: a physical plant model,
//! a periodic CAN telemetry broadcast with an interrupt-fed receive path,
//! and a live UART terminal for inspecting and perturbing the plant.
//!
//! ## Quick Start
//!
//! ```rust
//! use mini_ecu::{Ecu, EcuConfig};
//! use mini_ecu::logging::CaptureSink;
//!
//! let log = CaptureSink::new();
//! let mut ecu = Ecu::new(EcuConfig::default(), log.clone(), Vec::new()).unwrap();
//!
//! // Type a command as if it arrived over the UART.
//! let mut uart = ecu.take_uart_isr().unwrap();
//! for byte in b"veh speed 80\r" {
//!     uart.on_byte(*byte);
//! }
//! ecu.cli_mut().poll().unwrap();
//! assert_eq!(ecu.vehicle().snapshot().speed_kph, 80.0);
//!
//! // One vehicle-task activation: step the plant, broadcast telemetry.
//! let frame = ecu.tick().unwrap();
//! assert_eq!(frame.payload().len(), 6);
//! ```
//!
//! ## Architecture
//!
//! - [`logging`] - leveled `[L][TAG] message` sink shared by everything
//! - [`vehicle`] - plant model with clamped speed, rpm and coolant temperature
//! - [`ring`] - lock-free single-producer/single-consumer ring buffer
//! - [`can`] - telemetry codec, bus abstraction and the receive pipeline
//! - [`cli`] - terminal line editor, command table and dashboard line
//! - [`config`] - runtime configuration
//! - [`ecu`] - context object wiring the components and their task loops
//!
//! Interrupt handlers only touch the hand-off structures ([`cli::UartRxIsr`]
//! and [`can::CanRxIsr`]); everything else runs in task context.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::new_without_default)]

pub mod can;
pub mod cli;
pub mod config;
pub mod ecu;
pub mod error;
pub mod logging;
pub mod ring;
pub mod vehicle;

pub use config::EcuConfig;
pub use ecu::Ecu;
pub use error::{BusError, EcuError};
pub use logging::{LogLevel, Logger};
pub use vehicle::{SharedVehicle, VehicleState};
