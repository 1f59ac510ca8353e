//! Operator terminal: interrupt-fed byte ring, line assembly, command
//! dispatch and the live dashboard line.
//!
//! [`UartRxIsr`] is the receive interrupt's view and the ring's only
//! producer: it pushes each byte and returns immediately, dropping the byte
//! if the ring is full. [`Cli::take_isr`] hands it out once.
//! [`Cli::poll`] runs in task context, drains the ring, echoes input,
//! dispatches complete lines and redraws the dashboard on a fixed cadence.

pub mod command;
pub mod dashboard;

pub use command::CliCommand;

use crate::can::CanLogSwitch;
use crate::logging::Logger;
use crate::ring::{self, RingConsumer, RingProducer};
use crate::vehicle::SharedVehicle;
use crate::{log_debug, log_info, log_warn};
use command::{
    EMPTY_LINE_RESPONSE, HELP_TEXT, LOGGING_OFF_RESPONSE, LOGGING_ON_RESPONSE, OVERHEAT_RESPONSE,
    OVERHEAT_TEMP_C, PROMPT, UNKNOWN_RESPONSE,
};
use static_assertions::const_assert;
use std::io::{self, Write};
use std::sync::Arc;

/// Characters accepted on one command line.
pub const LINE_CAPACITY: usize = 31;
/// Slots in the receive ring (one stays free).
pub const RX_RING_SLOTS: usize = 64;
/// Dashboard redraw cadence: 50 polls is ~500 ms at a 10 ms poll period.
pub const DEFAULT_DASHBOARD_EVERY: u32 = 50;

const_assert!(LINE_CAPACITY < RX_RING_SLOTS);

const LOG_MODULE: &str = "CLI";
const GREETING: &str = "\r\nCLI ready. Type 'help' and press Enter.\r\n";

/// Receive-interrupt handle for the terminal UART.
#[derive(Debug)]
pub struct UartRxIsr {
    ring: RingProducer<u8, RX_RING_SLOTS>,
}

impl UartRxIsr {
    /// Store one received byte. Returns `false` if the ring was full and
    /// the byte was dropped. Reception stays armed either way.
    pub fn on_byte(&mut self, byte: u8) -> bool {
        self.ring.push(byte)
    }

    pub fn dropped(&self) -> u32 {
        self.ring.dropped()
    }
}

pub struct Cli<W: Write> {
    out: W,
    ring: RingConsumer<u8, RX_RING_SLOTS>,
    isr: Option<UartRxIsr>,
    line: heapless::Vec<u8, LINE_CAPACITY>,
    polls: u32,
    dashboard_every: u32,
    vehicle: SharedVehicle,
    can_logging: CanLogSwitch,
    logger: Arc<Logger>,
}

impl<W: Write> Cli<W> {
    /// Bring the terminal up: clear the screen, draw the dashboard on the
    /// top row and print the greeting and first prompt.
    pub fn new(
        out: W,
        vehicle: SharedVehicle,
        can_logging: CanLogSwitch,
        logger: Arc<Logger>,
        dashboard_every: u32,
    ) -> io::Result<Self> {
        let (producer, consumer) = ring::split();
        let mut cli = Self {
            out,
            ring: consumer,
            isr: Some(UartRxIsr { ring: producer }),
            line: heapless::Vec::new(),
            polls: 0,
            dashboard_every: dashboard_every.max(1),
            vehicle,
            can_logging,
            logger,
        };

        cli.out.write_all(dashboard::CLEAR_SCREEN.as_bytes())?;
        cli.draw_dashboard()?;
        cli.out.write_all(GREETING.as_bytes())?;
        cli.out.write_all(PROMPT.as_bytes())?;
        cli.out.flush()?;

        log_info!(cli.logger, LOG_MODULE, "CLI initialized");
        Ok(cli)
    }

    /// Handle for the UART receive interrupt. There is one producer per
    /// terminal, so this returns `Some` only on the first call.
    pub fn take_isr(&mut self) -> Option<UartRxIsr> {
        self.isr.take()
    }

    /// Bytes the receive interrupt dropped on a full ring.
    pub fn rx_dropped(&self) -> u32 {
        self.ring.dropped()
    }

    /// One task-context pass: consume every byte received so far, then
    /// redraw the dashboard if this poll completes a cadence period.
    pub fn poll(&mut self) -> io::Result<()> {
        while let Some(byte) = self.ring.pop() {
            self.handle_byte(byte)?;
        }

        self.polls += 1;
        if self.polls >= self.dashboard_every {
            self.polls = 0;
            self.draw_dashboard()?;
        }

        self.out.flush()
    }

    pub fn draw_dashboard(&mut self) -> io::Result<()> {
        let frame = dashboard::render(&self.vehicle.snapshot());
        self.out.write_all(frame.as_bytes())
    }

    /// Characters typed since the last line terminator.
    pub fn pending_input(&self) -> &[u8] {
        &self.line
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    fn handle_byte(&mut self, byte: u8) -> io::Result<()> {
        if byte == b'\r' || byte == b'\n' {
            if self.line.is_empty() {
                return self.out.write_all(EMPTY_LINE_RESPONSE.as_bytes());
            }
            let line = core::mem::take(&mut self.line);
            let text = String::from_utf8_lossy(&line);
            return self.dispatch(&text);
        }

        // Past capacity the byte is lost, but the operator still sees it.
        let _ = self.line.push(byte);
        self.out.write_all(&[byte])
    }

    fn dispatch(&mut self, line: &str) -> io::Result<()> {
        log_debug!(self.logger, LOG_MODULE, "Command: '{}'", line);

        match CliCommand::parse(line) {
            CliCommand::Help => self.out.write_all(HELP_TEXT.as_bytes()),
            CliCommand::SetSpeed(requested) => {
                let applied = self.vehicle.update(|state| {
                    state.set_target_speed(requested);
                    state.speed_kph
                });
                log_info!(self.logger, LOG_MODULE, "Set target speed to {:.1} km/h", applied);
                write!(self.out, "\r\nOK: speed set to {:.1} km/h\r\n{}", applied, PROMPT)
            }
            CliCommand::BadSpeed(arg) => {
                log_warn!(self.logger, LOG_MODULE, "Rejected speed '{}'", arg);
                write!(self.out, "\r\nError: invalid speed '{}'\r\n{}", arg, PROMPT)
            }
            CliCommand::CoolantOverheat => {
                self.vehicle.update(|state| {
                    let (speed, rpm) = (state.speed_kph, state.engine_rpm);
                    state.force(speed, rpm, OVERHEAT_TEMP_C);
                });
                log_warn!(self.logger, LOG_MODULE, "Injected coolant overheat");
                self.out.write_all(OVERHEAT_RESPONSE.as_bytes())
            }
            CliCommand::CanLogging(enabled) => {
                self.can_logging.set(enabled);
                if enabled {
                    log_info!(self.logger, LOG_MODULE, "CAN RX logging enabled");
                    self.out.write_all(LOGGING_ON_RESPONSE.as_bytes())
                } else {
                    log_info!(self.logger, LOG_MODULE, "CAN RX logging disabled");
                    self.out.write_all(LOGGING_OFF_RESPONSE.as_bytes())
                }
            }
            CliCommand::Unknown => self.out.write_all(UNKNOWN_RESPONSE.as_bytes()),
        }
    }
}

impl<W: Write> std::fmt::Debug for Cli<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("pending", &self.line.len())
            .field("polls", &self.polls)
            .field("dashboard_every", &self.dashboard_every)
            .field("ring", &self.ring)
            .finish_non_exhaustive()
    }
}
