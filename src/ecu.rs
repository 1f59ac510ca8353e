//! Context object that owns and wires every component, plus the task loops
//! that drive them.
//!
//! Lifecycle is create, configure, use: [`Ecu::new`] builds all components
//! from an [`EcuConfig`], the accessors hand out the interrupt-side handles
//! and shared state, and [`Ecu::run`] drives the periodic tasks until the
//! shutdown future resolves.

use crate::can::{
    self, send_telemetry, CanBus, CanFrame, CanLogSwitch, CanRxIsr, CanRxStats, CanRxTask, LoopbackBus,
    LOG_MODULE as CAN_LOG_MODULE,
};
use crate::cli::{Cli, UartRxIsr};
use crate::config::EcuConfig;
use crate::error::{BusError, EcuError};
use crate::logging::Logger;
use crate::vehicle::{SharedVehicle, VehicleState};
use crate::{log_info, log_warn};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

const LOG_MODULE: &str = "ECU";

/// Advance the plant one step and broadcast the resulting state. A failed
/// transmit leaves the stepped state in place.
pub fn step_and_send<B: CanBus + ?Sized>(
    vehicle: &SharedVehicle,
    bus: &mut B,
    dt_s: f32,
) -> Result<CanFrame, BusError> {
    let state = vehicle.update(|state| {
        state.step(dt_s);
        *state
    });
    send_telemetry(bus, &state)
}

pub struct Ecu<W: Write> {
    config: EcuConfig,
    logger: Arc<Logger>,
    vehicle: SharedVehicle,
    can_logging: CanLogSwitch,
    can_isr: CanRxIsr,
    can_rx: CanRxTask,
    bus: LoopbackBus,
    cli: Cli<W>,
}

impl<W: Write> Ecu<W> {
    /// Build every component. The log sink and the terminal are usually
    /// the same UART, but they are independent writers here.
    pub fn new(config: EcuConfig, log_sink: impl Write + Send + 'static, terminal: W) -> Result<Self, EcuError> {
        config.validate()?;

        let logger = Arc::new(Logger::with_level(log_sink, config.log_level));
        let vehicle = SharedVehicle::new(VehicleState::new());
        let can_logging = CanLogSwitch::new(config.can_rx_logging);

        let (can_isr, can_rx) = can::rx::channel(
            config.can_rx_queue_depth,
            can_logging.clone(),
            Arc::clone(&logger),
        );
        let bus = LoopbackBus::new(can_isr.clone());
        log_info!(
            logger,
            LOG_MODULE,
            "CAN loopback started, RX queue depth {}",
            config.can_rx_queue_depth
        );

        let cli = Cli::new(
            terminal,
            vehicle.clone(),
            can_logging.clone(),
            Arc::clone(&logger),
            config.dashboard_every_polls,
        )?;

        Ok(Self {
            config,
            logger,
            vehicle,
            can_logging,
            can_isr,
            can_rx,
            bus,
            cli,
        })
    }

    pub fn vehicle(&self) -> &SharedVehicle {
        &self.vehicle
    }

    pub fn can_logging(&self) -> &CanLogSwitch {
        &self.can_logging
    }

    /// Receive-interrupt handle for the terminal UART. `Some` only on the
    /// first call.
    pub fn take_uart_isr(&mut self) -> Option<UartRxIsr> {
        self.cli.take_isr()
    }

    pub fn can_stats(&self) -> CanRxStats {
        self.can_isr.stats()
    }

    pub fn bus_mut(&mut self) -> &mut LoopbackBus {
        &mut self.bus
    }

    pub fn cli_mut(&mut self) -> &mut Cli<W> {
        &mut self.cli
    }

    pub fn can_rx_mut(&mut self) -> &mut CanRxTask {
        &mut self.can_rx
    }

    /// One activation of the vehicle task, without the timer.
    pub fn tick(&mut self) -> Result<CanFrame, EcuError> {
        Ok(step_and_send(&self.vehicle, &mut self.bus, self.config.step_dt_s)?)
    }

    /// Drive the vehicle, CAN receive and terminal tasks until `shutdown`
    /// resolves. Returns early only if the terminal can no longer be
    /// written.
    pub async fn run<F>(self, shutdown: F) -> Result<(), EcuError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            logger,
            vehicle,
            can_rx,
            bus,
            cli,
            ..
        } = self;

        info!(
            step_ms = config.step_period_ms,
            poll_ms = config.cli_poll_period_ms,
            "ECU tasks starting"
        );

        let tasks = async {
            tokio::try_join!(
                vehicle_loop(vehicle, bus, config.step_period(), config.step_dt_s, Arc::clone(&logger)),
                can_rx.run(),
                cli_loop(cli, config.cli_poll_period()),
            )
        };

        tokio::select! {
            result = tasks => {
                result?;
                Ok(())
            }
            () = shutdown => {
                info!("shutdown requested");
                log_info!(logger, LOG_MODULE, "Shutting down");
                Ok(())
            }
        }
    }
}

async fn vehicle_loop(
    vehicle: SharedVehicle,
    mut bus: LoopbackBus,
    period: Duration,
    dt_s: f32,
    logger: Arc<Logger>,
) -> Result<(), EcuError> {
    debug!(?period, "vehicle task started");
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = step_and_send(&vehicle, &mut bus, dt_s) {
            warn!("telemetry transmit failed: {}", e);
            log_warn!(logger, CAN_LOG_MODULE, "Telemetry TX failed: {}", e);
        }
    }
}

async fn cli_loop<W: Write>(mut cli: Cli<W>, period: Duration) -> Result<(), EcuError> {
    debug!(?period, "CLI task started");
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = cli.poll() {
            warn!("terminal write failed: {}", e);
            return Err(e.into());
        }
    }
}
