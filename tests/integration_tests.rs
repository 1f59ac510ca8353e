use mini_ecu::can::FrameId;
use mini_ecu::cli::UartRxIsr;
use mini_ecu::logging::{CaptureSink, LogLevel};
use mini_ecu::{BusError, Ecu, EcuConfig, EcuError, VehicleState};
use std::io::{self, Write};
use std::time::Duration;

fn build_ecu(config: EcuConfig) -> (Ecu<CaptureSink>, CaptureSink, CaptureSink) {
    let log = CaptureSink::new();
    let terminal = CaptureSink::new();
    let ecu = Ecu::new(config, log.clone(), terminal.clone()).unwrap();
    (ecu, log, terminal)
}

fn type_line(uart: &mut UartRxIsr, line: &str) {
    for byte in line.bytes() {
        uart.on_byte(byte);
    }
}

#[cfg(test)]
mod ecu_wiring_tests {
    use super::*;

    #[test]
    fn test_startup_logs() {
        let (ecu, log, terminal) = build_ecu(EcuConfig::default());

        assert_eq!(
            log.contents(),
            "[I][ECU] CAN loopback started, RX queue depth 16\r\n[I][CLI] CLI initialized\r\n"
        );
        assert!(terminal.contents().ends_with("> "));
        assert_eq!(ecu.vehicle().snapshot(), VehicleState::new());
    }

    #[test]
    fn test_tick_loops_telemetry_back_into_the_log() {
        let (mut ecu, log, _terminal) = build_ecu(EcuConfig::default());
        log.take();

        let frame = ecu.tick().unwrap();
        assert_eq!(frame.id, FrameId::Standard(0x100));
        assert_eq!(ecu.can_rx_mut().drain_pending(), 1);

        // One idle step: 0 km/h, 800 rpm, 29.99 C -> 300 tenths.
        assert_eq!(log.take(), "[I][CAN] RX STD id=0x100 DATA dlc=6 data=00 00 20 03 2C 01\r\n");
        assert_eq!(ecu.can_stats().frames_processed, 1);
    }

    #[test]
    fn test_terminal_command_reaches_the_plant_and_the_bus() {
        let (mut ecu, log, terminal) = build_ecu(EcuConfig::default());

        let mut uart = ecu.take_uart_isr().unwrap();
        type_line(&mut uart, "veh speed 25\r");
        ecu.cli_mut().poll().unwrap();
        assert!(terminal.contents().contains("OK: speed set to 25.0 km/h"));

        let frame = ecu.tick().unwrap();
        // 24.5 km/h, 1167 rpm, 33.0 C
        assert_eq!(frame.payload(), &[0xF5, 0x00, 0x8F, 0x04, 0x4A, 0x01]);

        ecu.can_rx_mut().drain_pending();
        assert!(log.contents().contains("data=F5 00 8F 04 4A 01\r\n"));
    }

    #[test]
    fn test_log_off_command_silences_can_rx() {
        let (mut ecu, log, _terminal) = build_ecu(EcuConfig::default());

        let mut uart = ecu.take_uart_isr().unwrap();
        type_line(&mut uart, "log off\r");
        ecu.cli_mut().poll().unwrap();
        log.take();

        for _ in 0..3 {
            ecu.tick().unwrap();
        }
        assert_eq!(ecu.can_rx_mut().drain_pending(), 3);
        assert!(log.is_empty());
        assert!(!ecu.can_logging().is_enabled());
    }

    #[test]
    fn test_offline_bus_still_steps_the_plant() {
        let (mut ecu, _log, _terminal) = build_ecu(EcuConfig::default());
        ecu.bus_mut().set_online(false);
        assert!(!ecu.bus_mut().is_online());

        let result = ecu.tick();
        assert!(matches!(result, Err(EcuError::Bus(BusError::Offline))));
        assert!(ecu.vehicle().snapshot().coolant_temp_c < 30.0);
        assert_eq!(ecu.can_stats().frames_queued, 0);
    }

    #[test]
    fn test_undrained_queue_drops_excess_frames() {
        let mut config = EcuConfig::default();
        config.can_rx_queue_depth = 2;
        let (mut ecu, _log, _terminal) = build_ecu(config);

        for _ in 0..5 {
            ecu.tick().unwrap();
        }
        let stats = ecu.can_stats();
        assert_eq!(stats.frames_queued, 2);
        assert_eq!(stats.frames_dropped, 3);
    }

    #[test]
    fn test_debug_level_logs_commands() {
        let mut config = EcuConfig::default();
        config.log_level = LogLevel::Debug;
        let (mut ecu, log, _terminal) = build_ecu(config);

        let mut uart = ecu.take_uart_isr().unwrap();
        type_line(&mut uart, "help\r");
        ecu.cli_mut().poll().unwrap();
        assert!(log.contents().contains("[D][CLI] Command: 'help'\r\n"));
    }

    #[test]
    fn test_unwritable_terminal_fails_construction() {
        struct Unplugged;
        impl Write for Unplugged {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::NotConnected.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let result = Ecu::new(EcuConfig::default(), CaptureSink::new(), Unplugged);
        assert!(matches!(result, Err(EcuError::Io(_))));
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EcuConfig::default();
        assert_eq!(config.step_period(), Duration::from_millis(100));
        assert_eq!(config.cli_poll_period(), Duration::from_millis(10));
        assert_eq!(config.dashboard_every_polls, 50);
        assert_eq!(config.can_rx_queue_depth, 16);
        assert!(config.can_rx_logging);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EcuConfig::from_json(r#"{ "step_period_ms": 50, "log_level": "debug" }"#).unwrap();
        assert_eq!(config.step_period_ms, 50);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.can_rx_queue_depth, 16);
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EcuConfig::default();
        config.can_rx_logging = false;
        let text = config.to_json().unwrap();
        assert_eq!(EcuConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for text in [
            r#"{ "step_period_ms": 0 }"#,
            r#"{ "step_dt_s": -0.1 }"#,
            r#"{ "cli_poll_period_ms": 0 }"#,
            r#"{ "dashboard_every_polls": 0 }"#,
            r#"{ "can_rx_queue_depth": 0 }"#,
        ] {
            assert!(
                matches!(EcuConfig::from_json(text), Err(EcuError::InvalidConfig(_))),
                "accepted {}",
                text
            );
        }
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        assert!(matches!(EcuConfig::from_json("{ step"), Err(EcuError::ConfigParse(_))));
        assert!(matches!(
            EcuConfig::from_json(r#"{ "log_level": "loud" }"#),
            Err(EcuError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_by_ecu() {
        let mut config = EcuConfig::default();
        config.step_period_ms = 0;
        let result = Ecu::new(config, CaptureSink::new(), CaptureSink::new());
        assert!(matches!(result, Err(EcuError::InvalidConfig(_))));
    }
}

#[cfg(test)]
mod ecu_runtime_tests {
    use super::*;

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let mut config = EcuConfig::default();
        config.step_period_ms = 10;
        config.cli_poll_period_ms = 5;
        let (mut ecu, log, terminal) = build_ecu(config);

        let vehicle = ecu.vehicle().clone();
        let mut uart = ecu.take_uart_isr().unwrap();
        type_line(&mut uart, "veh speed 100\r");

        ecu.run(tokio::time::sleep(Duration::from_millis(200))).await.unwrap();

        let log = log.contents();
        assert!(log.contains("[I][CLI] Set target speed to 100.0 km/h\r\n"));
        assert!(log.contains("[I][CAN] RX STD id=0x100 DATA dlc=6"));
        assert!(log.ends_with("[I][ECU] Shutting down\r\n"));
        assert!(terminal.contents().contains("OK: speed set to 100.0 km/h"));

        let state = vehicle.snapshot();
        assert!(state.speed_kph > 0.0 && state.speed_kph < 100.0);
        assert!(state.engine_rpm > 1000);
        assert!(state.is_within_limits());
    }

    #[tokio::test]
    async fn test_offline_bus_logs_failed_transmits_under_can_tag() {
        let mut config = EcuConfig::default();
        config.step_period_ms = 10;
        let (mut ecu, log, _terminal) = build_ecu(config);
        ecu.bus_mut().set_online(false);
        let vehicle = ecu.vehicle().clone();

        ecu.run(tokio::time::sleep(Duration::from_millis(60))).await.unwrap();

        let log = log.contents();
        assert!(log.contains("[W][CAN] Telemetry TX failed: CAN controller is offline\r\n"));
        assert!(!log.contains("RX STD"));
        // Steps are not rolled back when the transmit fails.
        assert!(vehicle.snapshot().coolant_temp_c < 30.0);
    }
}
