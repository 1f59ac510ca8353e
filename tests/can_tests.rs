use mini_ecu::can::{
    self, decode, encode_telemetry, send_telemetry, CanBus, CanFrame, CanLogSwitch, FrameId, FrameKind, IdType,
    LoopbackBus, RxHeader, TELEMETRY_DLC, TELEMETRY_ID,
};
use mini_ecu::logging::{CaptureSink, Logger};
use mini_ecu::{BusError, VehicleState};
use std::sync::Arc;

fn cruising_state() -> VehicleState {
    let mut state = VehicleState::new();
    state.force(25.0, 2000, 85.0);
    state
}

#[cfg(test)]
mod telemetry_codec_tests {
    use super::*;

    #[test]
    fn test_encode_telemetry_layout() {
        let frame = encode_telemetry(&cruising_state());

        assert_eq!(frame.id, FrameId::Standard(TELEMETRY_ID));
        assert_eq!(frame.kind, FrameKind::Data);
        assert_eq!(frame.dlc(), TELEMETRY_DLC);
        assert_eq!(frame.payload(), &[0xFA, 0x00, 0xD0, 0x07, 0x52, 0x03]);
    }

    #[test]
    fn test_encode_rounds_to_tenths() {
        let mut state = VehicleState::new();
        state.force(12.36, 800, 29.99);
        let frame = encode_telemetry(&state);

        // 123.6 -> 124, 299.9 -> 300
        assert_eq!(&frame.payload()[0..2], &124u16.to_le_bytes());
        assert_eq!(&frame.payload()[4..6], &300i16.to_le_bytes());
    }

    #[test]
    fn test_encode_range_extremes() {
        let mut state = VehicleState::new();
        state.force(200.0, 6000, 110.0);
        let frame = encode_telemetry(&state);
        assert_eq!(frame.payload(), &[0xD0, 0x07, 0x70, 0x17, 0x4C, 0x04]);
    }

    #[test]
    fn test_decode_standard_data_frame() {
        let header = RxHeader {
            std_id: 0x100,
            ext_id: 0,
            ide: IdType::Standard,
            rtr: FrameKind::Data,
            dlc: 6,
        };
        let data = [0xFA, 0x00, 0xD0, 0x07, 0x52, 0x03, 0xAA, 0xBB];
        let frame = decode(&header, &data);

        assert_eq!(frame.id, FrameId::Standard(0x100));
        assert_eq!(frame.len, 6);
        assert_eq!(frame.payload(), &data[..6]);
        assert_eq!(frame.data, data);
        assert_eq!(frame.to_string(), "RX STD id=0x100 DATA dlc=6 data=FA 00 D0 07 52 03");
    }

    #[test]
    fn test_decode_uses_register_selected_by_ide() {
        let header = RxHeader {
            std_id: 0x7FF,
            ext_id: 0x1234_5678,
            ide: IdType::Extended,
            rtr: FrameKind::Data,
            dlc: 2,
        };
        let frame = decode(&header, &[1, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.id, FrameId::Extended(0x1234_5678));
        assert_eq!(frame.to_string(), "RX EXT id=0x12345678 DATA dlc=2 data=01 02");
    }

    #[test]
    fn test_decode_clamps_dlc_and_keeps_remote_flag() {
        let header = RxHeader {
            std_id: 0x42,
            ext_id: 0,
            ide: IdType::Standard,
            rtr: FrameKind::Remote,
            dlc: 15,
        };
        let frame = decode(&header, &[0; 8]);
        assert_eq!(frame.kind, FrameKind::Remote);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.to_string(), "RX STD id=0x042 RTR dlc=8");
    }

    #[test]
    fn test_frame_survives_controller_round_trip() {
        let sent = encode_telemetry(&cruising_state());
        let (header, data) = sent.to_rx_parts();
        let received = decode(&header, &data);

        assert_eq!(received.id, sent.id);
        assert_eq!(received.kind, sent.kind);
        assert_eq!(received.payload(), sent.payload());
    }
}

#[cfg(test)]
mod can_receive_tests {
    use super::*;

    fn pipeline(depth: usize, logging: bool) -> (CaptureSink, can::CanRxIsr, can::CanRxTask) {
        let sink = CaptureSink::new();
        let logger = Arc::new(Logger::new(sink.clone()));
        let (isr, task) = can::rx::channel(depth, CanLogSwitch::new(logging), logger);
        (sink, isr, task)
    }

    #[test]
    fn test_loopback_frame_is_logged_once() {
        let (sink, isr, mut task) = pipeline(16, true);
        let mut bus = LoopbackBus::new(isr.clone());

        send_telemetry(&mut bus, &cruising_state()).unwrap();
        assert_eq!(task.drain_pending(), 1);

        assert_eq!(
            sink.contents(),
            "[I][CAN] RX STD id=0x100 DATA dlc=6 data=FA 00 D0 07 52 03\r\n"
        );
        assert_eq!(bus.transmitted(), 1);
        assert_eq!(isr.stats().frames_processed, 1);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (sink, isr, mut task) = pipeline(4, true);
        let frame = encode_telemetry(&VehicleState::new());
        let (header, data) = frame.to_rx_parts();

        let accepted = (0..6).filter(|_| isr.on_frame_received(&header, &data)).count();
        assert_eq!(accepted, 4);

        let stats = isr.stats();
        assert_eq!(stats.frames_queued, 4);
        assert_eq!(stats.frames_dropped, 2);

        assert_eq!(task.drain_pending(), 4);
        assert_eq!(sink.contents().lines().count(), 4);
    }

    #[test]
    fn test_logging_switch_silences_frames() {
        let (sink, isr, mut task) = pipeline(16, true);
        let mut bus = LoopbackBus::new(isr);

        task.logging().set(false);
        send_telemetry(&mut bus, &cruising_state()).unwrap();
        assert_eq!(task.drain_pending(), 1);
        assert!(sink.is_empty());

        task.logging().set(true);
        send_telemetry(&mut bus, &cruising_state()).unwrap();
        assert_eq!(task.drain_pending(), 1);
        assert_eq!(sink.contents().lines().count(), 1);
        assert_eq!(task.stats().frames_processed, 2);
    }

    #[test]
    fn test_offline_bus_reports_error() {
        let (_sink, isr, mut task) = pipeline(16, true);
        let mut bus = LoopbackBus::new(isr.clone());
        bus.set_online(false);

        let result = send_telemetry(&mut bus, &cruising_state());
        assert_eq!(result, Err(BusError::Offline));
        assert_eq!(task.drain_pending(), 0);
        assert_eq!(bus.transmitted(), 0);

        bus.set_online(true);
        assert!(bus.transmit(&CanFrame::remote(FrameId::extended(0x1ABC), 0)).is_ok());
        assert_eq!(task.drain_pending(), 1);
    }

    #[tokio::test]
    async fn test_rx_task_exits_when_interrupt_side_is_dropped() {
        let (sink, isr, task) = pipeline(8, true);
        let handle = tokio::spawn(task.run());

        let mut bus = LoopbackBus::new(isr);
        send_telemetry(&mut bus, &VehicleState::new()).unwrap();
        send_telemetry(&mut bus, &cruising_state()).unwrap();
        drop(bus);

        handle.await.unwrap().unwrap();
        let log = sink.contents();
        assert_eq!(log.lines().count(), 2);
        assert!(log.ends_with("data=FA 00 D0 07 52 03\r\n"));
    }
}
