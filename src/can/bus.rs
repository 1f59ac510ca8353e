use super::frame::{encode_telemetry, CanFrame};
use super::rx::CanRxIsr;
use crate::error::BusError;
use crate::vehicle::VehicleState;

/// Transmit side of a CAN controller.
pub trait CanBus {
    fn transmit(&mut self, frame: &CanFrame) -> Result<(), BusError>;
}

/// Encode `state` and hand it to the bus. One shot: nothing is retried and
/// the caller's state is not touched on failure.
pub fn send_telemetry<B: CanBus + ?Sized>(bus: &mut B, state: &VehicleState) -> Result<CanFrame, BusError> {
    let frame = encode_telemetry(state);
    bus.transmit(&frame)?;
    Ok(frame)
}

/// Controller in loopback mode: each transmitted frame is received back by
/// the same node, entering through the receive interrupt handler.
#[derive(Debug)]
pub struct LoopbackBus {
    isr: CanRxIsr,
    online: bool,
    transmitted: u32,
}

impl LoopbackBus {
    pub fn new(isr: CanRxIsr) -> Self {
        Self {
            isr,
            online: true,
            transmitted: 0,
        }
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn transmitted(&self) -> u32 {
        self.transmitted
    }
}

impl CanBus for LoopbackBus {
    fn transmit(&mut self, frame: &CanFrame) -> Result<(), BusError> {
        if !self.online {
            return Err(BusError::Offline);
        }
        self.transmitted = self.transmitted.wrapping_add(1);

        let (header, data) = frame.to_rx_parts();
        self.isr.on_frame_received(&header, &data);
        Ok(())
    }
}
