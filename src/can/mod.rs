pub mod bus;
pub mod frame;
pub mod rx;

/// Log tag for everything on the CAN side.
pub const LOG_MODULE: &str = "CAN";

pub use bus::{send_telemetry, CanBus, LoopbackBus};
pub use frame::{
    decode, encode_telemetry, CanFrame, FrameId, FrameKind, IdType, ReceivedFrame, RxHeader, TELEMETRY_DLC,
    TELEMETRY_ID,
};
pub use rx::{CanLogSwitch, CanRxIsr, CanRxStats, CanRxTask};
