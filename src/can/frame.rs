use crate::vehicle::VehicleState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broadcast identifier of the vehicle telemetry frame.
pub const TELEMETRY_ID: u16 = 0x100;
pub const TELEMETRY_DLC: u8 = 6;
pub const MAX_DLC: u8 = 8;

pub const STANDARD_ID_MASK: u16 = 0x7FF;
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameId {
    Standard(u16),
    Extended(u32),
}

impl FrameId {
    pub fn standard(raw: u16) -> Self {
        FrameId::Standard(raw & STANDARD_ID_MASK)
    }

    pub fn extended(raw: u32) -> Self {
        FrameId::Extended(raw & EXTENDED_ID_MASK)
    }

    pub fn raw(self) -> u32 {
        match self {
            FrameId::Standard(id) => u32::from(id),
            FrameId::Extended(id) => id,
        }
    }

    pub fn is_extended(self) -> bool {
        matches!(self, FrameId::Extended(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    #[default]
    Data,
    Remote,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdType {
    #[default]
    Standard,
    Extended,
}

/// A frame handed to the controller for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    pub id: FrameId,
    pub kind: FrameKind,
    dlc: u8,
    data: [u8; 8],
}

impl CanFrame {
    /// Data frame; `None` when the payload is longer than 8 bytes.
    pub fn data(id: FrameId, payload: &[u8]) -> Option<Self> {
        if payload.len() > usize::from(MAX_DLC) {
            return None;
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            kind: FrameKind::Data,
            dlc: payload.len() as u8,
            data,
        })
    }

    pub fn remote(id: FrameId, dlc: u8) -> Self {
        Self {
            id,
            kind: FrameKind::Remote,
            dlc: dlc.min(MAX_DLC),
            data: [0u8; 8],
        }
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    pub fn payload(&self) -> &[u8] {
        match self.kind {
            FrameKind::Data => &self.data[..usize::from(self.dlc)],
            FrameKind::Remote => &[],
        }
    }

    /// What the controller's receive FIFO reports for this frame.
    pub fn to_rx_parts(&self) -> (RxHeader, [u8; 8]) {
        let (std_id, ext_id, ide) = match self.id {
            FrameId::Standard(id) => (u32::from(id), 0, IdType::Standard),
            FrameId::Extended(id) => (0, id, IdType::Extended),
        };
        let header = RxHeader {
            std_id,
            ext_id,
            ide,
            rtr: self.kind,
            dlc: self.dlc,
        };
        (header, self.data)
    }
}

/// Receive FIFO header as the controller presents it: both identifier
/// registers plus a discriminant saying which one is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxHeader {
    pub std_id: u32,
    pub ext_id: u32,
    pub ide: IdType,
    pub rtr: FrameKind,
    pub dlc: u8,
}

/// Value copy of one received frame, carried through the receive queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedFrame {
    pub id: FrameId,
    pub kind: FrameKind,
    pub len: u8,
    pub data: [u8; 8],
}

impl ReceivedFrame {
    /// The meaningful prefix of `data`.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len.min(MAX_DLC))]
    }
}

impl fmt::Display for ReceivedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id.is_extended() {
            write!(f, "RX EXT id=0x{:08X}", self.id.raw())?;
        } else {
            write!(f, "RX STD id=0x{:03X}", self.id.raw())?;
        }
        match self.kind {
            FrameKind::Remote => write!(f, " RTR dlc={}", self.len),
            FrameKind::Data => {
                write!(f, " DATA dlc={} data=", self.len)?;
                for (i, byte) in self.payload().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Encode the plant state into the 6-byte telemetry frame.
///
/// | bytes | field | encoding |
/// |---|---|---|
/// | 0-1 | speed | `u16` LE, 0.1 km/h |
/// | 2-3 | engine speed | `u16` LE, rpm |
/// | 4-5 | coolant temperature | `i16` LE, 0.1 °C |
pub fn encode_telemetry(state: &VehicleState) -> CanFrame {
    let speed = (state.speed_kph * 10.0).round() as u16;
    let temp = (state.coolant_temp_c * 10.0).round() as i16;

    let mut data = [0u8; 8];
    data[0..2].copy_from_slice(&speed.to_le_bytes());
    data[2..4].copy_from_slice(&state.engine_rpm.to_le_bytes());
    data[4..6].copy_from_slice(&temp.to_le_bytes());

    CanFrame {
        id: FrameId::Standard(TELEMETRY_ID),
        kind: FrameKind::Data,
        dlc: TELEMETRY_DLC,
        data,
    }
}

/// Structural copy of a FIFO entry. The payload is not interpreted.
pub fn decode(header: &RxHeader, data: &[u8; 8]) -> ReceivedFrame {
    let id = match header.ide {
        IdType::Standard => FrameId::standard(header.std_id as u16),
        IdType::Extended => FrameId::extended(header.ext_id),
    };
    ReceivedFrame {
        id,
        kind: header.rtr,
        len: header.dlc.min(MAX_DLC),
        data: *data,
    }
}
