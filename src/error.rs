use thiserror::Error;

/// Transmit-side failures reported by a [`crate::can::CanBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("CAN controller is offline")]
    Offline,

    #[error("no free transmit mailbox")]
    MailboxFull,
}

#[derive(Debug, Error)]
pub enum EcuError {
    #[error("CAN bus error: {0}")]
    Bus(#[from] BusError),

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
