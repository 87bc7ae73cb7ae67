pub mod domoticz;

pub use domoticz::DomoticzRegistry;

use crate::variables::{DeviceType, Slot, Variable};
use async_trait::async_trait;

use std::fmt;

/// Icon shown for every device created by this integration
pub const IMAGE: u8 = 17;

#[derive(Debug, Clone)]
pub enum Error {
    Transport(String),
    /// Host answered, but refused the request
    Rejected(String),
    InvalidResponse(String),
    UnknownSlot(Slot),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(s) => write!(f, "transport error: {}", s),
            Error::Rejected(s) => write!(f, "rejected by host: {}", s),
            Error::InvalidResponse(s) => write!(f, "invalid host response: {}", s),
            Error::UnknownSlot(slot) => write!(f, "no device in slot {}", slot),
        }
    }
}

impl std::error::Error for Error {}

/// Everything the host needs to create the device of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub slot: Slot,
    pub name: &'static str,
    pub device_type: DeviceType,
    pub image: u8,
    pub used: bool,
    /// Custom sensor options, `1;<unit>` for devices created by type name
    pub options: Option<String>,
}

impl From<Variable> for DeviceSpec {
    fn from(variable: Variable) -> Self {
        let descriptor = variable.descriptor();
        let options = match descriptor.device_type {
            DeviceType::Named(_) => Some(format!("1;{}", descriptor.unit)),
            DeviceType::Typed { .. } => None,
        };

        DeviceSpec {
            slot: variable.slot(),
            name: descriptor.label,
            device_type: descriptor.device_type,
            image: IMAGE,
            used: descriptor.used,
            options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub slot: Slot,
    pub id: String,
    pub name: String,
    pub s_value: Option<String>,
}

/// Device registry of the home-automation host.
///
/// Lookups answer from the registry's current view of the host; `refresh` re-reads it.
#[async_trait]
pub trait DeviceRegistry: Send {
    /// Whether the host's devices have been read at least once
    fn ready(&self) -> bool;

    fn contains(&self, slot: Slot) -> bool;

    /// Value currently stored by the device in `slot`
    fn s_value(&self, slot: Slot) -> Option<String>;

    fn devices(&self) -> Vec<DeviceInfo>;

    async fn refresh(&mut self) -> Result<(), Error>;

    async fn create(&mut self, spec: &DeviceSpec) -> Result<(), Error>;

    async fn update(&mut self, slot: Slot, n_value: u8, s_value: &str) -> Result<(), Error>;
}
