//! USB host access abstraction.
//!
//! Defines the `UsbHost`/`UsbHandle` traits over the synchronous USB access
//! library, allowing different implementations (rusb, mock, etc.).

use std::time::Duration;

use thiserror::Error;

/// Error from the underlying USB access library.
///
/// The kinds callers branch on for retries are kept distinct; everything
/// else is carried as the backend's own message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsbError {
    #[error("transfer timed out")]
    Timeout,

    #[error("endpoint stalled")]
    Stall,

    #[error("device disconnected")]
    Disconnected,

    #[error("{0}")]
    Backend(String),
}

impl UsbError {
    /// Whether this failure is a timeout, the ordinary "try again" case.
    pub fn is_timeout(&self) -> bool {
        matches!(self, UsbError::Timeout)
    }
}

/// Identity of a USB device, as read from its device descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Abstract synchronous USB host session.
///
/// This trait enables:
/// - Production implementation using rusb
/// - Mock implementation for unit testing
pub trait UsbHost: Sized {
    /// Enumerated but not yet opened device.
    type Device;
    /// Open device handle.
    type Handle: UsbHandle;

    /// Create the host session context.
    fn init() -> Result<Self, UsbError>;

    /// Enumerate all currently attached devices, in bus order.
    fn devices(&self) -> Result<Vec<Self::Device>, UsbError>;

    /// Read a device's identity descriptor.
    fn identity(&self, device: &Self::Device) -> Result<Identity, UsbError>;

    /// Open a device for I/O.
    fn open(&self, device: &Self::Device) -> Result<Self::Handle, UsbError>;
}

/// Operations on an open device handle.
///
/// Dropping a handle closes the device.
pub trait UsbHandle {
    fn set_configuration(&mut self, config: u8) -> Result<(), UsbError>;

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError>;

    fn reset(&mut self) -> Result<(), UsbError>;

    fn clear_halt(&mut self, endpoint: u8) -> Result<(), UsbError>;

    /// Blocking bulk write on `endpoint`; returns the bytes transferred.
    fn write_bulk(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, UsbError>;

    /// Blocking bulk read on `endpoint`; returns the bytes transferred.
    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration)
    -> Result<usize, UsbError>;
}
