//! rusb-backed USB host implementation.

use std::time::Duration;

use rusb::UsbContext;

use super::traits::{Identity, UsbError, UsbHandle, UsbHost};

impl From<rusb::Error> for UsbError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => UsbError::Timeout,
            rusb::Error::Pipe => UsbError::Stall,
            rusb::Error::NoDevice => UsbError::Disconnected,
            other => UsbError::Backend(other.to_string()),
        }
    }
}

/// Host session backed by a libusb context.
///
/// The context is released when the session drops.
pub struct RusbHost {
    context: rusb::Context,
}

impl UsbHost for RusbHost {
    type Device = rusb::Device<rusb::Context>;
    type Handle = RusbHandle;

    fn init() -> Result<Self, UsbError> {
        let context = rusb::Context::new()?;
        Ok(Self { context })
    }

    fn devices(&self) -> Result<Vec<Self::Device>, UsbError> {
        // The underlying device list is freed when this call returns; the
        // collected devices hold their own references.
        let list = self.context.devices()?;
        Ok(list.iter().collect())
    }

    fn identity(&self, device: &Self::Device) -> Result<Identity, UsbError> {
        let descriptor = device.device_descriptor()?;
        Ok(Identity {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
        })
    }

    fn open(&self, device: &Self::Device) -> Result<Self::Handle, UsbError> {
        Ok(RusbHandle {
            handle: device.open()?,
        })
    }
}

/// Open device handle; closes the device on drop.
pub struct RusbHandle {
    handle: rusb::DeviceHandle<rusb::Context>,
}

impl UsbHandle for RusbHandle {
    fn set_configuration(&mut self, config: u8) -> Result<(), UsbError> {
        Ok(self.handle.set_active_configuration(config)?)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        Ok(self.handle.claim_interface(interface)?)
    }

    fn reset(&mut self) -> Result<(), UsbError> {
        Ok(self.handle.reset()?)
    }

    fn clear_halt(&mut self, endpoint: u8) -> Result<(), UsbError> {
        Ok(self.handle.clear_halt(endpoint)?)
    }

    fn write_bulk(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, UsbError> {
        Ok(self.handle.write_bulk(endpoint, data, timeout)?)
    }

    fn read_bulk(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        Ok(self.handle.read_bulk(endpoint, buf, timeout)?)
    }
}
