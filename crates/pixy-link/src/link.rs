//! The Pixy link: device resolution, connection establishment, transfers.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::constants::*;
use crate::quirks::Quirks;
use crate::timer::Timer;
use crate::usb::{RusbHost, UsbError, UsbHandle, UsbHost};

/// Errors from link establishment and transfers.
///
/// Establishment errors (`Init` through `InterfaceClaim`) are fatal to that
/// `open` attempt and leave the link clean: no handle, no context. Transfer
/// errors are ordinary results for the caller to interpret and retry.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The USB session context could not be created.
    #[error("failed to initialise USB context: {0}")]
    Init(#[source] UsbError),

    /// The device enumeration call itself failed.
    #[error("device enumeration failed: {0}")]
    Enumeration(#[source] UsbError),

    /// Enumeration succeeded but nothing at all is attached.
    #[error("no USB devices attached")]
    NoDevices,

    /// A device descriptor could not be read during resolution.
    #[error("failed to read a device descriptor: {0}")]
    DescriptorRead(#[source] UsbError),

    /// Fewer than `index + 1` matching devices are attached.
    #[error("no device with VID={vid:04X} PID={pid:04X} at index {index}")]
    DeviceNotFound { vid: u16, pid: u16, index: usize },

    /// The matched device could not be opened.
    #[error("failed to open device: {0}")]
    Open(#[source] UsbError),

    /// Setting the active configuration failed; the handle was closed.
    #[error("failed to set configuration {config}: {source}")]
    Configuration {
        config: u8,
        #[source]
        source: UsbError,
    },

    /// Claiming the bulk interface failed; the handle was closed.
    #[error("failed to claim interface {interface}: {source}")]
    InterfaceClaim {
        interface: u8,
        #[source]
        source: UsbError,
    },

    /// A transfer was attempted before a successful `open`.
    #[error("link is not connected")]
    NotConnected,

    /// A bulk transfer failed; retriable when the cause is a timeout.
    #[error("bulk transfer failed: {0}")]
    Transfer(#[source] UsbError),
}

impl LinkError {
    /// Whether this is a transfer timeout, the routine retriable failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Transfer(UsbError::Timeout))
    }
}

/// Byte-buffer transport to a peripheral, as seen by protocol layers.
pub trait Link {
    /// Write `data` to the outbound channel; returns bytes transferred.
    ///
    /// A zero `timeout` selects the link's default for this direction.
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<usize, LinkError>;

    /// Read into `buf` from the inbound channel; returns bytes transferred.
    ///
    /// A zero `timeout` selects the link's default for this direction.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError>;

    /// Restart the pacing timer.
    fn reset_timer(&mut self);

    /// Whole milliseconds since the last `reset_timer`.
    fn elapsed_ms(&self) -> u32;

    /// Preferred transfer block size.
    fn block_size(&self) -> u32 {
        BLOCK_SIZE
    }

    /// Link attribute flags.
    fn flags(&self) -> u32 {
        LINK_FLAG_ERROR_CORRECTED
    }
}

/// Link to a Pixy over USB bulk endpoints.
///
/// Holds the USB session context and, once [`UsbLink::open`] has succeeded,
/// the configured and interface-claimed device handle. A failed `open`
/// always leaves the link holding neither.
pub struct UsbLink<H: UsbHost = RusbHost> {
    // Declaration order is teardown order: the handle must drop before the
    // context that produced it.
    handle: Option<H::Handle>,
    context: Option<H>,
    quirks: Quirks,
    timer: Timer,
}

impl UsbLink<RusbHost> {
    /// Create an unconnected link with the quirks detected for this host.
    pub fn new() -> Self {
        Self::with_quirks(Quirks::detect())
    }
}

impl Default for UsbLink<RusbHost> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: UsbHost> UsbLink<H> {
    /// Create an unconnected link with an explicit quirk set.
    pub fn with_quirks(quirks: Quirks) -> Self {
        Self {
            handle: None,
            context: None,
            quirks,
            timer: Timer::new(),
        }
    }

    /// Whether a device is currently open and claimed.
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Connect to the `index`-th attached Pixy, zero-based, counting only
    /// identity matches in enumeration order.
    ///
    /// One attempt, no internal retries. On failure the link ends up
    /// holding neither a handle nor a context and `open` may simply be
    /// called again. Calling `open` on a connected link closes the current
    /// session first.
    #[instrument(level = "info", skip(self))]
    pub fn open(&mut self, index: usize) -> Result<(), LinkError> {
        // Tear down any previous session, handle first.
        self.handle = None;
        self.context = None;

        let context = H::init().map_err(LinkError::Init)?;
        let device = Self::resolve_device(&context, index)?;

        let mut handle = context.open(&device).map_err(LinkError::Open)?;

        if self.quirks.reset_on_open {
            // Fresh handles on some hosts need a reset and a settle pause
            // before they accept a configuration.
            if let Err(err) = handle.reset() {
                warn!(error = %err, "post-open reset failed");
            }
            thread::sleep(RESET_SETTLE_DELAY);
        }

        // Early returns below drop `handle` and `context`, closing the
        // device and releasing the session.
        if let Err(err) = handle.set_configuration(CONFIGURATION_VALUE) {
            return Err(LinkError::Configuration {
                config: CONFIGURATION_VALUE,
                source: err,
            });
        }

        if let Err(err) = handle.claim_interface(INTERFACE_NUMBER) {
            return Err(LinkError::InterfaceClaim {
                interface: INTERFACE_NUMBER,
                source: err,
            });
        }

        if self.quirks.reset_after_claim {
            if let Err(err) = handle.reset() {
                warn!(error = %err, "post-claim reset failed");
            }
        }

        info!(
            vid = %format!("{:04X}", PIXY_VENDOR_ID),
            pid = %format!("{:04X}", PIXY_PRODUCT_ID),
            index,
            "link ready"
        );

        self.context = Some(context);
        self.handle = Some(handle);
        Ok(())
    }

    /// Find the `index`-th identity match among the attached devices.
    fn resolve_device(context: &H, index: usize) -> Result<H::Device, LinkError> {
        let devices = context.devices().map_err(LinkError::Enumeration)?;
        if devices.is_empty() {
            return Err(LinkError::NoDevices);
        }
        debug!(count = devices.len(), "enumerated devices");

        let mut remaining = index;
        for device in devices {
            // One unreadable descriptor aborts the whole resolution.
            let identity = context
                .identity(&device)
                .map_err(LinkError::DescriptorRead)?;
            if identity == TARGET_IDENTITY {
                if remaining == 0 {
                    return Ok(device);
                }
                remaining -= 1;
            }
        }

        Err(LinkError::DeviceNotFound {
            vid: PIXY_VENDOR_ID,
            pid: PIXY_PRODUCT_ID,
            index,
        })
    }
}

impl<H: UsbHost> Link for UsbLink<H> {
    #[instrument(level = "debug", skip(self, data), fields(len = data.len()))]
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<usize, LinkError> {
        let quirks = self.quirks;
        let handle = self.handle.as_mut().ok_or(LinkError::NotConnected)?;
        // Zero means "use the default", never "wait forever".
        let timeout = if timeout.is_zero() {
            DEFAULT_SEND_TIMEOUT
        } else {
            timeout
        };

        match handle.write_bulk(ENDPOINT_OUT, data, timeout) {
            Ok(transferred) => {
                debug!(transferred, "send complete");
                Ok(transferred)
            }
            Err(err) => {
                if quirks.clear_halt_on_error {
                    if let Err(halt_err) = handle.clear_halt(ENDPOINT_OUT) {
                        warn!(error = %halt_err, "clear halt on OUT endpoint failed");
                    }
                }
                Err(LinkError::Transfer(err))
            }
        }
    }

    #[instrument(level = "debug", skip(self, buf), fields(len = buf.len()))]
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, LinkError> {
        let quirks = self.quirks;
        let handle = self.handle.as_mut().ok_or(LinkError::NotConnected)?;
        let timeout = if timeout.is_zero() {
            DEFAULT_RECEIVE_TIMEOUT
        } else {
            timeout
        };

        match handle.read_bulk(ENDPOINT_IN, buf, timeout) {
            Ok(transferred) => {
                debug!(transferred, "receive complete");
                Ok(transferred)
            }
            Err(err) => {
                if quirks.clear_halt_on_error {
                    if let Err(halt_err) = handle.clear_halt(ENDPOINT_IN) {
                        warn!(error = %halt_err, "clear halt on IN endpoint failed");
                    }
                }
                Err(LinkError::Transfer(err))
            }
        }
    }

    fn reset_timer(&mut self) {
        self.timer.reset();
    }

    fn elapsed_ms(&self) -> u32 {
        self.timer.elapsed_ms()
    }
}
