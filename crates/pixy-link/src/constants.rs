//! Fixed constants of the Pixy (CMUcam5) USB interface.

use std::time::Duration;

use crate::usb::Identity;

// ============================================================================
// Device Identification
// ============================================================================

/// Charmed Labs vendor ID.
pub const PIXY_VENDOR_ID: u16 = 0xB1AC;

/// Pixy (CMUcam5) product ID.
pub const PIXY_PRODUCT_ID: u16 = 0xF000;

/// Identity matched during enumeration.
pub const TARGET_IDENTITY: Identity = Identity {
    vendor_id: PIXY_VENDOR_ID,
    product_id: PIXY_PRODUCT_ID,
};

// ============================================================================
// Endpoints and Interface
// ============================================================================

/// Bulk OUT endpoint address (host to device).
pub const ENDPOINT_OUT: u8 = 0x02;

/// Bulk IN endpoint address (device to host).
pub const ENDPOINT_IN: u8 = 0x82;

/// Configuration selected after opening the device.
pub const CONFIGURATION_VALUE: u8 = 1;

/// Interface claimed for bulk traffic.
pub const INTERFACE_NUMBER: u8 = 1;

// ============================================================================
// Timing
// ============================================================================

/// OUT transfer timeout substituted when the caller passes zero.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(10);

/// IN transfer timeout substituted when the caller passes zero.
/// Larger than the OUT default: inbound data arrival is less predictable.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(50);

/// Settle delay after the pre-configuration reset on hosts that need it.
pub const RESET_SETTLE_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// Link Attributes
// ============================================================================

/// Preferred transfer block size advertised to protocol layers.
pub const BLOCK_SIZE: u32 = 64;

/// Link attribute flag: frames on this link are error corrected.
pub const LINK_FLAG_ERROR_CORRECTED: u32 = 0x01;
