//! Host platform capability flags.
//!
//! The open/transfer logic is identical on every platform; the differences
//! are captured here as a small set of booleans resolved at startup instead
//! of per-OS branches inside the state machine.

/// Platform-conditional behaviors of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// Reset the device right after opening it and wait a settle delay
    /// before setting the configuration.
    pub reset_on_open: bool,
    /// Reset the device once more after the interface claim.
    pub reset_after_claim: bool,
    /// Clear the endpoint halt condition after a failed bulk transfer.
    pub clear_halt_on_error: bool,
}

impl Quirks {
    /// No quirks; correct for hosts without known issues.
    pub const fn none() -> Self {
        Self {
            reset_on_open: false,
            reset_after_claim: false,
            clear_halt_on_error: false,
        }
    }

    /// Resolve the quirk set for the running host.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                reset_on_open: true,
                reset_after_claim: false,
                clear_halt_on_error: true,
            }
        } else if cfg!(target_os = "linux") {
            Self {
                reset_after_claim: true,
                ..Self::none()
            }
        } else {
            Self::none()
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self::detect()
    }
}
