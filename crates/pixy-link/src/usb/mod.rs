//! USB access layer module.

pub mod mock;
pub mod rusb;
pub mod traits;

pub use self::mock::{MockDevice, MockHost, MockOp, MockState};
pub use self::rusb::{RusbHandle, RusbHost};
pub use self::traits::{Identity, UsbError, UsbHandle, UsbHost};
