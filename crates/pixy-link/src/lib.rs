//! pixy-link: USB link layer for the Pixy (CMUcam5) camera.
//!
//! Connects to one identified Pixy among the devices on the bus and moves
//! raw byte buffers over its two bulk endpoints under caller-controlled
//! timeouts. Device enumeration, descriptor matching, interface claiming
//! and per-host quirks stay behind the [`Link`] transport abstraction;
//! protocol framing belongs to the layers above.
//!
//! # Architecture
//!
//! - **constants**: fixed device identity, endpoints and timeout defaults
//! - **usb**: seam over the USB access library (rusb, mock)
//! - **link**: device resolution, connection establishment, bulk transfers
//! - **quirks**: per-host capability flags, resolved at startup
//! - **timer**: pacing stopwatch for retry loops
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use pixy_link::{Link, UsbLink};
//!
//! let mut link = UsbLink::new();
//! link.open(0).expect("no Pixy attached");
//!
//! let mut frame = [0u8; 64];
//! match link.receive(&mut frame, Duration::ZERO) {
//!     Ok(n) => println!("got {n} bytes"),
//!     Err(e) if e.is_timeout() => println!("nothing yet"),
//!     Err(e) => panic!("link failed: {e}"),
//! }
//! ```

pub mod constants;
pub mod link;
pub mod quirks;
pub mod timer;
pub mod usb;

// Re-exports for convenience
pub use link::{Link, LinkError, UsbLink};
pub use quirks::Quirks;
pub use timer::Timer;
pub use usb::{Identity, MockHost, RusbHost, UsbError, UsbHandle, UsbHost};
