//! Scriptable mock USB host for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{Identity, UsbError, UsbHandle, UsbHost};

/// One scripted device visible to enumeration.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub identity: Identity,
    /// Reading this device's descriptor fails.
    pub descriptor_error: bool,
    /// Opening this device fails.
    pub open_error: bool,
}

impl MockDevice {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            identity: Identity {
                vendor_id,
                product_id,
            },
            descriptor_error: false,
            open_error: false,
        }
    }
}

/// One recorded host or handle call, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    Enumerate,
    ReadDescriptor(usize),
    Open(usize),
    SetConfiguration(u8),
    ClaimInterface(u8),
    Reset,
    ClearHalt(u8),
    Write {
        endpoint: u8,
        len: usize,
        timeout: Duration,
    },
    Read {
        endpoint: u8,
        len: usize,
        timeout: Duration,
    },
    CloseHandle,
    ReleaseContext,
}

/// Everything a test can script beforehand and inspect afterwards.
#[derive(Debug, Default)]
pub struct MockState {
    /// Devices returned by enumeration, in order.
    pub devices: Vec<MockDevice>,
    /// Fail context creation.
    pub init_error: bool,
    /// Fail the enumeration call itself.
    pub enumeration_error: bool,
    /// Fail `set_configuration`.
    pub configure_error: bool,
    /// Fail `claim_interface`.
    pub claim_error: bool,
    /// Fail `reset`.
    pub reset_error: bool,
    /// Fail `clear_halt`.
    pub clear_halt_error: bool,
    /// Scripted results for bulk writes, popped per call.
    /// An unscripted write accepts the full buffer.
    pub write_results: VecDeque<Result<usize, UsbError>>,
    /// Scripted payloads or failures for bulk reads, popped per call.
    /// An unscripted read times out.
    pub read_results: VecDeque<Result<Vec<u8>, UsbError>>,
    /// Captured write payloads.
    pub writes: Vec<Vec<u8>>,
    /// Every call made against the mock, in order.
    pub ops: Vec<MockOp>,
}

impl MockState {
    fn record(&mut self, op: MockOp) {
        self.ops.push(op);
    }

    /// Occurrences of `op` so far.
    pub fn count(&self, op: &MockOp) -> usize {
        self.ops.iter().filter(|o| *o == op).count()
    }
}

thread_local! {
    static STAGED: RefCell<Option<Arc<Mutex<MockState>>>> = const { RefCell::new(None) };
}

/// Mock host session.
///
/// `UsbHost::init` takes no arguments, so the scripted state is staged per
/// thread: call [`MockHost::stage`] first, keep the returned handle for
/// assertions, and every subsequent `init` on the same thread attaches to
/// that state.
pub struct MockHost {
    state: Arc<Mutex<MockState>>,
}

impl MockHost {
    /// Stage `state` for `UsbHost::init` calls on this thread and return a
    /// second handle to it for assertions.
    pub fn stage(state: MockState) -> Arc<Mutex<MockState>> {
        let shared = Arc::new(Mutex::new(state));
        STAGED.with(|slot| *slot.borrow_mut() = Some(shared.clone()));
        shared
    }
}

impl UsbHost for MockHost {
    type Device = usize;
    type Handle = MockHandle;

    fn init() -> Result<Self, UsbError> {
        let state = STAGED
            .with(|slot| slot.borrow().clone())
            .ok_or_else(|| UsbError::Backend("no mock state staged".into()))?;
        if state.lock().unwrap().init_error {
            return Err(UsbError::Backend("context creation failed".into()));
        }
        Ok(Self { state })
    }

    fn devices(&self) -> Result<Vec<usize>, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::Enumerate);
        if state.enumeration_error {
            return Err(UsbError::Backend("enumeration failed".into()));
        }
        Ok((0..state.devices.len()).collect())
    }

    fn identity(&self, device: &usize) -> Result<Identity, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::ReadDescriptor(*device));
        let entry = &state.devices[*device];
        if entry.descriptor_error {
            return Err(UsbError::Backend("descriptor read failed".into()));
        }
        Ok(entry.identity)
    }

    fn open(&self, device: &usize) -> Result<MockHandle, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::Open(*device));
        if state.devices[*device].open_error {
            return Err(UsbError::Backend("open failed".into()));
        }
        Ok(MockHandle {
            state: self.state.clone(),
        })
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        self.state.lock().unwrap().record(MockOp::ReleaseContext);
    }
}

/// Handle to a scripted mock device.
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl UsbHandle for MockHandle {
    fn set_configuration(&mut self, config: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::SetConfiguration(config));
        if state.configure_error {
            return Err(UsbError::Backend("set_configuration refused".into()));
        }
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::ClaimInterface(interface));
        if state.claim_error {
            return Err(UsbError::Backend("claim_interface refused".into()));
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::Reset);
        if state.reset_error {
            return Err(UsbError::Backend("reset failed".into()));
        }
        Ok(())
    }

    fn clear_halt(&mut self, endpoint: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::ClearHalt(endpoint));
        if state.clear_halt_error {
            return Err(UsbError::Backend("clear_halt failed".into()));
        }
        Ok(())
    }

    fn write_bulk(&self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::Write {
            endpoint,
            len: data.len(),
            timeout,
        });
        state.writes.push(data.to_vec());
        state
            .write_results
            .pop_front()
            .unwrap_or(Ok(data.len()))
    }

    fn read_bulk(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.record(MockOp::Read {
            endpoint,
            len: buf.len(),
            timeout,
        });
        match state.read_results.pop_front() {
            Some(Ok(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Err(err)) => Err(err),
            None => Err(UsbError::Timeout),
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.lock().unwrap().record(MockOp::CloseHandle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reads_pop_in_order() {
        let state = MockHost::stage(MockState {
            devices: vec![MockDevice::new(0x1234, 0x5678)],
            read_results: VecDeque::from([Ok(vec![1, 2, 3]), Err(UsbError::Timeout)]),
            ..MockState::default()
        });

        let host = MockHost::init().unwrap();
        let devices = host.devices().unwrap();
        let handle = host.open(&devices[0]).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(handle.read_bulk(0x82, &mut buf, Duration::ZERO), Ok(3));
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(
            handle.read_bulk(0x82, &mut buf, Duration::ZERO),
            Err(UsbError::Timeout)
        );
        // Unscripted reads time out too.
        assert_eq!(
            handle.read_bulk(0x82, &mut buf, Duration::ZERO),
            Err(UsbError::Timeout)
        );

        drop(handle);
        drop(host);
        let state = state.lock().unwrap();
        assert_eq!(state.count(&MockOp::CloseHandle), 1);
        assert_eq!(state.count(&MockOp::ReleaseContext), 1);
    }

    #[test]
    fn test_write_capture() {
        let state = MockHost::stage(MockState {
            devices: vec![MockDevice::new(0x1234, 0x5678)],
            ..MockState::default()
        });

        let host = MockHost::init().unwrap();
        let handle = host.open(&0).unwrap();
        handle.write_bulk(0x02, b"hello", Duration::ZERO).unwrap();

        assert_eq!(state.lock().unwrap().writes, vec![b"hello".to_vec()]);
    }
}
