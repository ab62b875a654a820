#![allow(unsafe_code)]

//! Thin shim over the vendor PCAN-Basic dynamic library.
//!
//! The library is loaded and its entry points resolved at open time; a
//! dedicated receiver thread polls `CAN_Read` and publishes every frame
//! with a fresh monotonic timestamp. Closing requests the receiver to
//! exit and waits at most two seconds before detaching it.

use std::ffi::{c_char, c_void};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ccs_core::event::EventHub;
use ccs_core::{CanFrame, CanStatus};
use cfg_if::cfg_if;
use libloading::Library;
use log::{debug, warn};
use rclite::Arc;

use crate::error::{Error, Result};
use crate::iface::{CanEvent, CanInterface, ChannelInfo};

pub mod api {
    //! Constants and types of the PCAN-Basic ABI.

    use bitflags::bitflags;
    use std::ffi::{c_char, c_void};

    /// USB channel handles `PCAN_USBBUS1..8`.
    pub const USB_CHANNELS: [u16; 8] = [0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58];

    pub const BAUD_1M: u16 = 0x0014;
    pub const BAUD_500K: u16 = 0x001C;
    pub const BAUD_250K: u16 = 0x011C;
    pub const BAUD_125K: u16 = 0x031C;

    pub const MESSAGE_STANDARD: u8 = 0x00;
    pub const MESSAGE_EXTENDED: u8 = 0x02;

    pub const ERROR_OK: u32 = 0x0;
    pub const ERROR_QRCVEMPTY: u32 = 0x20;

    pub const CHANNEL_CONDITION: u8 = 0x02;
    pub const CHANNEL_AVAILABLE: u32 = 0x01;
    pub const BUSOFF_AUTORESET: u8 = 0x07;
    pub const LANGUAGE_ENGLISH: u16 = 0x09;

    bitflags! {
        /// Error/status word returned by `CAN_GetStatus`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct StatusFlags: u32 {
            const BUS_WARNING = 0x04;
            const RECEIVE_QUEUE_EMPTY = 0x20;
            const BUS_OFF = 0x40;
            const BUS_PASSIVE = 0x80;
        }
    }

    #[repr(C, packed)]
    pub struct PcanMsg {
        pub id: u32,
        pub msgtype: u8,
        pub len: u8,
        pub data: [u8; 8],
    }

    #[repr(C, packed)]
    pub struct PcanTimestamp {
        pub millis: u32,
        pub millis_overflow: u16,
        pub micros: u16,
    }

    pub type FnInitialize = unsafe extern "C" fn(u16, u16, u8, u8, u32) -> u32;
    pub type FnUninitialize = unsafe extern "C" fn(u16) -> u32;
    pub type FnRead = unsafe extern "C" fn(u16, *mut PcanMsg, *mut PcanTimestamp) -> u32;
    pub type FnWrite = unsafe extern "C" fn(u16, *mut PcanMsg) -> u32;
    pub type FnGetStatus = unsafe extern "C" fn(u16) -> u32;
    pub type FnGetValue = unsafe extern "C" fn(u16, u8, *mut c_void, u32) -> u32;
    pub type FnSetValue = unsafe extern "C" fn(u16, u8, *mut c_void, u32) -> u32;
    pub type FnGetErrorText = unsafe extern "C" fn(u32, u16, *mut c_char) -> u32;
}

cfg_if! {
    if #[cfg(windows)] {
        const VENDOR_LIBRARY: &str = "PCANBasic.dll";
    } else {
        const VENDOR_LIBRARY: &str = "libpcanbasic.so";
    }
}

/// How long an empty receive queue pauses the poll loop.
const EMPTY_QUEUE_SLEEP: Duration = Duration::from_micros(500);
/// How long a bus error pauses the poll loop before re-querying status.
const BUS_ERROR_SLEEP: Duration = Duration::from_millis(10);
/// Bounded join deadline for the receiver thread.
const RECEIVER_JOIN_DEADLINE: Duration = Duration::from_secs(2);

/// The loaded vendor library with its resolved entry points.
///
/// The function pointers stay valid for as long as `_library` lives, which
/// is as long as this struct does.
struct VendorApi {
    _library: Library,
    initialize: api::FnInitialize,
    uninitialize: api::FnUninitialize,
    read: api::FnRead,
    write: api::FnWrite,
    get_status: api::FnGetStatus,
    get_value: Option<api::FnGetValue>,
    set_value: Option<api::FnSetValue>,
    get_error_text: Option<api::FnGetErrorText>,
}

impl VendorApi {
    fn load() -> Result<Self> {
        let library = unsafe { Library::new(VENDOR_LIBRARY) }
            .map_err(|e| Error::LibraryLoad(format!("{VENDOR_LIBRARY}: {e}")))?;

        unsafe {
            macro_rules! resolve {
                ($name:literal, $ty:ty) => {
                    match library.get::<$ty>($name) {
                        Ok(symbol) => *symbol,
                        Err(_) => {
                            return Err(Error::LibraryLoad(format!(
                                "{} does not export {}",
                                VENDOR_LIBRARY,
                                String::from_utf8_lossy($name)
                            )))
                        }
                    }
                };
            }

            let initialize = resolve!(b"CAN_Initialize", api::FnInitialize);
            let uninitialize = resolve!(b"CAN_Uninitialize", api::FnUninitialize);
            let read = resolve!(b"CAN_Read", api::FnRead);
            let write = resolve!(b"CAN_Write", api::FnWrite);
            let get_status = resolve!(b"CAN_GetStatus", api::FnGetStatus);
            let get_value = library.get::<api::FnGetValue>(b"CAN_GetValue").map(|s| *s).ok();
            let set_value = library.get::<api::FnSetValue>(b"CAN_SetValue").map(|s| *s).ok();
            let get_error_text = library
                .get::<api::FnGetErrorText>(b"CAN_GetErrorText")
                .map(|s| *s)
                .ok();

            Ok(Self {
                _library: library,
                initialize,
                uninitialize,
                read,
                write,
                get_status,
                get_value,
                set_value,
                get_error_text,
            })
        }
    }

    /// English text for a vendor error code, falling back to the hex code.
    fn error_text(&self, code: u32) -> String {
        if let Some(get_error_text) = self.get_error_text {
            let mut buf = [0u8; 256];
            let result =
                unsafe { get_error_text(code, api::LANGUAGE_ENGLISH, buf.as_mut_ptr() as *mut c_char) };
            if result == api::ERROR_OK {
                let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                if let Ok(text) = std::str::from_utf8(&buf[..len]) {
                    if !text.is_empty() {
                        return text.to_owned();
                    }
                }
            }
        }
        format!("error 0x{code:08X}")
    }
}

struct ReceiverHandle {
    thread: JoinHandle<()>,
    done: Receiver<()>,
}

/// PCAN-Basic hardware backend.
pub struct PcanDriver {
    api: Option<Arc<VendorApi>>,
    channel: u16,
    open: bool,
    polling: Arc<AtomicBool>,
    receiver: Option<ReceiverHandle>,
    hub: Arc<EventHub<CanEvent>>,
    last_error: Mutex<Option<String>>,
}

impl PcanDriver {
    pub fn new() -> Self {
        Self {
            api: None,
            channel: 0,
            open: false,
            polling: Arc::new(AtomicBool::new(false)),
            receiver: None,
            hub: Arc::new(EventHub::new()),
            last_error: Mutex::new(None),
        }
    }

    /// Load the vendor library and resolve its entry points, once.
    fn ensure_api(&mut self) -> Result<Arc<VendorApi>> {
        if let Some(api) = &self.api {
            return Ok(api.clone());
        }
        match VendorApi::load() {
            Ok(api) => {
                let api = Arc::new(api);
                self.api = Some(api.clone());
                Ok(api)
            }
            Err(e) => {
                *self.last_error.lock().unwrap() = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn baud_rate_to_code(baud_rate: u32) -> u16 {
        match baud_rate {
            1_000_000 => api::BAUD_1M,
            500_000 => api::BAUD_500K,
            250_000 => api::BAUD_250K,
            125_000 => api::BAUD_125K,
            _ => api::BAUD_500K,
        }
    }

    fn status_from_code(code: u32) -> CanStatus {
        if code == api::ERROR_OK {
            return CanStatus::Ok;
        }
        let flags = api::StatusFlags::from_bits_truncate(code);
        if flags.contains(api::StatusFlags::BUS_OFF) {
            CanStatus::BusOff
        } else if flags.contains(api::StatusFlags::BUS_PASSIVE) {
            CanStatus::BusPassive
        } else if flags.contains(api::StatusFlags::BUS_WARNING) {
            CanStatus::BusWarning
        } else {
            CanStatus::Error
        }
    }
}

impl Default for PcanDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CanInterface for PcanDriver {
    fn open(&mut self, channel: u16, baud_rate: u32) -> Result<()> {
        let api = self.ensure_api()?;

        let code = Self::baud_rate_to_code(baud_rate);
        let result = unsafe { (api.initialize)(channel, code, 0, 0, 0) };
        if result != api::ERROR_OK {
            let text = api.error_text(result);
            *self.last_error.lock().unwrap() = Some(format!("CAN_Initialize failed: {text}"));
            return Err(Error::ChannelOpen(text));
        }

        // Bus-off auto-reset keeps the channel usable across bus faults.
        if let Some(set_value) = api.set_value {
            let mut value: u32 = 1;
            unsafe {
                set_value(
                    channel,
                    api::BUSOFF_AUTORESET,
                    &mut value as *mut u32 as *mut c_void,
                    4,
                );
            }
        }

        self.channel = channel;
        self.open = true;
        self.polling.store(true, Ordering::SeqCst);

        let (done_tx, done_rx) = mpsc::channel();
        let poll_api = api.clone();
        let polling = self.polling.clone();
        let hub = self.hub.clone();
        let thread = thread::spawn(move || {
            poll_loop(poll_api, channel, polling, hub);
            let _ = done_tx.send(());
        });
        self.receiver = Some(ReceiverHandle {
            thread,
            done: done_rx,
        });

        debug!("PCAN channel 0x{channel:04X} open at {baud_rate} bit/s");
        self.hub.publish(CanEvent::Status(CanStatus::Ok));
        Ok(())
    }

    fn close(&mut self) {
        self.polling.store(false, Ordering::SeqCst);

        if let Some(receiver) = self.receiver.take() {
            if receiver.done.recv_timeout(RECEIVER_JOIN_DEADLINE).is_ok() {
                let _ = receiver.thread.join();
            } else {
                // Detach; anything it still publishes goes nowhere useful.
                warn!("PCAN receiver did not stop within 2 s, detaching");
            }
        }

        if self.open {
            if let Some(api) = &self.api {
                unsafe { (api.uninitialize)(self.channel) };
            }
            self.open = false;
        }

        self.hub.publish(CanEvent::Status(CanStatus::Disconnected));
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&self, frame: &CanFrame) -> Result<()> {
        if !self.open {
            return Err(Error::WriteRejected("interface not open".into()));
        }
        let Some(api) = &self.api else {
            return Err(Error::WriteRejected("vendor library not loaded".into()));
        };

        let mut msg = api::PcanMsg {
            id: frame.id,
            msgtype: if frame.extended {
                api::MESSAGE_EXTENDED
            } else {
                api::MESSAGE_STANDARD
            },
            len: frame.dlc.min(8),
            data: frame.data,
        };

        let result = unsafe { (api.write)(self.channel, &mut msg) };
        if result != api::ERROR_OK {
            let text = api.error_text(result);
            *self.last_error.lock().unwrap() = Some(format!("CAN_Write failed: {text}"));
            return Err(Error::WriteRejected(text));
        }
        Ok(())
    }

    fn available_channels(&mut self) -> Vec<ChannelInfo> {
        let Ok(api) = self.ensure_api() else {
            return Vec::new();
        };
        let Some(get_value) = api.get_value else {
            return Vec::new();
        };

        let mut channels = Vec::new();
        for (index, handle) in api::USB_CHANNELS.iter().enumerate() {
            let mut condition: u32 = 0;
            let result = unsafe {
                get_value(
                    *handle,
                    api::CHANNEL_CONDITION,
                    &mut condition as *mut u32 as *mut c_void,
                    4,
                )
            };
            if result == api::ERROR_OK && condition & api::CHANNEL_AVAILABLE != 0 {
                channels.push(ChannelInfo {
                    name: format!("PCAN-USB {}", index + 1),
                    handle: *handle,
                    description: format!(
                        "PCAN USB Channel {} (Handle 0x{:04X})",
                        index + 1,
                        handle
                    ),
                });
            }
        }
        channels
    }

    fn status(&self) -> CanStatus {
        if !self.open {
            return CanStatus::Disconnected;
        }
        match &self.api {
            Some(api) => Self::status_from_code(unsafe { (api.get_status)(self.channel) }),
            None => CanStatus::Disconnected,
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    fn subscribe(&self) -> Receiver<CanEvent> {
        self.hub.subscribe()
    }
}

impl Drop for PcanDriver {
    fn drop(&mut self) {
        self.close();
    }
}

/// Receiver loop: poll `CAN_Read` tightly, pausing briefly on an empty
/// queue and a little longer on bus errors.
fn poll_loop(api: Arc<VendorApi>, channel: u16, polling: Arc<AtomicBool>, hub: Arc<EventHub<CanEvent>>) {
    let mut msg = api::PcanMsg {
        id: 0,
        msgtype: 0,
        len: 0,
        data: [0u8; 8],
    };
    let mut ts = api::PcanTimestamp {
        millis: 0,
        millis_overflow: 0,
        micros: 0,
    };

    while polling.load(Ordering::SeqCst) {
        let result = unsafe { (api.read)(channel, &mut msg, &mut ts) };

        if result == api::ERROR_OK {
            let id = msg.id;
            let len = usize::from(msg.len.min(8));
            let mut data = [0u8; 8];
            data[..len].copy_from_slice(&msg.data[..len]);
            let frame = CanFrame {
                id,
                extended: msg.msgtype & api::MESSAGE_EXTENDED != 0,
                dlc: len as u8,
                data,
                timestamp: Instant::now(),
            };
            hub.publish(CanEvent::Frame(frame));
        } else if result & api::ERROR_QRCVEMPTY != 0 {
            thread::sleep(EMPTY_QUEUE_SLEEP);
        } else {
            thread::sleep(BUS_ERROR_SLEEP);
            let status = PcanDriver::status_from_code(unsafe { (api.get_status)(channel) });
            if status != CanStatus::Ok {
                hub.publish(CanEvent::Status(status));
            }
        }
    }
}
