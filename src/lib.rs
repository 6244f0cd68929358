//! Protocol engine for Eaton xComfort RF transceiver sticks.
//!
//! The engine speaks the stick's framed binary protocol (MCI) over any
//! duplex byte stream — a USB HID device or a TCP connection to an Ethernet
//! Communication Interface, opened by the host application. It multiplexes
//! concurrent callers onto the single-threaded stick, decodes inbound RF
//! telegrams into typed events and keeps a registry of the configured
//! devices and datapoints, reloadable from the stick's EPROM.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use xcomfort::{Handler, Interface};
//!
//! struct Printer;
//!
//! impl Handler for Printer {
//! 	fn status_bool(&self, dp: &xcomfort::Datapoint, on: bool) {
//! 		println!("{} is now {}", dp.name(), if on { "on" } else { "off" });
//! 	}
//! }
//!
//! # async fn example(stream: tokio::io::DuplexStream) -> xcomfort::Result<()> {
//! let interface = Interface::new(Arc::new(Printer), false);
//! interface.read_file("datapoints.txt").await?;
//!
//! let token = CancellationToken::new();
//! interface.run(token, stream).await
//! # }
//! ```

mod config;
mod device_types;
mod devices;
mod eprom;
mod error;
mod event_loop;
mod framing;
mod interface;
pub mod mci;
mod queue;
mod readers;
mod registry;
mod rx;
mod waiters;

pub use crate::device_types::{ChannelType, DeviceType};
pub use crate::devices::shutter::{ShutterCommand, ShutterStatus};
pub use crate::error::{Error, Result};
pub use crate::interface::{Handler, Interface, Value};
pub use crate::registry::{BatteryState, Datapoint, Device, Registry, SignalStrength};
pub use crate::rx::Event;
