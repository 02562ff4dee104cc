//! Connectivity supervision core.
//!
//! This module contains the cooperative worker that owns all connectivity
//! state, the status resolver it runs after signal bursts settle, the
//! sound-icon arbiter, the power sequencer, and the idle auto-off monitor.

mod icons;
mod idle;
pub mod power;
pub mod status;
pub mod worker;

use std::sync::{
   Arc,
   atomic::{AtomicBool, Ordering},
};

use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;

use crate::{link::status::ConnectivityStatus, module::FirmwareVersion};

/// Internal shared state published by the worker.
#[derive(Debug, Default)]
struct LinkStateInner {
   status: AtomicCell<ConnectivityStatus>,
   streaming: AtomicBool,
   module_version: Mutex<Option<FirmwareVersion>>,
   companion_version: Mutex<Option<FirmwareVersion>>,
}

/// Shared, readable connectivity state.
///
/// This type is cheaply cloneable and thread-safe; values are
/// last-write-wins snapshots maintained by the worker.
#[derive(Debug, Clone, Default)]
pub struct LinkState(Arc<LinkStateInner>);

impl LinkState {
   pub fn new() -> Self {
      Self::default()
   }

   /// The currently published connectivity status.
   pub fn status(&self) -> ConnectivityStatus {
      self.0.status.load()
   }

   pub(crate) fn set_status(&self, status: ConnectivityStatus) {
      self.0.status.store(status);
   }

   /// Whether an audio streaming session is currently active.
   pub fn streaming(&self) -> bool {
      self.0.streaming.load(Ordering::Relaxed)
   }

   pub(crate) fn set_streaming(&self, active: bool) {
      self.0.streaming.store(active, Ordering::Relaxed);
   }

   /// Module firmware version captured during the last power-on.
   pub fn module_version(&self) -> Option<FirmwareVersion> {
      self.0.module_version.lock().clone()
   }

   pub(crate) fn set_module_version(&self, version: FirmwareVersion) {
      *self.0.module_version.lock() = Some(version);
   }

   /// Companion-controller firmware version captured during the last
   /// power-on.
   pub fn companion_version(&self) -> Option<FirmwareVersion> {
      self.0.companion_version.lock().clone()
   }

   pub(crate) fn set_companion_version(&self, version: FirmwareVersion) {
      *self.0.companion_version.lock() = Some(version);
   }
}
