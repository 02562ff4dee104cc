//! Idle auto-power-off monitoring.
//!
//! Tracks how many peer devices hold an active link and, after a
//! configurable stretch of zero connections, asks the module to power
//! itself off. Connection counting is clamped to the module's two-device
//! limit; spurious events are logged and ignored.

use std::time::Duration;

use log::{info, warn};
use tokio::time::Instant;

use crate::module::{ModulePower, transport::Transport};

/// Maximum simultaneous peer connections the module supports.
const MAX_CONNECTED_DEVICES: u8 = 2;

pub(crate) struct IdleMonitor {
   connected: u8,
   /// Instant the count most recently reached zero; `None` while at
   /// least one device is connected or after the auto-off fired.
   armed_at: Option<Instant>,
   timeout: Duration,
}

impl IdleMonitor {
   pub fn new(timeout: Duration) -> Self {
      Self {
         connected: 0,
         armed_at: None,
         timeout,
      }
   }

   pub fn connected_count(&self) -> u8 {
      self.connected
   }

   /// Forgets all state; used when the module reboots.
   pub fn reset(&mut self) {
      self.connected = 0;
      self.armed_at = None;
   }

   /// Restarts the zero-connection window without touching the count.
   pub fn disarm(&mut self) {
      self.armed_at = None;
   }

   pub fn on_link_connected(&mut self, _now: Instant) {
      if self.connected >= MAX_CONNECTED_DEVICES {
         warn!("ignoring link connection beyond {MAX_CONNECTED_DEVICES} devices");
         return;
      }
      self.connected += 1;
      self.armed_at = None;
   }

   pub fn on_link_disconnected(&mut self, now: Instant) {
      if self.connected == 0 {
         warn!("ignoring link disconnection with no devices connected");
         return;
      }
      self.connected -= 1;
      if self.connected == 0 {
         self.armed_at = Some(now);
      }
   }

   /// Runs once per idle cycle. Only active while the device is powered
   /// on; issues at most one power-off request per elapsed window.
   pub fn tick<T: Transport>(&mut self, now: Instant, powered_on: bool, transport: &mut T) {
      if !powered_on {
         return;
      }

      if self.connected > 0 {
         self.armed_at = None;
         return;
      }

      match self.armed_at {
         None => self.armed_at = Some(now),
         Some(armed) if now.duration_since(armed) >= self.timeout => {
            info!(
               "no devices connected for {:?}, requesting module power-off",
               self.timeout
            );
            if let Err(e) = transport.set_power_state(ModulePower::Off) {
               warn!("idle power-off request failed: {e}");
            }
            self.armed_at = None;
         },
         Some(_) => {},
      }
   }
}
