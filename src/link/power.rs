//! Wireless-module power sequencing.
//!
//! Phases are entered only by explicit request and processed one at a
//! time inside message handling: the worker stays blocked until the
//! phase returns, so phases can never interleave. The Off phase waits a
//! bounded time for the module to confirm shutdown and then proceeds
//! regardless; the On phase waits without bound for readiness and for
//! the first audio-source report (see DESIGN.md).

use std::time::Duration;

use log::{info, warn};
use tokio::time::{self, Instant};

use crate::{
   board::Board,
   link::worker::LinkWorker,
   module::{ModulePower, transport::Transport},
};

/// Sleep increment between transport polls inside a phase.
const POWER_POLL_STEP: Duration = Duration::from_millis(20);
/// Settle time between module readiness and the power-on request.
const READY_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Requested power phase for the wireless module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PowerPhase {
   On,
   PreOff,
   Off,
}

/// Sequencer bookkeeping owned by the worker.
pub(crate) struct PowerSequencer {
   /// Phase currently executing; the worker is blocked while this is set.
   active: Option<PowerPhase>,
   off_confirmed: bool,
   powered_on: bool,
}

impl PowerSequencer {
   pub fn new() -> Self {
      Self {
         active: None,
         off_confirmed: false,
         powered_on: false,
      }
   }

   pub fn powered_on(&self) -> bool {
      self.powered_on
   }

   /// Called when the module reports the Off power state.
   pub fn confirm_off(&mut self) {
      self.off_confirmed = true;
   }
}

impl<T: Transport, B: Board> LinkWorker<T, B> {
   /// Runs one power phase to completion. Serialized by construction:
   /// requests arrive through the mailbox and this method blocks the
   /// worker until the phase has returned.
   pub(crate) async fn run_power_phase(&mut self, phase: PowerPhase) {
      debug_assert!(
         self.power.active.is_none(),
         "power phases must not interleave"
      );
      self.power.active = Some(phase);
      info!("entering power phase {phase}");

      match phase {
         PowerPhase::On => self.phase_on().await,
         PowerPhase::PreOff => self.phase_pre_off().await,
         PowerPhase::Off => self.phase_off().await,
      }

      info!("power phase {phase} complete");
      self.power.active = None;
   }

   /// Waits out the power-down cue before the caller mutes audio. No
   /// transport interaction.
   async fn phase_pre_off(&mut self) {
      self.power.powered_on = false;
      time::sleep(self.config.pre_off_delay()).await;
   }

   async fn phase_off(&mut self) {
      self.power.powered_on = false;
      self.power.off_confirmed = false;

      if let Err(e) = self.transport.set_power_state(ModulePower::Off) {
         warn!("module power-off request failed: {e}");
      }

      let deadline = Instant::now() + self.config.off_confirm_timeout();
      loop {
         self.drain_module_events();
         if self.power.off_confirmed {
            break;
         }
         if Instant::now() >= deadline {
            warn!(
               "module did not confirm power-off within {:?}, forcing shutdown",
               self.config.off_confirm_timeout()
            );
            break;
         }
         time::sleep(POWER_POLL_STEP).await;
      }

      if let Err(e) = self.board.set_amp_mute(true) {
         warn!("amp mute failed: {e}");
      }
      self.transport.deinit();
      self.transport_up = false;
      self.board.set_module_power(false);
      // Only full reinitialization may rewind the boot-cue guard.
      self.icons.reset_boot_guard();
   }

   async fn phase_on(&mut self) {
      self.board.set_module_power(true);
      self.transport.flush_input();
      if let Err(e) = self.transport.init() {
         warn!("transport init failed: {e}");
      }
      self.transport_up = true;

      info!("waiting for the wireless module to become ready (no timeout)");
      while !self.transport.is_ready() {
         self.drain_module_events();
         time::sleep(POWER_POLL_STEP).await;
      }

      match self.transport.firmware_version() {
         Ok(version) => {
            info!("module firmware {version}");
            self.state.set_module_version(version);
         },
         Err(e) => warn!("module firmware version query failed: {e}"),
      }
      match self.board.companion_firmware_version() {
         Ok(version) => {
            info!("companion controller firmware {version}");
            self.state.set_companion_version(version);
         },
         Err(e) => warn!("companion firmware version query failed: {e}"),
      }

      time::sleep(READY_SETTLE_DELAY).await;

      if let Err(e) = self.transport.set_power_state(ModulePower::On) {
         warn!("module power-on request failed: {e}");
      }

      info!("waiting for the first audio-source report (no timeout)");
      while self.signals.audio_source.is_none() {
         self.drain_module_events();
         time::sleep(POWER_POLL_STEP).await;
      }

      if let Err(e) = self.board.set_amp_mute(false) {
         warn!("amp unmute failed: {e}");
      }

      // A rebooted module has no peers and stale mirrored state.
      self.idle.reset();
      self.power.powered_on = true;
      self.push_cached_settings();
   }
}
