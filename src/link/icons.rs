//! Sound-icon arbitration.
//!
//! Short audible cues ("sound icons") are started and stopped on the
//! module in reaction to status transitions and to a small set of ongoing
//! conditions. The arbiter owns the boot-cue exclusivity guard: nothing
//! status-driven may sound until the startup cue and a grace period have
//! passed. Nominal durations only schedule overlap decisions; they never
//! enforce actual playback stop.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::{
   link::status::ConnectivityStatus,
   module::{IconPlayback, SoundIcon, transport::Transport},
};

/// Nominal playback length of each cue, for scheduling only.
const fn nominal_duration(icon: SoundIcon) -> Duration {
   match icon {
      SoundIcon::PowerOn => Duration::from_millis(2_300),
      SoundIcon::PowerOff => Duration::from_millis(1_800),
      SoundIcon::BluetoothPairing => Duration::from_millis(900),
      SoundIcon::BluetoothConnected => Duration::from_millis(700),
      SoundIcon::ChainConnected => Duration::from_millis(1_200),
      SoundIcon::ChainDisconnected => Duration::from_millis(1_200),
      SoundIcon::SlavePairing => Duration::from_millis(900),
      SoundIcon::BatteryLow => Duration::from_millis(1_500),
   }
}

/// Looping cues tied to an ongoing condition, scanned every idle cycle.
const LOOPING_CUES: &[(SoundIcon, ConnectivityStatus)] = &[
   (SoundIcon::BluetoothPairing, ConnectivityStatus::BluetoothPairing),
   (SoundIcon::SlavePairing, ConnectivityStatus::SlavePairing),
];

/// Lifecycle of the boot cue. Transitions only forward; reset to
/// `NotPlayed` exclusively by full module reinitialization (the Off
/// phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootGuard {
   NotPlayed,
   Playing { since: Instant },
   Finished,
}

/// Outcome of an externally requested cue start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayOutcome {
   Started,
   /// The request collided with the boot cue; the caller should re-post
   /// it after a short delay.
   Deferred,
   Ignored,
}

pub(crate) struct IconArbiter {
   cues_enabled: bool,
   /// The one non-boot icon logically current, with its start time.
   current: Option<(SoundIcon, Instant)>,
   boot_guard: BootGuard,
   /// Cue queued to start once the current one's nominal duration ends.
   queued: Option<(SoundIcon, Instant)>,
   boot_grace: Duration,
   resolve_holdoff: Duration,
}

impl IconArbiter {
   pub fn new(boot_grace: Duration, resolve_holdoff: Duration) -> Self {
      Self {
         cues_enabled: true,
         current: None,
         boot_guard: BootGuard::NotPlayed,
         queued: None,
         boot_grace,
         resolve_holdoff,
      }
   }

   pub fn cues_enabled(&self) -> bool {
      self.cues_enabled
   }

   pub fn set_cues_enabled(&mut self, enabled: bool) {
      self.cues_enabled = enabled;
   }

   /// Clears the boot guard. Only valid as part of powering the module
   /// back down; the next boot cue re-arms it.
   pub fn reset_boot_guard(&mut self) {
      self.boot_guard = BootGuard::NotPlayed;
   }

   /// Whether the status resolver may publish: the boot cue must have
   /// finished, unless cues are globally disabled (then it never plays).
   pub fn resolver_unblocked(&self) -> bool {
      !self.cues_enabled || self.boot_guard == BootGuard::Finished
   }

   /// The coalescer's extra hold-off: recomputes stay parked while the
   /// boot cue started less than `resolve_holdoff` ago.
   pub fn resolve_holdoff_passed(&self, now: Instant) -> bool {
      match self.boot_guard {
         BootGuard::Playing { since } => now.duration_since(since) > self.resolve_holdoff,
         BootGuard::NotPlayed | BootGuard::Finished => true,
      }
   }

   /// Advances the boot guard; called once per idle cycle.
   pub fn update_guard(&mut self, now: Instant) {
      if let BootGuard::Playing { since } = self.boot_guard {
         let window = nominal_duration(SoundIcon::PowerOn) + self.boot_grace;
         if now.duration_since(since) >= window {
            debug!("boot cue window elapsed, status cues unblocked");
            self.boot_guard = BootGuard::Finished;
         }
      }
   }

   /// Handles an externally requested cue start.
   pub fn request_play<T: Transport>(
      &mut self,
      icon: SoundIcon,
      now: Instant,
      transport: &mut T,
   ) -> PlayOutcome {
      if !self.cues_enabled {
         debug!("sound icon {icon} suppressed, cues disabled");
         return PlayOutcome::Ignored;
      }

      if icon == SoundIcon::PowerOn {
         if let Err(e) = transport.play_sound_icon(icon, IconPlayback::Once) {
            warn!("failed to start boot cue: {e}");
         }
         if self.boot_guard == BootGuard::NotPlayed {
            self.boot_guard = BootGuard::Playing { since: now };
         }
         return PlayOutcome::Started;
      }

      // The connected cue must not talk over the boot cue; reissue it
      // once the boot cue is out of the way.
      if icon == SoundIcon::BluetoothConnected
         && let BootGuard::Playing { since } = self.boot_guard
         && now.duration_since(since) < nominal_duration(SoundIcon::PowerOn)
      {
         return PlayOutcome::Deferred;
      }

      self.play(icon, IconPlayback::Once, now, transport);
      PlayOutcome::Started
   }

   /// Handles an externally requested cue stop.
   pub fn request_stop<T: Transport>(&mut self, icon: SoundIcon, transport: &mut T) {
      if !self.cues_enabled {
         debug!("sound icon {icon} stop suppressed, cues disabled");
         return;
      }
      self.stop(icon, transport);
   }

   /// Reacts to a published status transition.
   pub fn on_status_changed<T: Transport>(
      &mut self,
      previous: ConnectivityStatus,
      current: ConnectivityStatus,
      now: Instant,
      transport: &mut T,
   ) {
      match status_cue(current) {
         Some((icon, playback)) => self.play(icon, playback, now, transport),
         None => {
            if previous.is_chain_mode() {
               // Let whatever is sounding finish before announcing the
               // chain teardown.
               let due = match self.current {
                  Some((icon, started)) => {
                     let end = started + nominal_duration(icon);
                     if end > now { end } else { now }
                  },
                  None => now,
               };
               self.queued = Some((SoundIcon::ChainDisconnected, due));
            }
            // Leaving a pairing status needs no cue here; the continuous
            // scan stops the loop.
         },
      }
   }

   /// Continuous half: runs once per idle cycle, before the resolver.
   pub fn scan<T: Transport>(
      &mut self,
      status: ConnectivityStatus,
      now: Instant,
      transport: &mut T,
   ) {
      if let Some((icon, due)) = self.queued
         && now >= due
      {
         self.queued = None;
         self.play(icon, IconPlayback::Once, now, transport);
      }

      for &(icon, active_in) in LOOPING_CUES {
         let active = status == active_in;
         let playing = self.current.map(|(c, _)| c) == Some(icon);
         if active {
            if !playing && self.current_finished(now) {
               self.play(icon, IconPlayback::Loop, now, transport);
            }
         } else if playing {
            self.stop(icon, transport);
         }
      }
   }

   /// Whether the current cue's nominal duration has elapsed.
   fn current_finished(&self, now: Instant) -> bool {
      match self.current {
         Some((icon, started)) => now.duration_since(started) >= nominal_duration(icon),
         None => true,
      }
   }

   fn play<T: Transport>(
      &mut self,
      icon: SoundIcon,
      playback: IconPlayback,
      now: Instant,
      transport: &mut T,
   ) {
      if !self.cues_enabled {
         debug!("sound icon {icon} suppressed, cues disabled");
         return;
      }
      if let Err(e) = transport.play_sound_icon(icon, playback) {
         warn!("failed to start sound icon {icon}: {e}");
         return;
      }
      debug!("sound icon {icon} started ({playback:?})");
      self.current = Some((icon, now));
   }

   fn stop<T: Transport>(&mut self, icon: SoundIcon, transport: &mut T) {
      if let Err(e) = transport.stop_sound_icon(icon) {
         warn!("failed to stop sound icon {icon}: {e}");
      }
      if self.current.map(|(c, _)| c) == Some(icon) {
         self.current = None;
      }
   }
}

/// Cue associated with entering a status, if any.
const fn status_cue(status: ConnectivityStatus) -> Option<(SoundIcon, IconPlayback)> {
   match status {
      ConnectivityStatus::BluetoothPairing => {
         Some((SoundIcon::BluetoothPairing, IconPlayback::Loop))
      },
      ConnectivityStatus::ChainMaster => Some((SoundIcon::ChainConnected, IconPlayback::Once)),
      ConnectivityStatus::SlavePairing => Some((SoundIcon::SlavePairing, IconPlayback::Loop)),
      _ => None,
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::module::transport::testing::{Call, ScriptedTransport};

   const GRACE: Duration = Duration::from_millis(500);
   const HOLDOFF: Duration = Duration::from_secs(1);

   fn arbiter() -> IconArbiter {
      IconArbiter::new(GRACE, HOLDOFF)
   }

   #[test]
   fn test_boot_guard_transitions() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      let t0 = Instant::now();

      assert!(!icons.resolver_unblocked());
      assert!(icons.resolve_holdoff_passed(t0));

      let outcome = icons.request_play(SoundIcon::PowerOn, t0, &mut transport);
      assert_eq!(outcome, PlayOutcome::Started);
      assert!(!icons.resolver_unblocked());
      assert!(!icons.resolve_holdoff_passed(t0 + Duration::from_millis(900)));
      assert!(icons.resolve_holdoff_passed(t0 + Duration::from_millis(1_100)));

      // Still playing halfway through the window.
      icons.update_guard(t0 + Duration::from_millis(1_500));
      assert!(!icons.resolver_unblocked());

      icons.update_guard(t0 + nominal_duration(SoundIcon::PowerOn) + GRACE);
      assert!(icons.resolver_unblocked());
   }

   #[test]
   fn test_cues_disabled_unblocks_resolver_and_mutes_requests() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      icons.set_cues_enabled(false);

      assert!(icons.resolver_unblocked());
      let outcome = icons.request_play(SoundIcon::BatteryLow, Instant::now(), &mut transport);
      assert_eq!(outcome, PlayOutcome::Ignored);
      assert!(transport.script.lock().calls.is_empty());
   }

   #[test]
   fn test_connected_cue_deferred_during_boot_cue() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      let t0 = Instant::now();

      icons.request_play(SoundIcon::PowerOn, t0, &mut transport);
      let outcome = icons.request_play(
         SoundIcon::BluetoothConnected,
         t0 + Duration::from_millis(500),
         &mut transport,
      );
      assert_eq!(outcome, PlayOutcome::Deferred);
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::BluetoothConnected, IconPlayback::Once)),
         0
      );

      // Past the boot cue it goes straight through.
      let later = t0 + nominal_duration(SoundIcon::PowerOn) + Duration::from_millis(10);
      let outcome = icons.request_play(SoundIcon::BluetoothConnected, later, &mut transport);
      assert_eq!(outcome, PlayOutcome::Started);
   }

   #[test]
   fn test_status_cue_mapping() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      let t0 = Instant::now();

      icons.on_status_changed(
         ConnectivityStatus::BluetoothDisconnected,
         ConnectivityStatus::BluetoothPairing,
         t0,
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::BluetoothPairing, IconPlayback::Loop)),
         1
      );

      icons.on_status_changed(
         ConnectivityStatus::BluetoothPairing,
         ConnectivityStatus::ChainMaster,
         t0,
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::ChainConnected, IconPlayback::Once)),
         1
      );
   }

   #[test]
   fn test_chain_exit_queues_disconnect_cue_after_current() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      let t0 = Instant::now();

      icons.on_status_changed(
         ConnectivityStatus::BluetoothDisconnected,
         ConnectivityStatus::ChainMaster,
         t0,
         &mut transport,
      );

      // Chain tears down while the entry cue is still sounding.
      icons.on_status_changed(
         ConnectivityStatus::ChainMaster,
         ConnectivityStatus::BluetoothDisconnected,
         t0 + Duration::from_millis(100),
         &mut transport,
      );
      icons.scan(
         ConnectivityStatus::BluetoothDisconnected,
         t0 + Duration::from_millis(200),
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::ChainDisconnected, IconPlayback::Once)),
         0
      );

      // Once the entry cue's nominal duration has passed, it plays.
      icons.scan(
         ConnectivityStatus::BluetoothDisconnected,
         t0 + nominal_duration(SoundIcon::ChainConnected) + Duration::from_millis(10),
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::ChainDisconnected, IconPlayback::Once)),
         1
      );
   }

   #[test]
   fn test_scan_restarts_and_stops_looping_cue() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      let t0 = Instant::now();

      // Pairing active with nothing playing: loop starts.
      icons.scan(ConnectivityStatus::BluetoothPairing, t0, &mut transport);
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::BluetoothPairing, IconPlayback::Loop)),
         1
      );

      // Already playing: no duplicate start.
      icons.scan(
         ConnectivityStatus::BluetoothPairing,
         t0 + Duration::from_millis(100),
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::BluetoothPairing, IconPlayback::Loop)),
         1
      );

      // Condition gone: loop stops.
      icons.scan(
         ConnectivityStatus::BluetoothConnected,
         t0 + Duration::from_millis(200),
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::StopIcon(SoundIcon::BluetoothPairing)),
         1
      );
   }

   #[test]
   fn test_loop_waits_for_current_cue_to_finish() {
      let mut icons = arbiter();
      let mut transport = ScriptedTransport::new();
      let t0 = Instant::now();

      // A one-shot cue is sounding.
      icons.request_play(SoundIcon::BatteryLow, t0, &mut transport);

      // Pairing becomes active before it ends: loop start is held back.
      icons.scan(
         ConnectivityStatus::BluetoothPairing,
         t0 + Duration::from_millis(500),
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::BluetoothPairing, IconPlayback::Loop)),
         0
      );

      icons.scan(
         ConnectivityStatus::BluetoothPairing,
         t0 + nominal_duration(SoundIcon::BatteryLow) + Duration::from_millis(10),
         &mut transport,
      );
      assert_eq!(
         transport
            .script
            .lock()
            .count(&Call::PlayIcon(SoundIcon::BluetoothPairing, IconPlayback::Loop)),
         1
      );
   }
}
