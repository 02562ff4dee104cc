//! Transport contract for the wireless-module SDK.
//!
//! The module is driven through an opaque vendor SDK over a serial link.
//! This trait captures exactly the surface the supervisor needs: lifecycle
//! control, the `tick()` pump that parses queued inbound bytes, setters for
//! state the module mirrors, and the pairing/playback/sound-icon controls.
//!
//! Inbound traffic surfaces as a batch of [`ModuleEvent`]s returned from
//! [`Transport::tick`]; the worker matches them exhaustively, so adding an
//! event kind is a compile-time-visible change.

use smallvec::SmallVec;

use crate::{
   error::Result,
   module::{
      AudioSource, ChainState, ChargerStatus, DeviceColor, FirmwareVersion, IconPlayback,
      ModulePower, PairingState, SoundIcon, StopReason,
   },
};

/// Batch of events drained by one `tick()` call.
pub type EventBatch = SmallVec<[ModuleEvent; 4]>;

/// Events parsed out of the module's inbound byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleEvent {
   /// The module finished booting and accepts commands.
   SystemReady,
   /// The module confirmed a power-state transition.
   PowerState(ModulePower),
   /// The active audio source changed.
   AudioSourceChanged(AudioSource),
   /// The module-side absolute volume changed.
   VolumeChanged(u8),
   /// An A2DP streaming session started or stopped.
   StreamStateChanged(bool),
   /// A peer device connected.
   LinkConnected,
   /// A peer device disconnected.
   LinkDisconnected,
   /// The pairing state machine moved.
   PairingStateChanged(PairingState),
   /// The chain-broadcast state machine moved.
   ChainStateChanged(ChainState),
   /// The module-side USB audio source appeared or vanished.
   UsbConnectedChanged(bool),
   /// The module entered or left firmware-update mode.
   UpdateModeChanged(bool),
   /// The module relayed a user setting request from a paired device.
   Request(SettingRequest),
}

/// Setting changes requested from the module side (companion app or
/// on-device controls routed through the module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingRequest {
   Brightness(u8),
   Bass(i8),
   Treble(i8),
   EcoMode(bool),
   OffTimer(u16),
   CuesEnabled(bool),
}

/// Opaque wireless-module SDK boundary.
///
/// All methods are best-effort from the supervisor's perspective: failures
/// are logged and otherwise ignored, except where the power sequencer
/// explicitly waits on an outcome.
pub trait Transport: Send {
   /// Binds the SDK to its I/O and prepares it for `tick()` polling.
   fn init(&mut self) -> Result<()>;

   /// Tears the SDK down. Safe to call when not initialized.
   fn deinit(&mut self);

   /// Discards any stale bytes buffered before (re)initialization.
   fn flush_input(&mut self);

   /// Pumps the SDK: parses queued inbound bytes and returns the events
   /// they produced. Must be polled regularly; nothing is parsed outside
   /// of this call.
   fn tick(&mut self) -> EventBatch;

   /// Whether the module has completed its boot handshake.
   fn is_ready(&mut self) -> bool;

   fn set_power_state(&mut self, power: ModulePower) -> Result<()>;

   fn notify_battery_level(&mut self, percent: u8) -> Result<()>;
   fn notify_charger_status(&mut self, status: ChargerStatus) -> Result<()>;
   fn set_color(&mut self, color: DeviceColor) -> Result<()>;
   fn notify_aux_connected(&mut self, connected: bool) -> Result<()>;
   fn notify_usb_connected(&mut self, connected: bool) -> Result<()>;
   fn set_absolute_volume(&mut self, volume: u8) -> Result<()>;

   fn firmware_version(&mut self) -> Result<FirmwareVersion>;

   fn start_pairing(&mut self) -> Result<()>;
   fn start_chain_pairing(&mut self) -> Result<()>;
   fn stop_pairing(&mut self, reason: StopReason) -> Result<()>;
   fn exit_chain(&mut self, reason: StopReason) -> Result<()>;
   fn clear_paired_devices(&mut self) -> Result<()>;
   fn enter_update_mode(&mut self) -> Result<()>;

   fn resume_playback(&mut self) -> Result<()>;
   fn toggle_play_pause(&mut self) -> Result<()>;
   fn next_track(&mut self) -> Result<()>;
   fn previous_track(&mut self) -> Result<()>;

   fn play_sound_icon(&mut self, icon: SoundIcon, playback: IconPlayback) -> Result<()>;
   fn stop_sound_icon(&mut self, icon: SoundIcon) -> Result<()>;
}
