//! Board collaborator contract.
//!
//! The board owns the GPIO and analog plumbing around the wireless module:
//! the headphone-jack detect line, the module's power/reset rails, the
//! amplifier mute, the audio-path switch, and the companion controller
//! whose firmware version it can report.

use crate::{
   error::Result,
   module::{AudioPath, FirmwareVersion},
};

/// Hardware services the supervisor consumes.
pub trait Board: Send {
   /// Samples the physical jack-detect line. Never cached by the caller;
   /// queried at status-resolution time.
   fn jack_connected(&mut self) -> bool;

   /// Firmware version of the companion controller, if reachable.
   fn companion_firmware_version(&mut self) -> Result<FirmwareVersion>;

   /// Mutes or unmutes the speaker amplifier.
   fn set_amp_mute(&mut self, mute: bool) -> Result<()>;

   /// Drives the module's power and reset rails.
   fn set_module_power(&mut self, on: bool);

   /// Routes the analog audio-path switch.
   fn select_audio_path(&mut self, path: AudioPath) -> Result<()>;
}
