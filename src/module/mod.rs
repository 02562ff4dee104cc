//! Wireless-module protocol definitions.
//!
//! This module contains the value types spoken across the module SDK
//! boundary: audio sources, pairing and chain-broadcast states, power
//! states, sound-icon identifiers, and the small request/notification
//! payloads the module exchanges with the rest of the firmware.

pub mod transport;

use core::fmt;

use smol_str::SmolStr;

/// Active audio source reported by the module.
#[repr(u8)]
#[derive(
   Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display, strum::EnumString,
)]
pub enum AudioSource {
   #[strum(serialize = "bt")]
   Bluetooth = 0x00,
   #[strum(serialize = "analog", serialize = "aux")]
   Analog = 0x01,
   #[strum(serialize = "usb")]
   Usb = 0x02,
}

/// Pairing state reported by the module.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::FromRepr, strum::Display)]
pub enum PairingState {
   #[default]
   Idle = 0x00,
   Bluetooth = 0x01,
   ChainMaster = 0x02,
   ChainSlave = 0x03,
}

/// Chain-broadcast (multi-unit) state reported by the module.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::FromRepr, strum::Display)]
pub enum ChainState {
   #[default]
   Disabled = 0x00,
   Master = 0x01,
   Slave = 0x02,
   SlavePairing = 0x03,
}

/// Module power states settable over the transport.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum ModulePower {
   Off = 0x00,
   On = 0x01,
}

/// Charger status forwarded to the module for telemetry.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum ChargerStatus {
   Disconnected = 0x00,
   Charging = 0x01,
   Complete = 0x02,
   Fault = 0x03,
}

/// Charging profile selected by the user.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum ChargeType {
   /// Charge to full capacity.
   Full = 0x00,
   /// Cap the charge level to preserve battery health.
   BatteryFriendly = 0x01,
}

/// Housing color variant, forwarded to the module for identification.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum DeviceColor {
   Black = 0x00,
   White = 0x01,
   Berry = 0x02,
   Sage = 0x03,
}

/// Reason attached to a stop-pairing or chain-exit request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum StopReason {
   UserRequest = 0x00,
   Timeout = 0x01,
   PowerOff = 0x02,
}

/// Short audible feedback cues the module can render.
///
/// The identifiers are protocol values; their nominal durations live with
/// the arbiter that schedules them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
pub enum SoundIcon {
   PowerOn = 0x00,
   PowerOff = 0x01,
   BluetoothPairing = 0x02,
   BluetoothConnected = 0x03,
   ChainConnected = 0x04,
   ChainDisconnected = 0x05,
   SlavePairing = 0x06,
   BatteryLow = 0x07,
}

/// Playback mode for a sound icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconPlayback {
   Once,
   Loop,
}

/// Audio paths selectable on the board's analog switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AudioPath {
   Wireless,
   Aux,
   Usb,
}

/// Firmware version string reported by the module or the companion
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion(SmolStr);

impl FirmwareVersion {
   pub fn new(version: impl Into<SmolStr>) -> Self {
      Self(version.into())
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }
}

impl fmt::Display for FirmwareVersion {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.0)
   }
}
