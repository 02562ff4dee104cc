//! Connectivity-status resolution.
//!
//! The latest value of every independent connectivity signal is collected
//! in a [`SignalSet`]; [`SignalSet::resolve`] maps the set to exactly one
//! [`ConnectivityStatus`] through a fixed precedence order. The mapping is
//! a pure function so the precedence table can be tested exhaustively.

use crate::module::{AudioSource, ChainState, PairingState};

/// The single published value summarizing which audio/link mode the
/// device is currently in. Mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum ConnectivityStatus {
   /// Nothing resolved yet (before the first recompute).
   #[default]
   None,
   BluetoothDisconnected,
   BluetoothConnected,
   BluetoothPairing,
   AuxConnected,
   UsbConnected,
   DfuMode,
   ChainMaster,
   ChainSlave,
   SlavePairing,
}

impl ConnectivityStatus {
   /// Whether this status represents an active pairing window.
   pub const fn is_pairing_mode(self) -> bool {
      matches!(self, Self::BluetoothPairing | Self::SlavePairing)
   }

   /// Whether this status represents an established chain-broadcast role.
   pub const fn is_chain_mode(self) -> bool {
      matches!(self, Self::ChainMaster | Self::ChainSlave)
   }
}

/// Latest value of each independent input signal.
///
/// Mutated exclusively by the worker task; jack presence is deliberately
/// absent, it is sampled from the board at resolution time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalSet {
   /// Absent until the module reports a source for the first time.
   pub audio_source: Option<AudioSource>,
   pub pairing_state: PairingState,
   pub chain_state: ChainState,
   pub usb_source_available: bool,
   pub dfu_active: bool,
   pub link_connected: bool,
}

impl SignalSet {
   /// Maps the signal set to one status. First matching rule wins:
   /// chain state, then pairing state, then aux, DFU, USB, link.
   pub fn resolve(&self, jack_connected: bool) -> ConnectivityStatus {
      match self.chain_state {
         ChainState::Master => return ConnectivityStatus::ChainMaster,
         ChainState::Slave => return ConnectivityStatus::ChainSlave,
         ChainState::SlavePairing => return ConnectivityStatus::SlavePairing,
         ChainState::Disabled => {},
      }

      match self.pairing_state {
         PairingState::Bluetooth => return ConnectivityStatus::BluetoothPairing,
         PairingState::ChainMaster => return ConnectivityStatus::ChainMaster,
         PairingState::ChainSlave => return ConnectivityStatus::SlavePairing,
         PairingState::Idle => {},
      }

      if self.audio_source == Some(AudioSource::Analog) && jack_connected {
         return ConnectivityStatus::AuxConnected;
      }

      if self.dfu_active {
         return ConnectivityStatus::DfuMode;
      }

      if self.audio_source == Some(AudioSource::Usb) && self.usb_source_available {
         return ConnectivityStatus::UsbConnected;
      }

      if self.link_connected {
         ConnectivityStatus::BluetoothConnected
      } else {
         ConnectivityStatus::BluetoothDisconnected
      }
   }
}
