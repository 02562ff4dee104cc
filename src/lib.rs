//! Connectivity supervisor for a wireless audio-link module.
//!
//! This crate reconciles asynchronous, bursty connectivity signals
//! (pairing state, chain-broadcast state, active audio source, jack and
//! USB presence, firmware-update mode, link up/down) into one published
//! [`ConnectivityStatus`], and drives the behaviors that hang off it:
//! sound-icon arbitration with a boot-cue exclusivity guard, the module's
//! power-phase handshake, and idle auto-power-off.
//!
//! All state lives in a single cooperative worker task fed by a bounded
//! mailbox ([`link::worker::spawn`]). External collaborators are traits:
//! the opaque module SDK ([`Transport`]), the GPIO/analog board
//! ([`Board`]), and the outbound notification sink ([`EventSink`]).

pub mod board;
pub mod config;
pub mod error;
pub mod event;
pub mod link;
pub mod module;

pub use crate::{
   board::Board,
   config::Config,
   error::{LinkError, Result},
   event::{EventSender, EventSink, SystemEvent},
   link::{
      LinkState,
      power::PowerPhase,
      status::{ConnectivityStatus, SignalSet},
      worker::{LinkHandle, Message, spawn},
   },
   module::transport::{ModuleEvent, SettingRequest, Transport},
};
