//! Outbound notifications to the audio and system subsystems.
//!
//! This module provides the event infrastructure for forwarding resolved
//! connectivity state and module-originated setting requests to the rest
//! of the device firmware.

use std::sync::Arc;

use crate::{link::status::ConnectivityStatus, module::ChargeType};

/// Events emitted by the link supervisor for other subsystems to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
   /// The published connectivity status changed.
   StatusChanged(ConnectivityStatus),
   /// An audio streaming session started or stopped.
   StreamingChanged(bool),
   /// Absolute volume changed, either locally or from the module side.
   Volume(u8),
   /// The module requested a display brightness change.
   Brightness(u8),
   /// The module requested a bass adjustment.
   Bass(i8),
   /// The module requested a treble adjustment.
   Treble(i8),
   /// The module requested toggling eco mode.
   EcoMode(bool),
   /// The module requested a new auto-off timer value in minutes.
   OffTimer(u16),
   /// The module requested enabling or disabling sound cues.
   CuesEnabled(bool),
   /// A charge-type selection should be applied by the battery subsystem.
   ChargeType(ChargeType),
   /// A factory reset was performed on the module side.
   FactoryReset,
}

/// Trait for implementing event emission.
pub trait EventSink: Send + Sync {
   /// Emits an event to all registered listeners.
   fn emit(&self, event: SystemEvent);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventSink>;
