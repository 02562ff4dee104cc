//! Cooperative worker owning all connectivity state.
//!
//! One task processes a bounded mailbox of typed messages strictly in
//! arrival order; whenever the mailbox is momentarily empty an idle cycle
//! runs, bounded by a short polling interval. The idle cycle pumps the
//! transport, scans the sound-icon conditions, resolves the connectivity
//! status once a signal burst has settled, and drives the idle auto-off
//! monitor. Power phases execute inside message handling and deliberately
//! block the worker (see `power.rs`).

use std::time::Duration;

use log::{debug, info, warn};
use tokio::{
   select,
   sync::mpsc::{self, error::TrySendError},
   time::{self, Instant, MissedTickBehavior},
};

use crate::{
   board::Board,
   config::Config,
   error::{LinkError, Result},
   event::{EventSender, SystemEvent},
   link::{
      LinkState,
      icons::{IconArbiter, PlayOutcome},
      idle::IdleMonitor,
      power::{PowerPhase, PowerSequencer},
      status::{ConnectivityStatus, SignalSet},
   },
   module::{
      AudioPath, ChainState, ChargeType, ChargerStatus, DeviceColor, ModulePower, SoundIcon,
      StopReason,
      transport::{ModuleEvent, SettingRequest, Transport},
   },
};

/// Mailbox capacity; enqueueing past this backpressures the sender.
const MAILBOX_CAPACITY: usize = 8;
/// Delay before a boot-deferred connected cue is re-posted.
const CONNECT_CUE_RETRY_DELAY: Duration = Duration::from_millis(1_000);
/// Upper bound of the absolute volume scale.
const MAX_VOLUME: u8 = 100;

/// Messages consumed by the link worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
   /// Drive the wireless module through a power phase.
   Power(PowerPhase),
   /// Battery level report to mirror to the module.
   Battery(u8),
   /// Charger status report to mirror to the module.
   Charger(ChargerStatus),
   /// Charging profile selected by the user.
   ChargeType(ChargeType),
   /// Housing color to mirror to the module.
   Color(DeviceColor),
   /// The module signalled readiness; replay cached settings.
   ModuleReady,
   /// User interaction; restarts the idle auto-off window.
   WakeUp,
   VolumeUp,
   VolumeDown,
   StartPairing,
   StartChainPairing,
   StopPairing(StopReason),
   /// The physical aux jack was plugged or unplugged.
   AuxChanged(bool),
   /// The USB audio source appeared or vanished.
   UsbChanged(bool),
   EnterUpdateMode,
   ClearPairedDevices,
   FactoryReset,
   PlayPause,
   NextTrack,
   PreviousTrack,
   PlayIcon(SoundIcon),
   StopIcon(SoundIcon),
   /// Acknowledgment that the cue-enabled toggle has been applied.
   CuesEnabled(bool),
}

/// Handle to a spawned link worker.
///
/// This type is cheaply cloneable; enqueueing is the only cross-context
/// synchronization point and is safe for concurrent senders.
#[derive(Clone)]
pub struct LinkHandle {
   tx: mpsc::Sender<Message>,
   state: LinkState,
}

impl LinkHandle {
   /// Enqueues a message, waiting while the mailbox is full.
   pub async fn send(&self, message: Message) -> Result<()> {
      self
         .tx
         .send(message)
         .await
         .map_err(|_| LinkError::WorkerShutdown)
   }

   /// Fire-and-forget enqueue for callers that must not block.
   pub fn try_send(&self, message: Message) -> Result<()> {
      self.tx.try_send(message).map_err(|e| match e {
         TrySendError::Full(_) => LinkError::MailboxFull,
         TrySendError::Closed(_) => LinkError::WorkerShutdown,
      })
   }

   /// Shared state published by the worker.
   pub fn state(&self) -> &LinkState {
      &self.state
   }
}

/// Spawns the link worker and returns its handle.
pub fn spawn<T, B>(transport: T, board: B, events: EventSender, config: Config) -> LinkHandle
where
   T: Transport + 'static,
   B: Board + 'static,
{
   let state = LinkState::new();
   let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
   let worker = LinkWorker::new(transport, board, events, config, state.clone(), rx, tx.clone());
   tokio::spawn(worker.run());
   LinkHandle { tx, state }
}

pub(crate) struct LinkWorker<T, B> {
   pub(super) transport: T,
   pub(super) board: B,
   pub(super) events: EventSender,
   pub(super) state: LinkState,
   pub(super) config: Config,
   mailbox: mpsc::Receiver<Message>,
   loopback: mpsc::Sender<Message>,

   pub(super) signals: SignalSet,
   published: ConnectivityStatus,
   /// Debounce stamp: set by any signal-affecting event, cleared once a
   /// recompute has executed past the settle window.
   recompute_at: Option<Instant>,
   /// Streaming was active when pairing mode most recently began.
   resume_after_pairing: bool,
   pub(super) icons: IconArbiter,
   pub(super) idle: IdleMonitor,
   pub(super) power: PowerSequencer,
   /// The transport is initialized and `tick()` may be polled.
   pub(super) transport_up: bool,

   // Cached settings replayed to the module after it (re)boots.
   volume: u8,
   battery_level: Option<u8>,
   charger_status: Option<ChargerStatus>,
   color: Option<DeviceColor>,
}

impl<T: Transport, B: Board> LinkWorker<T, B> {
   fn new(
      transport: T,
      board: B,
      events: EventSender,
      config: Config,
      state: LinkState,
      mailbox: mpsc::Receiver<Message>,
      loopback: mpsc::Sender<Message>,
   ) -> Self {
      let icons = IconArbiter::new(config.boot_cue_grace(), config.resolve_holdoff());
      let idle = IdleMonitor::new(config.auto_off());
      let volume = config.default_volume;
      Self {
         transport,
         board,
         events,
         state,
         config,
         mailbox,
         loopback,
         signals: SignalSet::default(),
         published: ConnectivityStatus::None,
         recompute_at: None,
         resume_after_pairing: false,
         icons,
         idle,
         power: PowerSequencer::new(),
         transport_up: false,
         volume,
         battery_level: None,
         charger_status: None,
         color: None,
      }
   }

   async fn run(mut self) {
      info!("link worker starting up");

      let mut idle_tick = time::interval(self.config.idle_poll());
      idle_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

      loop {
         select! {
             biased;
             msg = self.mailbox.recv() => {
                 let Some(msg) = msg else {
                     info!("link worker shutting down");
                     break;
                 };
                 self.handle_message(msg).await;
             }
             _ = idle_tick.tick() => {
                 self.idle_cycle();
             }
         }
      }

      // Cleanup
      if self.transport_up {
         self.transport.deinit();
         self.board.set_module_power(false);
      }
   }

   async fn handle_message(&mut self, message: Message) {
      match message {
         Message::Power(phase) => self.run_power_phase(phase).await,
         Message::Battery(percent) => {
            self.battery_level = Some(percent);
            if let Err(e) = self.transport.notify_battery_level(percent) {
               warn!("battery level forward failed: {e}");
            }
         },
         Message::Charger(status) => {
            self.charger_status = Some(status);
            if let Err(e) = self.transport.notify_charger_status(status) {
               warn!("charger status forward failed: {e}");
            }
         },
         Message::ChargeType(charge_type) => {
            self.events.emit(SystemEvent::ChargeType(charge_type));
         },
         Message::Color(color) => {
            self.color = Some(color);
            if let Err(e) = self.transport.set_color(color) {
               warn!("color forward failed: {e}");
            }
         },
         Message::ModuleReady => {
            info!("module ready, replaying cached settings");
            self.push_cached_settings();
         },
         Message::WakeUp => {
            debug!("wake-up, restarting idle window");
            self.idle.disarm();
         },
         Message::VolumeUp => self.step_volume(i16::from(self.config.volume_step)),
         Message::VolumeDown => self.step_volume(-i16::from(self.config.volume_step)),
         Message::StartPairing => {
            if let Err(e) = self.transport.start_pairing() {
               warn!("start pairing failed: {e}");
            }
         },
         Message::StartChainPairing => {
            if let Err(e) = self.transport.start_chain_pairing() {
               warn!("start chain pairing failed: {e}");
            }
         },
         Message::StopPairing(reason) => {
            let result = if self.signals.chain_state != ChainState::Disabled {
               self.transport.exit_chain(reason)
            } else {
               self.transport.stop_pairing(reason)
            };
            if let Err(e) = result {
               warn!("stop pairing ({reason}) failed: {e}");
            }
         },
         Message::AuxChanged(connected) => {
            if let Err(e) = self.transport.notify_aux_connected(connected) {
               warn!("aux notification failed: {e}");
            }
            self.mark_recompute();
         },
         Message::UsbChanged(available) => {
            self.signals.usb_source_available = available;
            if let Err(e) = self.transport.notify_usb_connected(available) {
               warn!("usb notification failed: {e}");
            }
            self.mark_recompute();
         },
         Message::EnterUpdateMode => {
            if let Err(e) = self.transport.enter_update_mode() {
               warn!("enter update mode failed: {e}");
            }
         },
         Message::ClearPairedDevices => {
            if let Err(e) = self.transport.clear_paired_devices() {
               warn!("clear paired devices failed: {e}");
            }
         },
         Message::FactoryReset => {
            info!("factory reset");
            if let Err(e) = self.transport.clear_paired_devices() {
               warn!("clear paired devices failed: {e}");
            }
            self.volume = self.config.default_volume;
            if let Err(e) = self.transport.set_absolute_volume(self.volume) {
               warn!("volume reset failed: {e}");
            }
            self.events.emit(SystemEvent::FactoryReset);
         },
         Message::PlayPause => {
            if let Err(e) = self.transport.toggle_play_pause() {
               warn!("play/pause failed: {e}");
            }
         },
         Message::NextTrack => {
            if let Err(e) = self.transport.next_track() {
               warn!("next track failed: {e}");
            }
         },
         Message::PreviousTrack => {
            if let Err(e) = self.transport.previous_track() {
               warn!("previous track failed: {e}");
            }
         },
         Message::PlayIcon(icon) => {
            let now = Instant::now();
            if self.icons.request_play(icon, now, &mut self.transport) == PlayOutcome::Deferred {
               debug!("deferring {icon} cue until the boot cue finishes");
               let loopback = self.loopback.clone();
               tokio::spawn(async move {
                  time::sleep(CONNECT_CUE_RETRY_DELAY).await;
                  let _ = loopback.send(Message::PlayIcon(icon)).await;
               });
            }
         },
         Message::StopIcon(icon) => {
            self.icons.request_stop(icon, &mut self.transport);
         },
         Message::CuesEnabled(enabled) => {
            info!("sound cues {}", if enabled { "enabled" } else { "disabled" });
            self.icons.set_cues_enabled(enabled);
         },
      }
   }

   /// One idle cycle: pump the transport, advance the arbiter, resolve a
   /// settled status change, run the auto-off monitor.
   fn idle_cycle(&mut self) {
      let now = Instant::now();
      if self.transport_up {
         self.drain_module_events();
      }
      self.icons.update_guard(now);
      self.icons.scan(self.published, now, &mut self.transport);
      self.try_resolve(now);
      self
         .idle
         .tick(now, self.power.powered_on(), &mut self.transport);
   }

   /// Drains and applies every event the transport parsed. Also called
   /// from inside power phases, where the worker polls while blocked.
   pub(super) fn drain_module_events(&mut self) {
      for event in self.transport.tick() {
         self.apply_module_event(event);
      }
   }

   fn apply_module_event(&mut self, event: ModuleEvent) {
      match event {
         ModuleEvent::SystemReady => {
            debug!("module reports system ready");
         },
         ModuleEvent::PowerState(power) => {
            debug!("module power state: {power}");
            if power == ModulePower::Off {
               self.power.confirm_off();
            }
         },
         ModuleEvent::AudioSourceChanged(source) => {
            if self.signals.audio_source != Some(source) {
               info!("audio source: {source}");
            }
            self.signals.audio_source = Some(source);
            self.mark_recompute();
         },
         ModuleEvent::VolumeChanged(volume) => {
            self.volume = volume;
            self.events.emit(SystemEvent::Volume(volume));
         },
         ModuleEvent::StreamStateChanged(active) => {
            self.state.set_streaming(active);
            self.events.emit(SystemEvent::StreamingChanged(active));
         },
         ModuleEvent::LinkConnected => {
            self.idle.on_link_connected(Instant::now());
            self.signals.link_connected = self.idle.connected_count() > 0;
            self.mark_recompute();
         },
         ModuleEvent::LinkDisconnected => {
            self.idle.on_link_disconnected(Instant::now());
            self.signals.link_connected = self.idle.connected_count() > 0;
            self.mark_recompute();
         },
         ModuleEvent::PairingStateChanged(state) => {
            self.signals.pairing_state = state;
            self.mark_recompute();
         },
         ModuleEvent::ChainStateChanged(state) => {
            self.signals.chain_state = state;
            self.mark_recompute();
         },
         ModuleEvent::UsbConnectedChanged(available) => {
            self.signals.usb_source_available = available;
            self.mark_recompute();
         },
         ModuleEvent::UpdateModeChanged(active) => {
            self.signals.dfu_active = active;
            self.mark_recompute();
         },
         ModuleEvent::Request(request) => self.forward_setting_request(request),
      }
   }

   fn forward_setting_request(&self, request: SettingRequest) {
      let event = match request {
         SettingRequest::Brightness(value) => SystemEvent::Brightness(value),
         SettingRequest::Bass(value) => SystemEvent::Bass(value),
         SettingRequest::Treble(value) => SystemEvent::Treble(value),
         SettingRequest::EcoMode(enabled) => SystemEvent::EcoMode(enabled),
         SettingRequest::OffTimer(minutes) => SystemEvent::OffTimer(minutes),
         SettingRequest::CuesEnabled(enabled) => SystemEvent::CuesEnabled(enabled),
      };
      self.events.emit(event);
   }

   fn mark_recompute(&mut self) {
      self.recompute_at = Some(Instant::now());
   }

   /// Runs the resolver once a burst of signal changes has settled and
   /// the boot-cue window permits it. The pending stamp survives a gated
   /// attempt so the recompute fires as soon as the gate opens.
   fn try_resolve(&mut self, now: Instant) {
      let Some(stamp) = self.recompute_at else {
         return;
      };
      if now.duration_since(stamp) <= self.config.settle_window() {
         return;
      }
      if !self.icons.resolve_holdoff_passed(now) {
         return;
      }
      if self.signals.audio_source.is_none() || !self.icons.resolver_unblocked() {
         return;
      }

      self.recompute_at = None;
      self.resolve_and_publish(now);
   }

   fn resolve_and_publish(&mut self, now: Instant) {
      let jack = self.board.jack_connected();
      let status = self.signals.resolve(jack);
      let previous = self.published;

      // Chain modes are noisy: unrelated signal churn re-resolves to the
      // same role and must not replay the chain-entry cue.
      if status == previous && status.is_chain_mode() {
         debug!("suppressing repeated {status} publish");
         return;
      }

      self.published = status;
      self.state.set_status(status);
      info!("connectivity status: {previous} -> {status}");
      self.events.emit(SystemEvent::StatusChanged(status));
      self.apply_audio_path(status);

      if status.is_pairing_mode() {
         if !previous.is_pairing_mode() {
            self.resume_after_pairing = self.state.streaming();
         }
      } else if previous.is_pairing_mode() && std::mem::take(&mut self.resume_after_pairing) {
         // The pairing window interrupted a live stream; pick it back up.
         if let Err(e) = self.transport.resume_playback() {
            warn!("resume playback failed: {e}");
         }
      }

      self
         .icons
         .on_status_changed(previous, status, now, &mut self.transport);
   }

   fn apply_audio_path(&mut self, status: ConnectivityStatus) {
      let path = match status {
         ConnectivityStatus::AuxConnected => AudioPath::Aux,
         ConnectivityStatus::UsbConnected => AudioPath::Usb,
         _ => AudioPath::Wireless,
      };
      if let Err(e) = self.board.select_audio_path(path) {
         warn!("audio path switch to {path} failed: {e}");
      }
   }

   fn step_volume(&mut self, delta: i16) {
      let next = (i16::from(self.volume) + delta).clamp(0, i16::from(MAX_VOLUME)) as u8;
      if next == self.volume {
         return;
      }
      self.volume = next;
      if let Err(e) = self.transport.set_absolute_volume(next) {
         warn!("volume update failed: {e}");
      }
      self.events.emit(SystemEvent::Volume(next));
   }

   /// Pushes the cached battery/charger/color/volume state to the module.
   pub(super) fn push_cached_settings(&mut self) {
      if let Some(percent) = self.battery_level
         && let Err(e) = self.transport.notify_battery_level(percent)
      {
         warn!("battery level replay failed: {e}");
      }
      if let Some(status) = self.charger_status
         && let Err(e) = self.transport.notify_charger_status(status)
      {
         warn!("charger status replay failed: {e}");
      }
      if let Some(color) = self.color
         && let Err(e) = self.transport.set_color(color)
      {
         warn!("color replay failed: {e}");
      }
      if let Err(e) = self.transport.set_absolute_volume(self.volume) {
         warn!("volume replay failed: {e}");
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{
      board::testing::StubBoard,
      event::testing::RecordingSink,
      module::{
         AudioSource, IconPlayback, PairingState,
         transport::testing::{Call, ScriptedTransport},
      },
   };

   struct Harness {
      handle: LinkHandle,
      transport: ScriptedTransport,
      board: StubBoard,
      sink: std::sync::Arc<RecordingSink>,
   }

   impl Harness {
      fn calls(&self) -> Vec<Call> {
         self.transport.script.lock().calls.clone()
      }

      fn count(&self, call: Call) -> usize {
         self.transport.script.lock().count(&call)
      }
   }

   /// Spawns a worker and drives it through the On phase. The scripted
   /// module is already booted and reports a Bluetooth source.
   async fn spawn_powered(cues_enabled: bool) -> Harness {
      let _ = env_logger::builder().is_test(true).try_init();

      let transport = ScriptedTransport::ready(AudioSource::Bluetooth);
      let board = StubBoard::new();
      let sink = RecordingSink::new();
      let handle = spawn(
         transport.clone(),
         board.clone(),
         sink.clone(),
         Config::default(),
      );

      handle.send(Message::Power(PowerPhase::On)).await.unwrap();
      if !cues_enabled {
         handle.send(Message::CuesEnabled(false)).await.unwrap();
      }
      // Let the On phase and the first settle window pass.
      time::sleep(Duration::from_secs(2)).await;

      Harness {
         handle,
         transport,
         board,
         sink,
      }
   }

   #[tokio::test(start_paused = true)]
   async fn test_on_phase_brings_module_up_and_publishes_baseline() {
      let h = spawn_powered(false).await;

      assert!(h.board.state.lock().module_powered);
      assert_eq!(h.count(Call::Init), 1);
      assert_eq!(h.count(Call::SetPowerState(ModulePower::On)), 1);
      // Cached default volume replayed after boot.
      assert_eq!(h.count(Call::SetVolume(40)), 1);

      // First resolve after the audio source arrived.
      assert_eq!(
         h.sink.status_changes(),
         vec![ConnectivityStatus::BluetoothDisconnected]
      );
      assert_eq!(
         h.handle.state().status(),
         ConnectivityStatus::BluetoothDisconnected
      );
      assert!(h.handle.state().module_version().is_some());
   }

   #[tokio::test(start_paused = true)]
   async fn test_signal_burst_resolves_once_after_settle_window() {
      let h = spawn_powered(false).await;

      // Three signal-affecting events within 50ms.
      h.transport
         .push_event(ModuleEvent::UsbConnectedChanged(true));
      time::sleep(Duration::from_millis(25)).await;
      h.transport.push_event(ModuleEvent::LinkConnected);
      time::sleep(Duration::from_millis(25)).await;
      h.transport
         .push_event(ModuleEvent::PairingStateChanged(PairingState::Bluetooth));

      // Inside the settle window: nothing published yet.
      time::sleep(Duration::from_millis(150)).await;
      assert_eq!(h.sink.status_changes().len(), 1);

      time::sleep(Duration::from_millis(400)).await;
      assert_eq!(
         h.sink.status_changes(),
         vec![
            ConnectivityStatus::BluetoothDisconnected,
            ConnectivityStatus::BluetoothPairing,
         ]
      );
   }

   #[tokio::test(start_paused = true)]
   async fn test_chain_master_republish_is_suppressed() {
      let h = spawn_powered(false).await;

      h.transport
         .push_event(ModuleEvent::ChainStateChanged(ChainState::Master));
      time::sleep(Duration::from_millis(400)).await;

      // Unrelated signal churn while already chain master.
      h.transport
         .push_event(ModuleEvent::AudioSourceChanged(AudioSource::Analog));
      time::sleep(Duration::from_millis(400)).await;

      let publishes = h
         .sink
         .status_changes()
         .into_iter()
         .filter(|s| *s == ConnectivityStatus::ChainMaster)
         .count();
      assert_eq!(publishes, 1);
   }

   #[tokio::test(start_paused = true)]
   async fn test_resume_playback_after_pairing_window() {
      let h = spawn_powered(false).await;

      h.transport.push_event(ModuleEvent::StreamStateChanged(true));
      h.transport
         .push_event(ModuleEvent::PairingStateChanged(PairingState::Bluetooth));
      time::sleep(Duration::from_millis(400)).await;
      assert_eq!(h.count(Call::ResumePlayback), 0);

      h.transport
         .push_event(ModuleEvent::PairingStateChanged(PairingState::Idle));
      time::sleep(Duration::from_millis(400)).await;
      assert_eq!(h.count(Call::ResumePlayback), 1);

      // Leaving and re-entering a non-pairing status must not replay it.
      h.transport.push_event(ModuleEvent::LinkConnected);
      time::sleep(Duration::from_millis(400)).await;
      assert_eq!(h.count(Call::ResumePlayback), 1);
   }

   #[tokio::test(start_paused = true)]
   async fn test_boot_cue_guard_suppresses_status_publishing() {
      let h = spawn_powered(true).await;

      // Audio source arrived during On, but the boot cue has not played:
      // nothing may publish.
      assert!(h.sink.status_changes().is_empty());

      h.handle
         .send(Message::PlayIcon(SoundIcon::PowerOn))
         .await
         .unwrap();
      time::sleep(Duration::from_millis(1_500)).await;
      assert!(h.sink.status_changes().is_empty());

      // Past nominal duration + grace the held recompute fires.
      time::sleep(Duration::from_millis(1_500)).await;
      assert_eq!(
         h.sink.status_changes(),
         vec![ConnectivityStatus::BluetoothDisconnected]
      );
   }

   #[tokio::test(start_paused = true)]
   async fn test_connected_cue_deferred_past_boot_cue() {
      let h = spawn_powered(true).await;

      h.handle
         .send(Message::PlayIcon(SoundIcon::PowerOn))
         .await
         .unwrap();
      h.handle
         .send(Message::PlayIcon(SoundIcon::BluetoothConnected))
         .await
         .unwrap();

      time::sleep(Duration::from_millis(500)).await;
      assert_eq!(
         h.count(Call::PlayIcon(SoundIcon::BluetoothConnected, IconPlayback::Once)),
         0
      );

      // The loopback keeps re-posting until the boot cue is done.
      time::sleep(Duration::from_secs(4)).await;
      assert_eq!(
         h.count(Call::PlayIcon(SoundIcon::BluetoothConnected, IconPlayback::Once)),
         1
      );
   }

   #[tokio::test(start_paused = true)]
   async fn test_off_phase_times_out_and_forces_shutdown() {
      let h = spawn_powered(false).await;
      h.transport.script.lock().confirm_power_off = false;

      h.handle.send(Message::Power(PowerPhase::Off)).await.unwrap();
      // Queued behind the blocking phase; must only run afterwards.
      h.handle.send(Message::VolumeUp).await.unwrap();

      time::sleep(Duration::from_secs(3)).await;

      assert_eq!(h.count(Call::Deinit), 1);
      assert!(!h.board.state.lock().module_powered);

      let calls = h.calls();
      let deinit_at = calls.iter().position(|c| *c == Call::Deinit).unwrap();
      let volume_at = calls
         .iter()
         .position(|c| *c == Call::SetVolume(45))
         .expect("queued volume change ran after the phase");
      assert!(deinit_at < volume_at);
   }

   #[tokio::test(start_paused = true)]
   async fn test_idle_auto_off_requests_power_off_once() {
      let h = spawn_powered(false).await;

      h.transport.push_event(ModuleEvent::LinkConnected);
      time::sleep(Duration::from_millis(100)).await;
      h.transport.push_event(ModuleEvent::LinkDisconnected);
      time::sleep(Duration::from_millis(100)).await;

      // The On phase issued one On request; count Off requests only.
      time::sleep(Duration::from_secs(301)).await;
      assert_eq!(h.count(Call::SetPowerState(ModulePower::Off)), 1);
   }

   #[tokio::test(start_paused = true)]
   async fn test_aux_status_switches_audio_path() {
      let h = spawn_powered(false).await;
      h.board.set_jack(true);

      h.transport
         .push_event(ModuleEvent::AudioSourceChanged(AudioSource::Analog));
      time::sleep(Duration::from_millis(400)).await;

      assert_eq!(h.handle.state().status(), ConnectivityStatus::AuxConnected);
      assert_eq!(
         h.board.state.lock().audio_paths.last(),
         Some(&AudioPath::Aux)
      );
   }

   #[tokio::test(start_paused = true)]
   async fn test_setting_requests_forwarded_to_subsystems() {
      let h = spawn_powered(false).await;

      h.transport
         .push_event(ModuleEvent::Request(SettingRequest::Bass(3)));
      h.transport
         .push_event(ModuleEvent::Request(SettingRequest::CuesEnabled(false)));
      time::sleep(Duration::from_millis(100)).await;

      let events = h.sink.events();
      assert!(events.contains(&SystemEvent::Bass(3)));
      assert!(events.contains(&SystemEvent::CuesEnabled(false)));
   }

   #[tokio::test(start_paused = true)]
   async fn test_volume_steps_clamp_and_forward() {
      let h = spawn_powered(false).await;

      for _ in 0..20 {
         h.handle.send(Message::VolumeUp).await.unwrap();
      }
      time::sleep(Duration::from_millis(100)).await;
      // 40 + 20 * 5 clamps at 100.
      assert_eq!(h.count(Call::SetVolume(100)), 1);

      h.handle.send(Message::VolumeDown).await.unwrap();
      time::sleep(Duration::from_millis(100)).await;
      // Once stepping up through 95, once stepping back down to it.
      assert_eq!(h.count(Call::SetVolume(95)), 2);
   }

   #[tokio::test(start_paused = true)]
   async fn test_battery_and_charger_reports_mirrored() {
      let h = spawn_powered(false).await;

      h.handle.send(Message::Battery(73)).await.unwrap();
      h.handle
         .send(Message::Charger(ChargerStatus::Charging))
         .await
         .unwrap();
      time::sleep(Duration::from_millis(100)).await;

      assert_eq!(h.count(Call::NotifyBattery(73)), 1);
      assert_eq!(h.count(Call::NotifyCharger(ChargerStatus::Charging)), 1);
   }

   #[tokio::test(start_paused = true)]
   async fn test_stop_pairing_picks_chain_exit_when_chained() {
      let h = spawn_powered(false).await;

      h.handle
         .send(Message::StopPairing(StopReason::UserRequest))
         .await
         .unwrap();
      time::sleep(Duration::from_millis(100)).await;
      assert_eq!(h.count(Call::StopPairing(StopReason::UserRequest)), 1);

      h.transport
         .push_event(ModuleEvent::ChainStateChanged(ChainState::Master));
      time::sleep(Duration::from_millis(400)).await;
      h.handle
         .send(Message::StopPairing(StopReason::UserRequest))
         .await
         .unwrap();
      time::sleep(Duration::from_millis(100)).await;
      assert_eq!(h.count(Call::ExitChain(StopReason::UserRequest)), 1);
   }
}
