/// Audio session manager
///
/// Owns the looping background track and the effect catalog. All callers
/// sharing one manager see the same mute flags, volumes and cooldowns;
/// separate managers are fully independent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use super::backend::{AudioBackend, LoadOptions, PlaybackHandle, SessionConfig};
use super::events::{EventBus, SoundEvent, SubscriberId};
use super::source::{EffectName, SoundCatalog};
use super::tasks::{TaskKey, TaskSet};
use super::throttle::Throttle;
use super::volume::{Ducker, Volume};
use crate::config::{PrefsStore, SoundConfig, SoundPrefs, SoundTuning};

/// Per-call playback options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayOptions {
    /// Lower the background music while the effect plays
    pub duck: bool,

    /// Volume override for this call only
    pub volume: Option<f32>,
}

impl PlayOptions {
    pub fn ducked() -> Self {
        Self {
            duck: true,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// What happened to a play request. Callers are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played,
    /// Accepted and handed to the effects worker
    Queued,
    Muted,
    Throttled,
    LoadFailed,
    PlaybackFailed,
    Disposed,
}

/// Load state of one effect resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

/// Snapshot of the session for status displays and tests
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub music_muted: bool,
    pub effects_muted: bool,
    pub background_baseline: f32,
    pub background_current: f32,
    pub effects_volume: f32,
    pub music_loaded: bool,
    pub music_playing: bool,
    pub duck_depth: usize,
    pub effects: Vec<(EffectName, LoadState)>,
}

impl SessionStatus {
    pub fn effect_state(&self, name: EffectName) -> LoadState {
        self.effects
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, state)| *state)
            .unwrap_or(LoadState::Unloaded)
    }

    pub fn is_ducked(&self) -> bool {
        self.duck_depth > 0
    }
}

/// Construction options for [`AudioSessionManager::create`]
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub prefs: SoundPrefs,
    pub tuning: SoundTuning,
    pub session: SessionConfig,
    pub store: Option<PrefsStore>,
}

impl SessionOptions {
    pub fn from_config(config: &SoundConfig) -> Self {
        Self {
            prefs: config.prefs,
            tuning: config.tuning,
            ..Self::default()
        }
    }

    pub fn with_prefs(mut self, prefs: SoundPrefs) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn with_tuning(mut self, tuning: SoundTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_store(mut self, store: PrefsStore) -> Self {
        self.store = Some(store);
        self
    }
}

enum EffectSlot {
    Unloaded,
    Loading,
    Loaded(Arc<dyn PlaybackHandle>),
}

impl EffectSlot {
    fn state(&self) -> LoadState {
        match self {
            EffectSlot::Unloaded => LoadState::Unloaded,
            EffectSlot::Loading => LoadState::Loading,
            EffectSlot::Loaded(_) => LoadState::Loaded,
        }
    }
}

struct SoundState {
    music_muted: bool,
    effects_muted: bool,
    background_volume: Volume,
    effects_volume: Volume,
    current_background: Volume,
    background: Option<Arc<dyn PlaybackHandle>>,
    effects: HashMap<EffectName, EffectSlot>,
    throttle: Throttle,
    ducker: Ducker,
}

impl SoundState {
    fn new(prefs: SoundPrefs) -> Self {
        let background_volume = Volume::new(prefs.background_volume);
        Self {
            music_muted: prefs.music_muted,
            effects_muted: prefs.effects_muted,
            background_volume,
            effects_volume: Volume::new(prefs.effects_volume),
            current_background: background_volume,
            background: None,
            effects: EffectName::ALL
                .into_iter()
                .map(|name| (name, EffectSlot::Unloaded))
                .collect(),
            throttle: Throttle::new(),
            ducker: Ducker::new(),
        }
    }

    fn prefs(&self) -> SoundPrefs {
        SoundPrefs {
            music_muted: self.music_muted,
            effects_muted: self.effects_muted,
            background_volume: self.background_volume.level(),
            effects_volume: self.effects_volume.level(),
        }
    }

    fn slot(&self, name: EffectName) -> &EffectSlot {
        self.effects.get(&name).unwrap_or(&EffectSlot::Unloaded)
    }
}

struct PlayRequest {
    name: EffectName,
    options: PlayOptions,
}

struct Worker {
    requests: Sender<PlayRequest>,
    thread: JoinHandle<()>,
}

struct Inner {
    backend: Arc<dyn AudioBackend>,
    catalog: SoundCatalog,
    tuning: SoundTuning,
    session: SessionConfig,
    store: Option<PrefsStore>,
    state: Mutex<SoundState>,
    tasks: TaskSet,
    events: EventBus,
    worker: Mutex<Option<Worker>>,
    disposed: AtomicBool,
}

/// Background music plus effects, with throttling and ducking.
///
/// Cheap to clone; clones share one session. Audio failures are logged and
/// never returned to callers.
#[derive(Clone)]
pub struct AudioSessionManager {
    inner: Arc<Inner>,
}

impl AudioSessionManager {
    /// Create a session. Nothing is loaded until [`initialize`](Self::initialize) or the first play.
    pub fn create(
        backend: Arc<dyn AudioBackend>,
        catalog: SoundCatalog,
        options: SessionOptions,
    ) -> Self {
        let inner = Arc::new(Inner {
            backend,
            catalog,
            tuning: options.tuning,
            session: options.session,
            store: options.store,
            state: Mutex::new(SoundState::new(options.prefs.sanitized())),
            tasks: TaskSet::new(),
            events: EventBus::new(),
            worker: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        *inner.worker.lock() = spawn_worker(Arc::downgrade(&inner));
        Self { inner }
    }

    /// Configure the platform session, start the background track, and
    /// schedule effect preloading. Never blocks on the preload.
    pub fn initialize(&self) {
        let inner = &self.inner;
        if inner.is_disposed() {
            return;
        }

        if let Err(e) = inner.backend.configure_session(&inner.session) {
            tracing::warn!("Audio session configuration failed, continuing: {}", e);
        }

        if inner.ensure_background().is_some() {
            inner.start_music_if_unmuted();
        }

        inner.start_preload();
        tracing::info!("Audio session initialized");
    }

    /// Pause or resume the background track and persist the preference
    pub fn set_music_muted(&self, muted: bool) {
        let inner = &self.inner;
        if inner.is_disposed() {
            return;
        }

        inner.state.lock().music_muted = muted;
        inner.persist();

        if muted {
            let background = inner.state.lock().background.clone();
            if let Some(background) = background {
                if let Err(e) = background.pause() {
                    tracing::debug!("Pausing background music failed: {}", e);
                }
                inner.events.publish(SoundEvent::MusicPaused);
            }
        } else if inner.ensure_background().is_some() {
            inner.start_music_if_unmuted();
        }
    }

    /// Returns the new muted state
    pub fn toggle_music_muted(&self) -> bool {
        let muted = !self.music_muted();
        self.set_music_muted(muted);
        muted
    }

    pub fn set_effects_muted(&self, muted: bool) {
        if self.inner.is_disposed() {
            return;
        }
        self.inner.state.lock().effects_muted = muted;
        self.inner.persist();
    }

    /// Returns the new muted state
    pub fn toggle_effects_muted(&self) -> bool {
        let muted = !self.effects_muted();
        self.set_effects_muted(muted);
        muted
    }

    /// Set the baseline effect volume, clamped into [0, 1]. Returns the stored value.
    pub fn set_effects_volume(&self, volume: f32) -> f32 {
        if self.inner.is_disposed() {
            return self.effects_volume();
        }
        let volume = Volume::new(volume);
        self.inner.state.lock().effects_volume = volume;
        self.inner.persist();
        volume.level()
    }

    /// Set the baseline music volume, clamped into [0, 1]. Returns the stored value.
    ///
    /// While ducked, the new baseline takes effect when the duck is released.
    pub fn set_background_volume(&self, volume: f32) -> f32 {
        if self.inner.is_disposed() {
            return self.background_volume();
        }
        let volume = Volume::new(volume);
        {
            let mut state = self.inner.state.lock();
            state.background_volume = volume;
            state.current_background = if state.ducker.is_ducked() {
                volume.scaled(self.inner.tuning.duck_factor)
            } else {
                volume
            };
            if let Some(background) = &state.background {
                if let Err(e) = background.set_volume(state.current_background.level()) {
                    tracing::debug!("Setting background volume failed: {}", e);
                }
            }
        }
        self.inner.persist();
        volume.level()
    }

    /// Play an effect now, loading it first if needed.
    ///
    /// Dropped silently while effects are muted or within the effect's cooldown.
    pub fn play(&self, name: EffectName, options: PlayOptions) -> PlayOutcome {
        if let Err(outcome) = self.inner.admit(name) {
            return outcome;
        }
        self.inner.perform(name, options)
    }

    /// Fire-and-forget variant of [`play`](Self::play).
    ///
    /// Mute and cooldown are decided on the calling thread; loading and
    /// playback happen on the effects worker in submission order.
    pub fn trigger(&self, name: EffectName, options: PlayOptions) -> PlayOutcome {
        if let Err(outcome) = self.inner.admit(name) {
            return outcome;
        }

        let request = PlayRequest { name, options };
        let rejected = match self.inner.worker.lock().as_ref() {
            Some(worker) => worker.requests.send(request).err().map(|e| e.into_inner()),
            None => Some(request),
        };

        match rejected {
            None => PlayOutcome::Queued,
            Some(request) => self.inner.perform(request.name, request.options),
        }
    }

    /// Cancel pending work, stop the music, and turn every later call into a no-op
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        inner.stop_worker();
        inner.tasks.close();

        {
            let mut state = inner.state.lock();
            state.ducker.clear();
            state.current_background = state.background_volume;
            if let Some(background) = &state.background {
                if let Err(e) = background.set_volume(state.background_volume.level()) {
                    tracing::debug!("Restoring background volume failed: {}", e);
                }
                if let Err(e) = background.pause() {
                    tracing::debug!("Pausing background music failed: {}", e);
                }
            }
        }

        inner.events.publish(SoundEvent::Disposed);
        tracing::info!("Audio session disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    pub fn music_muted(&self) -> bool {
        self.inner.state.lock().music_muted
    }

    pub fn effects_muted(&self) -> bool {
        self.inner.state.lock().effects_muted
    }

    pub fn effects_volume(&self) -> f32 {
        self.inner.state.lock().effects_volume.level()
    }

    /// Baseline music volume
    pub fn background_volume(&self) -> f32 {
        self.inner.state.lock().background_volume.level()
    }

    /// Current preferences as they would be persisted
    pub fn prefs(&self) -> SoundPrefs {
        self.inner.state.lock().prefs()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.inner.state.lock();
        SessionStatus {
            music_muted: state.music_muted,
            effects_muted: state.effects_muted,
            background_baseline: state.background_volume.level(),
            background_current: state.current_background.level(),
            effects_volume: state.effects_volume.level(),
            music_loaded: state.background.is_some(),
            music_playing: state
                .background
                .as_ref()
                .is_some_and(|background| background.is_playing()),
            duck_depth: state.ducker.depth(),
            effects: EffectName::ALL
                .into_iter()
                .map(|name| (name, state.slot(name).state()))
                .collect(),
        }
    }

    /// Number of preload and duck-release tasks still pending
    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.pending()
    }

    pub fn subscribe(&self) -> (Receiver<SoundEvent>, SubscriberId) {
        self.inner.events.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.inner.events.unsubscribe(id);
    }
}

fn spawn_worker(inner: Weak<Inner>) -> Option<Worker> {
    let (tx, rx) = unbounded::<PlayRequest>();

    let spawned = thread::Builder::new()
        .name("audio-effects".to_string())
        .spawn(move || {
            tracing::debug!("Effects worker started");
            while let Ok(request) = rx.recv() {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.perform(request.name, request.options);
            }
            tracing::debug!("Effects worker stopped");
        });

    match spawned {
        Ok(thread) => Some(Worker {
            requests: tx,
            thread,
        }),
        Err(e) => {
            tracing::warn!("Effects worker unavailable, triggers will play inline: {}", e);
            None
        }
    }
}

impl Inner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Synchronous gate evaluated at call time
    fn admit(&self, name: EffectName) -> Result<(), PlayOutcome> {
        if self.is_disposed() {
            return Err(PlayOutcome::Disposed);
        }

        let mut state = self.state.lock();
        if state.effects_muted {
            tracing::trace!("Effects muted, dropping {}", name);
            return Err(PlayOutcome::Muted);
        }
        if !state.throttle.should_trigger(name, Instant::now()) {
            drop(state);
            tracing::debug!("Throttled {}", name);
            self.events.publish(SoundEvent::EffectThrottled(name));
            return Err(PlayOutcome::Throttled);
        }
        Ok(())
    }

    fn perform(self: &Arc<Self>, name: EffectName, options: PlayOptions) -> PlayOutcome {
        if self.is_disposed() {
            return PlayOutcome::Disposed;
        }

        let Some(effect) = self.effect_handle(name) else {
            return PlayOutcome::LoadFailed;
        };

        if options.duck {
            self.duck_music();
        }

        let volume = options
            .volume
            .map(Volume::new)
            .unwrap_or_else(|| self.state.lock().effects_volume);
        if let Err(e) = effect.set_volume(volume.level()) {
            tracing::debug!("Setting volume of {} failed: {}", name, e);
        }

        match effect.replay() {
            Ok(()) => {
                self.events.publish(SoundEvent::EffectPlayed {
                    name,
                    volume: volume.level(),
                });
                PlayOutcome::Played
            }
            Err(e) => {
                tracing::warn!("Playing {} failed: {}", name, e);
                PlayOutcome::PlaybackFailed
            }
        }
    }

    /// Loaded handle for `name`, loading it on this thread if needed
    fn effect_handle(&self, name: EffectName) -> Option<Arc<dyn PlaybackHandle>> {
        let volume = {
            let mut state = self.state.lock();
            if let EffectSlot::Loaded(handle) = state.slot(name) {
                return Some(Arc::clone(handle));
            }
            state.effects.insert(name, EffectSlot::Loading);
            state.effects_volume
        };

        let asset = self.catalog.effect(name);
        match self.backend.load(asset, LoadOptions::once(volume.level())) {
            Ok(handle) => {
                let handle = {
                    let mut state = self.state.lock();
                    match state.slot(name) {
                        // Another loader finished first
                        EffectSlot::Loaded(existing) => Arc::clone(existing),
                        _ => {
                            state.effects.insert(name, EffectSlot::Loaded(Arc::clone(&handle)));
                            handle
                        }
                    }
                };
                tracing::debug!("Loaded effect {}", name);
                self.events.publish(SoundEvent::EffectLoaded(name));
                Some(handle)
            }
            Err(e) => {
                {
                    let mut state = self.state.lock();
                    if matches!(state.slot(name), EffectSlot::Loading) {
                        state.effects.insert(name, EffectSlot::Unloaded);
                    }
                }
                tracing::warn!("Failed to load effect {} from {}: {}", name, asset, e);
                self.events.publish(SoundEvent::EffectLoadFailed(name));
                None
            }
        }
    }

    /// Preload one effect unless it is loaded or already loading
    fn preload_effect(&self, name: EffectName) -> bool {
        match self.state.lock().slot(name) {
            EffectSlot::Loaded(_) => return true,
            EffectSlot::Loading => return false,
            EffectSlot::Unloaded => {}
        }
        self.effect_handle(name).is_some()
    }

    fn start_preload(self: &Arc<Self>) {
        let inner = Arc::downgrade(self);
        let delay = Duration::from_millis(self.tuning.preload_delay_ms);

        self.tasks.spawn(TaskKey::Preload, move |token| {
            if !token.wait(delay) {
                return;
            }

            let mut loaded = 0;
            for name in EffectName::ALL {
                if token.is_cancelled() {
                    return;
                }
                let Some(strong) = inner.upgrade() else {
                    return;
                };
                if strong.preload_effect(name) {
                    loaded += 1;
                }
                drop(strong);
                // Let interactive work run between loads
                thread::yield_now();
            }

            if let Some(strong) = inner.upgrade() {
                tracing::debug!("Preloaded {} effects", loaded);
                strong.events.publish(SoundEvent::PreloadFinished { loaded });
            }
        });
    }

    fn ensure_background(&self) -> Option<Arc<dyn PlaybackHandle>> {
        let volume = {
            let state = self.state.lock();
            if let Some(background) = &state.background {
                return Some(Arc::clone(background));
            }
            state.current_background
        };

        let asset = self.catalog.background();
        match self.backend.load(asset, LoadOptions::looping(volume.level())) {
            Ok(handle) => {
                tracing::info!("Loaded background music from {}", asset);
                let mut state = self.state.lock();
                Some(Arc::clone(state.background.get_or_insert(handle)))
            }
            Err(e) => {
                tracing::warn!("Background music unavailable ({}): {}", asset, e);
                self.events.publish(SoundEvent::MusicLoadFailed);
                None
            }
        }
    }

    fn start_music_if_unmuted(&self) {
        let background = {
            let state = self.state.lock();
            if state.music_muted {
                return;
            }
            state.background.clone()
        };

        if let Some(background) = background {
            match background.play() {
                Ok(()) => self.events.publish(SoundEvent::MusicStarted),
                Err(e) => tracing::warn!("Starting background music failed: {}", e),
            }
        }
    }

    fn duck_music(self: &Arc<Self>) {
        let (ticket, ducked) = {
            let mut state = self.state.lock();
            if state.music_muted {
                return;
            }
            let Some(background) = state.background.clone() else {
                return;
            };

            let ticket = state.ducker.duck();
            let ducked = state.background_volume.scaled(self.tuning.duck_factor);
            state.current_background = ducked;
            if let Err(e) = background.set_volume(ducked.level()) {
                tracing::debug!("Ducking background music failed: {}", e);
            }
            (ticket, ducked)
        };
        self.events.publish(SoundEvent::MusicDucked {
            volume: ducked.level(),
        });

        let inner = Arc::downgrade(self);
        let delay = Duration::from_millis(self.tuning.duck_restore_ms);
        let scheduled = self.tasks.spawn_after(TaskKey::DuckRelease(ticket), delay, move || {
            if let Some(inner) = inner.upgrade() {
                inner.release_duck();
            }
        });
        if !scheduled {
            self.release_duck();
        }
    }

    fn release_duck(&self) {
        let restored = {
            let mut state = self.state.lock();
            if !state.ducker.release() {
                return;
            }
            state.current_background = state.background_volume;
            if let Some(background) = &state.background {
                if let Err(e) = background.set_volume(state.background_volume.level()) {
                    tracing::debug!("Restoring background volume failed: {}", e);
                }
            }
            state.background_volume
        };
        self.events.publish(SoundEvent::MusicRestored {
            volume: restored.level(),
        });
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let prefs = self.state.lock().prefs();
        if let Err(e) = store.save(&prefs) {
            tracing::warn!("Failed to persist sound preferences: {}", e);
        }
    }

    fn stop_worker(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        drop(worker.requests);
        if worker.thread.thread().id() != thread::current().id() {
            let _ = worker.thread.join();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
