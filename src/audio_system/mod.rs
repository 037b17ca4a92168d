/// Audio system module
///
/// Background music plus a fixed set of short effects for the quiz UI:
/// - Mute toggles and clamped volumes
/// - Per-effect cooldowns so rapid taps fire once
/// - Ducking of the music while feedback effects play
/// - Non-blocking effect preloading
///
/// ## Architecture
///
/// ```text
/// AudioSessionManager
///   ├── AudioBackend (rodio / silent / test fake)
///   │     └── PlaybackHandle per resource
///   ├── SoundCatalog   background + tap, select, correct, wrong
///   ├── Throttle       per-effect cooldown
///   ├── Ducker         duck depth counter
///   ├── TaskSet        preload + duck releases, cancelled on dispose
///   └── EventBus       SoundEvent notifications
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let backend: Arc<dyn AudioBackend> = Arc::new(RodioBackend::new()?);
/// let sounds = AudioSessionManager::create(
///     backend,
///     SoundCatalog::from_dir(Path::new("assets/audio")),
///     SessionOptions::default(),
/// );
/// sounds.initialize();
///
/// sounds.trigger(EffectName::Tap, PlayOptions::default());
/// sounds.trigger(EffectName::Correct, PlayOptions::ducked());
///
/// sounds.dispose();
/// ```
pub mod backend;
pub mod events;
pub mod manager;
pub mod player;
pub mod source;
pub mod tasks;
pub mod throttle;
pub mod volume;

// Re-export commonly used types
pub use backend::{
    AndroidInterruption, AudioBackend, IosInterruption, LoadOptions, PlaybackHandle,
    SessionConfig, SilentBackend,
};
pub use events::{EventBus, SoundEvent, SubscriberId};
pub use manager::{
    AudioSessionManager, LoadState, PlayOptions, PlayOutcome, SessionOptions, SessionStatus,
};
pub use player::RodioBackend;
pub use source::{AssetRef, EffectName, SoundCatalog};
pub use volume::Volume;
