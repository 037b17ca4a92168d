/// Platform audio seam
///
/// The session manager only talks to the platform through these traits, so
/// the same state machine drives rodio, a silent fallback, or a test fake.
use std::sync::Arc;

use parking_lot::Mutex;

use super::source::AssetRef;
use crate::error::AudioError;

/// Interruption behaviour on iOS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IosInterruption {
    MixWithOthers,
    DoNotMix,
    DuckOthers,
}

/// Interruption behaviour on Android
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidInterruption {
    DoNotMix,
    DuckOthers,
}

/// One-time audio session policy applied at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub allows_recording: bool,
    pub stays_active_in_background: bool,
    pub plays_in_silent_mode: bool,
    pub ios_interruption: IosInterruption,
    pub android_should_duck: bool,
    pub android_interruption: AndroidInterruption,
    pub play_through_earpiece: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allows_recording: false,
            stays_active_in_background: false,
            plays_in_silent_mode: true,
            ios_interruption: IosInterruption::MixWithOthers,
            android_should_duck: true,
            android_interruption: AndroidInterruption::DuckOthers,
            play_through_earpiece: false,
        }
    }
}

/// Options applied when a resource is loaded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub looping: bool,
    pub volume: f32,
}

impl LoadOptions {
    pub fn looping(volume: f32) -> Self {
        Self {
            looping: true,
            volume,
        }
    }

    pub fn once(volume: f32) -> Self {
        Self {
            looping: false,
            volume,
        }
    }
}

/// A loaded audio resource
pub trait PlaybackHandle: Send + Sync {
    /// Start playback, or resume it if paused
    fn play(&self) -> Result<(), AudioError>;

    fn pause(&self) -> Result<(), AudioError>;

    /// Restart from the beginning, replacing any in-flight playback
    fn replay(&self) -> Result<(), AudioError>;

    fn set_volume(&self, volume: f32) -> Result<(), AudioError>;

    fn volume(&self) -> f32;

    fn is_playing(&self) -> bool;
}

/// Platform audio layer
pub trait AudioBackend: Send + Sync {
    fn configure_session(&self, config: &SessionConfig) -> Result<(), AudioError>;

    fn load(
        &self,
        asset: &AssetRef,
        options: LoadOptions,
    ) -> Result<Arc<dyn PlaybackHandle>, AudioError>;
}

/// Backend used when no output device is available.
///
/// Loads always succeed and nothing is heard; volumes and play state are
/// still tracked so status queries keep working.
#[derive(Debug, Default)]
pub struct SilentBackend;

impl AudioBackend for SilentBackend {
    fn configure_session(&self, _config: &SessionConfig) -> Result<(), AudioError> {
        Ok(())
    }

    fn load(
        &self,
        asset: &AssetRef,
        options: LoadOptions,
    ) -> Result<Arc<dyn PlaybackHandle>, AudioError> {
        tracing::debug!("Silent load of {}", asset);
        Ok(Arc::new(SilentHandle {
            state: Mutex::new((options.volume.clamp(0.0, 1.0), false)),
        }))
    }
}

/// (volume, playing)
struct SilentHandle {
    state: Mutex<(f32, bool)>,
}

impl PlaybackHandle for SilentHandle {
    fn play(&self) -> Result<(), AudioError> {
        self.state.lock().1 = true;
        Ok(())
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.state.lock().1 = false;
        Ok(())
    }

    fn replay(&self) -> Result<(), AudioError> {
        self.play()
    }

    fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        self.state.lock().0 = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.state.lock().0
    }

    fn is_playing(&self) -> bool {
        self.state.lock().1
    }
}
