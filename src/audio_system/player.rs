/// Rodio audio backend
///
/// Each loaded resource gets its own sink; the output stream lives on a
/// dedicated thread for as long as the backend exists.

use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::backend::{AudioBackend, LoadOptions, PlaybackHandle, SessionConfig};
use super::source::AssetRef;
use crate::error::AudioError;

/// Audio backend playing through the default output device
pub struct RodioBackend {
    stream_handle: OutputStreamHandle,
    // Dropping the sender releases the output thread
    _shutdown: Sender<()>,
}

impl RodioBackend {
    /// Open the default output device
    pub fn new() -> Result<Self, AudioError> {
        let (handle_tx, handle_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    // Blocks until the backend is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    tracing::debug!("Audio output stream closed");
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;

        let stream_handle = handle_rx
            .recv()
            .map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?
            .map_err(|msg| AudioError::StreamInitFailed(msg.into()))?;

        tracing::info!("Audio output stream opened");
        Ok(Self {
            stream_handle,
            _shutdown: shutdown_tx,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn configure_session(&self, config: &SessionConfig) -> Result<(), AudioError> {
        // Desktop output has no session policy to negotiate
        tracing::debug!(?config, "Audio session policy recorded");
        Ok(())
    }

    fn load(
        &self,
        asset: &AssetRef,
        options: LoadOptions,
    ) -> Result<Arc<dyn PlaybackHandle>, AudioError> {
        let audio_data = read_asset(asset)?;

        // Verify the audio can be decoded
        Decoder::new(Cursor::new((*audio_data).clone()))
            .map_err(|e| AudioError::DecodeFailed(Box::new(e)))?;

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;
        let volume = options.volume.clamp(0.0, 1.0);
        sink.set_volume(volume);

        tracing::debug!(
            "Loaded {} ({} bytes, looping={})",
            asset,
            audio_data.len(),
            options.looping
        );

        Ok(Arc::new(RodioHandle {
            label: asset.to_string(),
            stream_handle: self.stream_handle.clone(),
            sink: Mutex::new(sink),
            audio_data,
            looping: options.looping,
            volume: Mutex::new(volume),
        }))
    }
}

/// Read the raw bytes behind an asset reference
pub(crate) fn read_asset(asset: &AssetRef) -> Result<Arc<Vec<u8>>, AudioError> {
    match asset {
        AssetRef::Bytes { data, .. } => Ok(Arc::clone(data)),
        AssetRef::File(path) => {
            if !path.exists() {
                return Err(AudioError::AssetMissing(path.display().to_string()));
            }
            std::fs::read(path)
                .map(Arc::new)
                .map_err(|e| AudioError::LoadFailed {
                    asset: path.display().to_string(),
                    source: Box::new(e),
                })
        }
    }
}

struct RodioHandle {
    label: String,
    stream_handle: OutputStreamHandle,
    sink: Mutex<Sink>,
    audio_data: Arc<Vec<u8>>,
    looping: bool,
    volume: Mutex<f32>,
}

impl RodioHandle {
    fn source(&self) -> Result<Box<dyn Source<Item = i16> + Send>, AudioError> {
        // Note: We must clone here as rodio's Decoder requires owned data with 'static lifetime
        let decoder = Decoder::new(Cursor::new((*self.audio_data).clone()))
            .map_err(|e| AudioError::DecodeFailed(Box::new(e)))?;

        if self.looping {
            Ok(Box::new(decoder.repeat_infinite()))
        } else {
            Ok(Box::new(decoder))
        }
    }
}

impl PlaybackHandle for RodioHandle {
    fn play(&self) -> Result<(), AudioError> {
        let sink = self.sink.lock();
        if sink.empty() {
            sink.append(self.source()?);
        }
        sink.set_volume(*self.volume.lock());
        sink.play();
        Ok(())
    }

    fn pause(&self) -> Result<(), AudioError> {
        self.sink.lock().pause();
        Ok(())
    }

    fn replay(&self) -> Result<(), AudioError> {
        let source = self.source()?;
        let fresh = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::PlaybackFailed(Box::new(e)))?;

        let mut sink = self.sink.lock();
        sink.stop();
        *sink = fresh;
        sink.set_volume(*self.volume.lock());
        sink.append(source);
        sink.play();

        tracing::trace!("Replaying {}", self.label);
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        let clamped = volume.clamp(0.0, 1.0);
        *self.volume.lock() = clamped;
        self.sink.lock().set_volume(clamped);
        Ok(())
    }

    fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    fn is_playing(&self) -> bool {
        let sink = self.sink.lock();
        !sink.empty() && !sink.is_paused()
    }
}
