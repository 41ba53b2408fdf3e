//! Out-of-band media: sound playback, speech, text recognition
//!
//! These run beside a toast, never inside the outcome race.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::document::AudioPlan;
use crate::error::{CapabilityMissing, MediaError};

/// One-shot media helpers a toast may use
#[async_trait]
pub trait MediaAdapter: Send + Sync + 'static {
    /// Play a non-system sound (file path or URL) to completion
    async fn play_sound(&self, src: &str) -> Result<(), MediaError>;

    /// Speak `text` to completion
    async fn speak(&self, text: &str) -> Result<(), MediaError>;

    /// Recognize text in an image; degraded rather than failing
    async fn recognize_text(&self, image: &str, lang: Option<&str>) -> Recognition;
}

/// Text recognition result, possibly degraded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    pub missing: Option<CapabilityMissing>,
}

impl Recognition {
    pub fn recognized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            missing: None,
        }
    }

    pub fn degraded(missing: CapabilityMissing) -> Self {
        Self {
            text: String::new(),
            missing: Some(missing),
        }
    }

    /// Recognized text, or the diagnostic line when degraded
    pub fn display_text(&self) -> String {
        match &self.missing {
            Some(m) => m.to_string(),
            None => self.text.clone(),
        }
    }
}

/// Adapter with no media capabilities
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMedia;

#[async_trait]
impl MediaAdapter for NullMedia {
    async fn play_sound(&self, src: &str) -> Result<(), MediaError> {
        debug!(src, "no media adapter; sound skipped");
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), MediaError> {
        debug!(chars = text.chars().count(), "no media adapter; speech skipped");
        Ok(())
    }

    async fn recognize_text(&self, image: &str, lang: Option<&str>) -> Recognition {
        debug!(image, ?lang, "no media adapter; recognition skipped");
        Recognition::degraded(CapabilityMissing {
            capability: "text recognition",
            detail: "no recognizer configured".into(),
        })
    }
}

/// Start out-of-band sound/speech for a silent toast; fire-and-forget
///
/// Returns how many operations were started. Needs a Tokio runtime; without
/// one nothing is started.
pub fn spawn_playback<M: MediaAdapter>(media: &Arc<M>, plan: &AudioPlan) -> usize {
    let AudioPlan::Silent { play, speak } = plan else {
        return 0;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no async runtime; out-of-band audio skipped");
        return 0;
    };

    let mut started = 0;
    if let Some(src) = play.clone() {
        let media = Arc::clone(media);
        runtime.spawn(async move {
            if let Err(e) = media.play_sound(&src).await {
                warn!(error = %e, "sound playback failed");
            }
        });
        started += 1;
    }
    if let Some(text) = speak.clone() {
        let media = Arc::clone(media);
        runtime.spawn(async move {
            if let Err(e) = media.speak(&text).await {
                warn!(error = %e, "speech failed");
            }
        });
        started += 1;
    }
    started
}

#[cfg(test)]
pub(crate) mod recording {
    //! Adapter reporting every call over a channel

    use super::*;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Play(String),
        Speak(String),
    }

    pub struct RecordingMedia {
        tx: mpsc::UnboundedSender<Call>,
    }

    impl RecordingMedia {
        pub fn new() -> (Self, mpsc::UnboundedReceiver<Call>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { tx }, rx)
        }
    }

    #[async_trait]
    impl MediaAdapter for RecordingMedia {
        async fn play_sound(&self, src: &str) -> Result<(), MediaError> {
            let _ = self.tx.send(Call::Play(src.to_string()));
            Ok(())
        }

        async fn speak(&self, text: &str) -> Result<(), MediaError> {
            let _ = self.tx.send(Call::Speak(text.to_string()));
            Err(MediaError {
                operation: "speak",
                detail: "voice missing".into(),
            })
        }

        async fn recognize_text(&self, _image: &str, _lang: Option<&str>) -> Recognition {
            Recognition::recognized("hello")
        }
    }
}
