//! win11toast: toast notifications for Windows 10 and 11
//!
//! Options are normalized, built into a toast document, handed to a
//! [`Renderer`], and raced for the first of activation, dismissal or failure.
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn demo() -> Result<(), win11toast::ToastError> {
//! use win11toast::{Reactions, ToastOptions};
//!
//! let options = ToastOptions::new().title("Hello").body("Hello from Rust").button("Open");
//! let outcome = win11toast::toast(&options, Reactions::new())?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod arbiter;
pub mod config;
pub mod document;
pub mod error;
pub mod media;
pub mod options;
pub mod progress;
pub mod renderer;

#[cfg(windows)]
pub mod appid;
#[cfg(windows)]
pub mod winrt;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

pub use arbiter::{ArbiterState, Outcome, Reactions, Session};
pub use config::ToastConfig;
pub use document::{Document, Element};
pub use error::{
    BuildError, CapabilityMissing, InputShapeError, MediaError, RenderError, ToastError,
    UpdateRejected,
};
pub use media::{MediaAdapter, NullMedia, Recognition};
pub use options::{Scalar, SelectionOption, SelectionsOption, Shorthand, ToastOptions};
pub use progress::{Progress, ProgressChannel};
pub use renderer::{Activation, DismissReason, FailureCode, NotificationHandle, Notifier, Renderer};

#[cfg(windows)]
pub use winrt::WinRtRenderer;

/// Handle type produced by a renderer's notifier
pub type HandleOf<R> = <<R as Renderer>::Notifier as Notifier>::Handle;

/// Shows toasts through one renderer with shared configuration
pub struct Toaster<R: Renderer, M: MediaAdapter = NullMedia> {
    renderer: R,
    media: Arc<M>,
    config: ToastConfig,
}

impl<R: Renderer> Toaster<R> {
    pub fn new(renderer: R, config: ToastConfig) -> Self {
        Self {
            renderer,
            media: Arc::new(NullMedia),
            config,
        }
    }
}

impl<R: Renderer, M: MediaAdapter> Toaster<R, M> {
    /// Use `media` for out-of-band sound and speech
    pub fn with_media<N: MediaAdapter>(self, media: N) -> Toaster<R, N> {
        Toaster {
            renderer: self.renderer,
            media: Arc::new(media),
            config: self.config,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn media(&self) -> &Arc<M> {
        &self.media
    }

    pub fn config(&self) -> &ToastConfig {
        &self.config
    }

    /// Build the document for `options` without showing it
    pub fn document(&self, options: &ToastOptions) -> Result<Document, ToastError> {
        let desc = options.normalize()?;
        Ok(document::build(&desc)?)
    }

    /// Show a toast and arm its session
    ///
    /// Malformed options and platform refusals before display are returned
    /// as `Err`. A refused display resolves the session as
    /// [`Outcome::Failed`] instead.
    pub fn show(
        &self,
        options: &ToastOptions,
        mut reactions: Reactions,
    ) -> Result<LiveToast<HandleOf<R>>, ToastError> {
        let desc = options.normalize()?;
        let document = document::build(&desc)?;
        let app_identity = self.config.app_identity_for(&desc);

        let (progress, payload) = match &desc.progress {
            Some(values) => {
                let (channel, payload) =
                    ProgressChannel::attach(values, &self.config.progress_tag, app_identity);
                (Some(channel), Some(payload))
            }
            None => (None, None),
        };

        let notifier = self.renderer.create_notifier(app_identity)?;
        let handle = notifier.prepare(&document, payload.as_ref())?;

        // Platform performs the launch itself
        if let Some(target) = &desc.launch_target
            && reactions.on_activated.take().is_some()
        {
            debug!(launch = %target, "launch target set; click reaction replaced by logging");
        }

        let session = Session::arm(handle, reactions)?;
        let started = media::spawn_playback(&self.media, &document::audio_plan(&desc));

        let shown = notifier.show(session.handle());
        match &shown {
            Ok(()) => info!(app_identity, media = started, "toast shown"),
            Err(e) => warn!(app_identity, error = %e, "toast display refused"),
        }

        Ok(LiveToast {
            session,
            shown,
            progress,
        })
    }

    /// Show a toast and wait for its outcome, bounded by the configured timeout
    pub async fn toast(
        &self,
        options: &ToastOptions,
        reactions: Reactions,
    ) -> Result<Outcome, ToastError> {
        let live = self.show(options, reactions)?;
        match self.config.timeout {
            Some(timeout) => live.outcome_within(timeout).await,
            None => live.outcome().await,
        }
    }

    /// Push new progress values to a shown toast under its own identity
    pub fn update(
        &self,
        channel: &ProgressChannel,
        progress: &Progress,
    ) -> Result<u32, UpdateRejected> {
        channel.update(&self.renderer, progress, channel.app_identity())
    }
}

/// Shown (or refused) toast whose outcome has not been awaited yet
pub struct LiveToast<H: NotificationHandle> {
    session: Session<H>,
    shown: Result<(), RenderError>,
    progress: Option<ProgressChannel>,
}

impl<H: NotificationHandle> LiveToast<H> {
    /// Progress channel, when the toast was shown with progress
    pub fn progress(&self) -> Option<&ProgressChannel> {
        self.progress.as_ref()
    }

    pub fn is_shown(&self) -> bool {
        self.shown.is_ok()
    }

    /// Wait for the outcome; listeners are unregistered when this returns
    pub async fn outcome(self) -> Result<Outcome, ToastError> {
        let LiveToast { session, shown, .. } = self;
        match shown {
            Ok(()) => session.wait().await,
            Err(e) => Ok(session.conclude(Outcome::Failed(FailureCode::from(&e)))),
        }
    }

    /// Like [`LiveToast::outcome`], giving up after `timeout`
    pub async fn outcome_within(self, timeout: Duration) -> Result<Outcome, ToastError> {
        let LiveToast { session, shown, .. } = self;
        match shown {
            Ok(()) => session.wait_timeout(timeout).await,
            Err(e) => Ok(session.conclude(Outcome::Failed(FailureCode::from(&e)))),
        }
    }
}

/// Show a toast with the system renderer and wait for its outcome
#[cfg(windows)]
pub async fn toast_async(
    options: &ToastOptions,
    reactions: Reactions,
) -> Result<Outcome, ToastError> {
    Toaster::new(WinRtRenderer, ToastConfig::load())
        .toast(options, reactions)
        .await
}

/// Blocking [`toast_async`] on a private current-thread runtime
#[cfg(windows)]
pub fn toast(options: &ToastOptions, reactions: Reactions) -> Result<Outcome, ToastError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(toast_async(options, reactions))
}
