//! Progress bar payload delivered alongside (and after) the document
//!
//! The document only carries `{field}` placeholders; the values travel in a
//! tagged payload whose sequence number starts at 1 on show and strictly
//! increases on every update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, warn};

use crate::error::UpdateRejected;
use crate::options::Scalar;
use crate::renderer::{Notifier, Renderer, UpdateResult};

/// Named progress fields (`value`, `status`, `title`, `valueStringOverride`, ...)
pub type Progress = BTreeMap<String, Scalar>;

/// Tag every stateful toast is shown and updated under
pub const DEFAULT_TAG: &str = "my_tag";

/// Key/value payload bound to a tag and sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressPayload {
    pub tag: String,
    pub sequence: u32,
    pub values: BTreeMap<String, String>,
}

impl ProgressPayload {
    pub fn new(tag: &str, sequence: u32, progress: &Progress) -> Self {
        Self {
            tag: tag.to_string(),
            sequence,
            values: progress
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
        }
    }
}

/// Progress state of one shown toast: `{tag, app identity, sequence}`
///
/// Clones share the sequence counter, so updates may come from any task.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    tag: String,
    app_identity: String,
    sequence: Arc<AtomicU32>,
}

impl ProgressChannel {
    /// Initial payload (sequence 1) to deliver with the document at show time
    pub fn attach(progress: &Progress, tag: &str, app_identity: &str) -> (Self, ProgressPayload) {
        let channel = Self {
            tag: tag.to_string(),
            app_identity: app_identity.to_string(),
            sequence: Arc::new(AtomicU32::new(1)),
        };
        let payload = ProgressPayload::new(tag, 1, progress);
        debug!(tag, app_identity, "progress attached");
        (channel, payload)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Identity the toast was shown under
    pub fn app_identity(&self) -> &str {
        &self.app_identity
    }

    /// Last sequence number handed out
    pub fn sequence(&self) -> u32 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Submit new values under the next sequence number
    ///
    /// The notifier is resolved for `app_identity`; a mismatch with the
    /// identity the toast was shown under is reported by the renderer.
    pub fn update<R: Renderer>(
        &self,
        renderer: &R,
        progress: &Progress,
        app_identity: &str,
    ) -> Result<u32, UpdateRejected> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.submit(renderer, progress, app_identity, sequence)
    }

    /// Submit new values under an explicit sequence number
    ///
    /// Rejected locally when `sequence` does not exceed the last one sent.
    pub fn update_at<R: Renderer>(
        &self,
        renderer: &R,
        progress: &Progress,
        app_identity: &str,
        sequence: u32,
    ) -> Result<u32, UpdateRejected> {
        self.sequence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                (sequence > last).then_some(sequence)
            })
            .map_err(|last| UpdateRejected::StaleSequence { sequence, last })?;
        self.submit(renderer, progress, app_identity, sequence)
    }

    fn submit<R: Renderer>(
        &self,
        renderer: &R,
        progress: &Progress,
        app_identity: &str,
        sequence: u32,
    ) -> Result<u32, UpdateRejected> {
        let notifier = renderer.create_notifier(app_identity)?;
        let payload = ProgressPayload::new(&self.tag, sequence, progress);
        match notifier.update(&payload) {
            UpdateResult::Succeeded => {
                debug!(tag = %self.tag, sequence, "progress updated");
                Ok(sequence)
            }
            UpdateResult::NotificationNotFound => {
                warn!(tag = %self.tag, app_identity, "progress update: unknown tag");
                Err(UpdateRejected::UnknownTag {
                    tag: self.tag.clone(),
                    app_identity: app_identity.to_string(),
                })
            }
            UpdateResult::Failed => {
                warn!(tag = %self.tag, sequence, "progress update rejected");
                Err(UpdateRejected::Failed {
                    tag: self.tag.clone(),
                })
            }
        }
    }
}
