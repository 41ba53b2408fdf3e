//! Renderer boundary: notifier factory, live notification handle, event payloads

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::document::Document;
use crate::error::RenderError;
use crate::progress::ProgressPayload;

/// Platform notification service
pub trait Renderer: Send + Sync {
    type Notifier: Notifier;

    /// Resolve the notifier for an app identity
    fn create_notifier(&self, app_identity: &str) -> Result<Self::Notifier, RenderError>;
}

/// Notifier bound to one app identity
pub trait Notifier: Send + Sync {
    type Handle: NotificationHandle;

    /// Materialize the document (and initial progress payload) as a live handle
    fn prepare(
        &self,
        document: &Document,
        progress: Option<&ProgressPayload>,
    ) -> Result<Self::Handle, RenderError>;

    /// Hand a prepared handle to the platform for display
    fn show(&self, handle: &Self::Handle) -> Result<(), RenderError>;

    /// Apply a progress payload to the live toast carrying `payload.tag`
    fn update(&self, payload: &ProgressPayload) -> UpdateResult;
}

/// Callback invoked by the renderer, possibly on its own thread
pub type Listener<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

/// Live notification exposing its three completion events
pub trait NotificationHandle: Send + Sync + 'static {
    fn on_activated(&self, listener: Listener<Activation>) -> Result<ListenerToken, RenderError>;
    fn on_dismissed(&self, listener: Listener<DismissReason>)
    -> Result<ListenerToken, RenderError>;
    fn on_failed(&self, listener: Listener<FailureCode>) -> Result<ListenerToken, RenderError>;
    fn remove_listener(&self, token: ListenerToken) -> Result<(), RenderError>;
}

/// Result of a tagged progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Succeeded,
    Failed,
    NotificationNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Activated,
    Dismissed,
    Failed,
}

/// Registration token returned by the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken {
    pub kind: EventKind,
    pub value: i64,
}

// ========== Event Payloads ==========

/// User activated the toast body or one of its buttons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub arguments: String,
    pub user_inputs: BTreeMap<String, String>,
}

/// Why the toast left the screen without activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DismissReason {
    UserCanceled,
    ApplicationHidden,
    TimedOut,
    Unknown(i32),
}

impl DismissReason {
    /// Map the platform's dismissal reason code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => DismissReason::UserCanceled,
            1 => DismissReason::ApplicationHidden,
            2 => DismissReason::TimedOut,
            other => DismissReason::Unknown(other),
        }
    }
}

/// HRESULT reported by the platform when display failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailureCode(pub u32);

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<&RenderError> for FailureCode {
    fn from(e: &RenderError) -> Self {
        FailureCode(e.code)
    }
}
