//! Error types for win11toast

use thiserror::Error;

/// Option value with a shape the normalizer does not recognize
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputShapeError {
    #[error("{field}: missing required key `{key}`")]
    MissingKey { field: &'static str, key: &'static str },

    #[error("{field}: `{key}` must not be empty")]
    Empty { field: &'static str, key: &'static str },

    #[error("descriptor parse failed: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for InputShapeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Document assembly errors (caller input, never retried)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid attribute name {name:?} on <{element}>")]
    InvalidAttributeName { element: String, name: String },
}

/// Platform refused an operation (HRESULT-style code)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed (0x{code:08X})")]
pub struct RenderError {
    pub operation: &'static str,
    pub code: u32,
}

impl RenderError {
    pub fn new(operation: &'static str, code: u32) -> Self {
        Self { operation, code }
    }
}

#[cfg(windows)]
impl RenderError {
    pub(crate) fn win(operation: &'static str) -> impl FnOnce(windows::core::Error) -> Self {
        move |e| Self::new(operation, e.code().0 as u32)
    }
}

/// Progress update not applied by the renderer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateRejected {
    #[error("no live notification with tag {tag:?} for {app_identity:?}")]
    UnknownTag { tag: String, app_identity: String },

    #[error("sequence {sequence} not greater than {last}")]
    StaleSequence { sequence: u32, last: u32 },

    #[error("renderer rejected update for tag {tag:?}")]
    Failed { tag: String },

    #[error("notifier unavailable: {0}")]
    Notifier(#[from] RenderError),
}

/// Platform capability absent (degraded result, not an `Err`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{capability} unavailable: {detail}")]
pub struct CapabilityMissing {
    pub capability: &'static str,
    pub detail: String,
}

/// Media adapter failure (fire-and-forget, logged only)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {detail}")]
pub struct MediaError {
    pub operation: &'static str,
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ToastError {
    #[error(transparent)]
    InputShape(#[from] InputShapeError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Update(#[from] UpdateRejected),

    #[error("all listener signals dropped before resolving")]
    SessionClosed,

    #[error("no outcome within {0:?}")]
    TimedOut(std::time::Duration),

    #[error("async runtime unavailable: {0}")]
    Runtime(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_shape_error_display() {
        let err = InputShapeError::MissingKey {
            field: "button",
            key: "content",
        };
        assert_eq!(err.to_string(), "button: missing required key `content`");
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::new("Show", 0x80070490);
        assert_eq!(err.to_string(), "Show failed (0x80070490)");
    }

    #[test]
    fn test_update_rejected_display() {
        let err = UpdateRejected::UnknownTag {
            tag: "my_tag".into(),
            app_identity: "Other".into(),
        };
        assert_eq!(
            err.to_string(),
            "no live notification with tag \"my_tag\" for \"Other\""
        );
    }

    #[test]
    fn test_toast_error_transparent() {
        let err: ToastError = BuildError::InvalidAttributeName {
            element: "text".into(),
            name: "1bad".into(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid attribute name \"1bad\" on <text>");
    }
}
