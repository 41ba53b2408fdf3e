//! WinRT renderer: `Windows.UI.Notifications` toasts
//!
//! Event handlers run on a platform thread; they only forward the extracted
//! payload to the arbiter's listener.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use windows::Data::Xml::Dom::XmlDocument;
use windows::Foundation::{IPropertyValue, TypedEventHandler};
use windows::UI::Notifications::{
    NotificationData, NotificationUpdateResult, ToastActivatedEventArgs, ToastDismissedEventArgs,
    ToastFailedEventArgs, ToastNotification, ToastNotificationManager, ToastNotifier,
};
use windows::core::{HSTRING, IInspectable, Interface};

use crate::document::Document;
use crate::error::RenderError;
use crate::progress::ProgressPayload;
use crate::renderer::{
    Activation, DismissReason, EventKind, FailureCode, Listener, ListenerToken,
    NotificationHandle, Notifier, Renderer, UpdateResult,
};

/// Renderer backed by the system toast notification manager
#[derive(Debug, Default, Clone, Copy)]
pub struct WinRtRenderer;

impl Renderer for WinRtRenderer {
    type Notifier = WinRtNotifier;

    fn create_notifier(&self, app_identity: &str) -> Result<WinRtNotifier, RenderError> {
        let notifier =
            ToastNotificationManager::CreateToastNotifierWithId(&HSTRING::from(app_identity))
                .map_err(RenderError::win("CreateToastNotifierWithId"))?;
        Ok(WinRtNotifier { notifier })
    }
}

pub struct WinRtNotifier {
    notifier: ToastNotifier,
}

impl Notifier for WinRtNotifier {
    type Handle = WinRtHandle;

    fn prepare(
        &self,
        document: &Document,
        progress: Option<&ProgressPayload>,
    ) -> Result<WinRtHandle, RenderError> {
        let xml = XmlDocument::new().map_err(RenderError::win("XmlDocument"))?;
        xml.LoadXml(&HSTRING::from(document.to_xml()))
            .map_err(RenderError::win("LoadXml"))?;
        let toast = ToastNotification::CreateToastNotification(&xml)
            .map_err(RenderError::win("CreateToastNotification"))?;

        if let Some(payload) = progress {
            toast
                .SetTag(&HSTRING::from(payload.tag.as_str()))
                .map_err(RenderError::win("SetTag"))?;
            let data = notification_data(payload).map_err(RenderError::win("NotificationData"))?;
            toast.SetData(&data).map_err(RenderError::win("SetData"))?;
        }
        Ok(WinRtHandle { toast })
    }

    fn show(&self, handle: &WinRtHandle) -> Result<(), RenderError> {
        self.notifier
            .Show(&handle.toast)
            .map_err(RenderError::win("Show"))?;
        debug!("toast handed to notifier");
        Ok(())
    }

    fn update(&self, payload: &ProgressPayload) -> UpdateResult {
        let data = match notification_data(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "NotificationData failed");
                return UpdateResult::Failed;
            }
        };
        match self
            .notifier
            .UpdateWithTag(&data, &HSTRING::from(payload.tag.as_str()))
        {
            Ok(r) if r == NotificationUpdateResult::Succeeded => UpdateResult::Succeeded,
            Ok(r) if r == NotificationUpdateResult::NotificationNotFound => {
                UpdateResult::NotificationNotFound
            }
            Ok(_) => UpdateResult::Failed,
            Err(e) => {
                warn!(error = %e, "UpdateWithTag failed");
                UpdateResult::Failed
            }
        }
    }
}

fn notification_data(payload: &ProgressPayload) -> windows::core::Result<NotificationData> {
    let data = NotificationData::new()?;
    let values = data.Values()?;
    for (key, value) in &payload.values {
        values.Insert(&HSTRING::from(key.as_str()), &HSTRING::from(value.as_str()))?;
    }
    data.SetSequenceNumber(payload.sequence)?;
    Ok(data)
}

/// Prepared toast notification
pub struct WinRtHandle {
    toast: ToastNotification,
}

impl NotificationHandle for WinRtHandle {
    fn on_activated(&self, listener: Listener<Activation>) -> Result<ListenerToken, RenderError> {
        let handler = TypedEventHandler::<ToastNotification, IInspectable>::new(move |_, args| {
            listener(activation(args.ok()?)?);
            Ok(())
        });
        let value = self
            .toast
            .Activated(&handler)
            .map_err(RenderError::win("add_Activated"))?;
        Ok(ListenerToken {
            kind: EventKind::Activated,
            value,
        })
    }

    fn on_dismissed(&self, listener: Listener<DismissReason>) -> Result<ListenerToken, RenderError> {
        let handler =
            TypedEventHandler::<ToastNotification, ToastDismissedEventArgs>::new(move |_, args| {
                let reason = args.ok()?.Reason()?;
                listener(DismissReason::from_code(reason.0));
                Ok(())
            });
        let value = self
            .toast
            .Dismissed(&handler)
            .map_err(RenderError::win("add_Dismissed"))?;
        Ok(ListenerToken {
            kind: EventKind::Dismissed,
            value,
        })
    }

    fn on_failed(&self, listener: Listener<FailureCode>) -> Result<ListenerToken, RenderError> {
        let handler =
            TypedEventHandler::<ToastNotification, ToastFailedEventArgs>::new(move |_, args| {
                let code = args.ok()?.ErrorCode()?;
                listener(FailureCode(code.0 as u32));
                Ok(())
            });
        let value = self
            .toast
            .Failed(&handler)
            .map_err(RenderError::win("add_Failed"))?;
        Ok(ListenerToken {
            kind: EventKind::Failed,
            value,
        })
    }

    fn remove_listener(&self, token: ListenerToken) -> Result<(), RenderError> {
        match token.kind {
            EventKind::Activated => self
                .toast
                .RemoveActivated(token.value)
                .map_err(RenderError::win("remove_Activated")),
            EventKind::Dismissed => self
                .toast
                .RemoveDismissed(token.value)
                .map_err(RenderError::win("remove_Dismissed")),
            EventKind::Failed => self
                .toast
                .RemoveFailed(token.value)
                .map_err(RenderError::win("remove_Failed")),
        }
    }
}

/// Arguments and text/selection inputs of an activation
fn activation(args: &IInspectable) -> windows::core::Result<Activation> {
    let args: ToastActivatedEventArgs = args.cast()?;
    let mut user_inputs = BTreeMap::new();

    let pairs = args.UserInput()?.First()?;
    while pairs.HasCurrent()? {
        let pair = pairs.Current()?;
        let key = pair.Key()?.to_string();
        match input_text(&pair.Value()?) {
            Ok(value) => {
                user_inputs.insert(key, value);
            }
            Err(e) => debug!(key = %key, error = %e, "non-text user input skipped"),
        }
        pairs.MoveNext()?;
    }

    Ok(Activation {
        arguments: args.Arguments()?.to_string(),
        user_inputs,
    })
}

fn input_text(value: &IInspectable) -> windows::core::Result<String> {
    let value: IPropertyValue = value.cast()?;
    Ok(value.GetString()?.to_string())
}
