//! AppUserModelID registration via Windows Registry (HKCU\Software\Classes\AppUserModelId)
//!
//! Unpackaged apps need a registered identity before toasts shown under it
//! carry their own name and icon.

use std::path::Path;

use thiserror::Error;
use winreg::RegKey;
use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};

const APP_ID_KEY: &str = r"Software\Classes\AppUserModelId";
const DISPLAY_NAME: &str = "DisplayName";
const ICON_URI: &str = "IconUri";

#[derive(Debug, Error)]
pub enum AppIdError {
    #[error("Registry access failed: {0}")]
    Registry(#[from] std::io::Error),

    #[error("Invalid app id {0:?}")]
    InvalidId(String),
}

fn key_path(id: &str) -> Result<String, AppIdError> {
    if id.is_empty() || id.contains('\\') {
        return Err(AppIdError::InvalidId(id.to_string()));
    }
    Ok(format!(r"{APP_ID_KEY}\{id}"))
}

/// Check if an identity is registered
pub fn is_registered(id: &str) -> bool {
    let Ok(path) = key_path(id) else {
        return false;
    };
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    hkcu.open_subkey_with_flags(path, KEY_READ)
        .ok()
        .and_then(|key| key.get_value::<String, _>(DISPLAY_NAME).ok())
        .is_some()
}

/// Register (or refresh) an identity with display name and optional icon
pub fn register(id: &str, display_name: &str, icon: Option<&Path>) -> Result<(), AppIdError> {
    let path = key_path(id)?;
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey(path)?;
    key.set_value(DISPLAY_NAME, &display_name)?;
    match icon {
        Some(icon) => key.set_value(ICON_URI, &icon.display().to_string())?,
        // Ignore error if value doesn't exist
        None => {
            let _ = key.delete_value(ICON_URI);
        }
    }
    tracing::info!(id, display_name, "app id registered");
    Ok(())
}

/// Remove an identity registration
pub fn unregister(id: &str) -> Result<(), AppIdError> {
    let path = key_path(id)?;
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    // Ignore error if key doesn't exist
    let _ = hkcu.delete_subkey_all(path);
    Ok(())
}
