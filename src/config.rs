//! Toast defaults: built-in values, registry settings, environment overrides

use std::time::Duration;

use tracing::{debug, warn};

use crate::options::ToastDescriptor;
use crate::progress::DEFAULT_TAG;

/// AppUserModelID every Windows 10/11 install can show toasts under
pub const DEFAULT_APP_ID: &str =
    r"{1AC14E77-02E7-4E5D-B744-2EB1AE5198B7}\WindowsPowerShell\v1.0\powershell.exe";

pub const ENV_APP_ID: &str = "WIN11TOAST_APP_ID";
pub const ENV_TIMEOUT_SECS: &str = "WIN11TOAST_TIMEOUT_SECS";

#[cfg(windows)]
const SETTINGS_KEY: &str = r"Software\Win11Toast";
#[cfg(windows)]
const APP_ID_VALUE: &str = "AppId";
#[cfg(windows)]
const TIMEOUT_VALUE: &str = "TimeoutSecs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastConfig {
    /// Identity toasts are shown and updated under
    pub app_identity: String,
    /// Tag for stateful (progress) toasts
    pub progress_tag: String,
    /// Give up waiting for an outcome after this long
    pub timeout: Option<Duration>,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            app_identity: DEFAULT_APP_ID.to_string(),
            progress_tag: DEFAULT_TAG.to_string(),
            timeout: None,
        }
    }
}

impl ToastConfig {
    /// Defaults, then registry settings (Windows), then environment
    pub fn load() -> Self {
        let mut config = Self::default();
        #[cfg(windows)]
        config.apply_registry();
        config.apply_env(|key| std::env::var(key).ok());
        debug!(app_identity = %config.app_identity, timeout = ?config.timeout, "config loaded");
        config
    }

    /// Identity for one toast: per-toast override, else configured
    pub fn app_identity_for<'a>(&'a self, desc: &'a ToastDescriptor) -> &'a str {
        desc.app_identity.as_deref().unwrap_or(&self.app_identity)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(ENV_APP_ID).filter(|v| !v.trim().is_empty()) {
            self.app_identity = id.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match parse_timeout(&raw) {
                Some(timeout) => self.timeout = timeout,
                None => warn!(value = %raw, "{ENV_TIMEOUT_SECS}: not a number of seconds; ignored"),
            }
        }
    }

    #[cfg(windows)]
    fn apply_registry(&mut self) {
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let Ok(key) = hkcu.open_subkey_with_flags(SETTINGS_KEY, KEY_READ) else {
            return;
        };
        if let Ok(id) = key.get_value::<String, _>(APP_ID_VALUE)
            && !id.is_empty()
        {
            self.app_identity = id;
        }
        if let Ok(secs) = key.get_value::<u32, _>(TIMEOUT_VALUE) {
            self.timeout = (secs > 0).then(|| Duration::from_secs(secs.into()));
        }
    }
}

/// `0` disables the timeout
fn parse_timeout(raw: &str) -> Option<Option<Duration>> {
    let secs: u64 = raw.trim().parse().ok()?;
    Some((secs > 0).then(|| Duration::from_secs(secs)))
}
