use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const BLOCKED_BANNER: &str =
    "Notifications are blocked. Enable them in your browser settings to receive alerts.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("push SDK initialization failed: {0}")]
    Init(String),
}

/// The push-notification SDK. Delivery is entirely its business; the feed
/// only initializes it and asks for the permission state.
pub trait PushSdk: Send + Sync {
    fn init(&self, app_id: &str) -> Result<(), NotificationError>;
    fn permission(&self) -> PermissionState;
}

/// SDK stand-in whose permission answer comes from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredPushSdk {
    permission: PermissionState,
}

impl ConfiguredPushSdk {
    pub fn new(permission: PermissionState) -> Self {
        Self { permission }
    }
}

impl PushSdk for ConfiguredPushSdk {
    fn init(&self, app_id: &str) -> Result<(), NotificationError> {
        if app_id.trim().is_empty() {
            return Err(NotificationError::Init("empty application id".into()));
        }
        Ok(())
    }

    fn permission(&self) -> PermissionState {
        self.permission
    }
}

/// Init-once guard around the push SDK. One instance lives for the whole
/// process and is never torn down.
#[derive(Debug, Default)]
pub struct NotificationBootstrap {
    permission: OnceLock<PermissionState>,
}

impl NotificationBootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn is_initialized(&self) -> bool {
        self.permission.get().is_some()
    }

    /// Initialize `sdk` on the first call; later calls return the permission
    /// observed then.
    pub fn ensure_initialized(&self, sdk: &dyn PushSdk, app_id: &str) -> PermissionState {
        *self.permission.get_or_init(|| match sdk.init(app_id) {
            Ok(()) => {
                let permission = sdk.permission();
                info!(?permission, "Push notifications initialized");
                permission
            }
            Err(e) => {
                warn!("{}", e);
                PermissionState::Default
            }
        })
    }

    pub fn permission(&self) -> Option<PermissionState> {
        self.permission.get().copied()
    }
}

pub fn blocked_banner(permission: PermissionState) -> Option<&'static str> {
    match permission {
        PermissionState::Denied => Some(BLOCKED_BANNER),
        PermissionState::Default | PermissionState::Granted => None,
    }
}
