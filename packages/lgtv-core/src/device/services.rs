//! SSAP service definitions.
//!
//! Single source of truth for the service URIs and payload shapes the
//! command layer sends to the TV.

use serde_json::{json, Value};

/// SSAP services used by the built-in commands.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SsapService {
    /// Switch the TV to standby.
    TurnOff,
    /// Launch an installed app by id.
    LaunchApp,
    /// Open a URL in the default handler (usually the browser).
    OpenUrl,
    /// Switch the active external input.
    SwitchInput,
    /// Show a notification toast.
    CreateToast,
    /// Step the volume up by one.
    VolumeUp,
    /// Step the volume down by one.
    VolumeDown,
}

impl SsapService {
    /// Returns the SSAP URI for this service.
    #[must_use]
    pub fn uri(&self) -> &'static str {
        match self {
            Self::TurnOff => "ssap://system/turnOff",
            Self::LaunchApp => "ssap://system.launcher/launch",
            Self::OpenUrl => "ssap://system.launcher/open",
            Self::SwitchInput => "ssap://tv/switchInput",
            Self::CreateToast => "ssap://system.notifications/createToast",
            Self::VolumeUp => "ssap://audio/volumeUp",
            Self::VolumeDown => "ssap://audio/volumeDown",
        }
    }
}

/// Payload for [`SsapService::LaunchApp`].
#[must_use]
pub fn launch_payload(app_id: &str) -> Value {
    json!({ "id": app_id })
}

/// Payload for [`SsapService::OpenUrl`].
#[must_use]
pub fn open_payload(url: &str) -> Value {
    json!({ "url": url })
}

/// Payload for [`SsapService::SwitchInput`].
#[must_use]
pub fn input_payload(input_id: &str) -> Value {
    json!({ "inputId": input_id })
}

/// Payload for [`SsapService::CreateToast`].
#[must_use]
pub fn toast_payload(message: &str) -> Value {
    json!({ "message": message })
}
