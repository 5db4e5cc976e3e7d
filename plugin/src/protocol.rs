//! Messages exchanged with the Stream Deck host over the plugin WebSocket.

use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events the host sends to the plugin.
///
/// Only the events this action reacts to are modelled; everything else
/// (device and application notifications, global settings) lands in `Other`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    /// First event for a key, right before it is shown
    WillAppear(ActionEvent),
    /// The key is no longer shown (page switch, profile switch, removal)
    WillDisappear(ActionEvent),
    KeyDown(ActionEvent),
    KeyUp(ActionEvent),
    /// Persisted settings changed, or were requested with `getSettings`
    DidReceiveSettings(ActionEvent),
    /// Ad-hoc message from the property inspector
    SendToPlugin(InspectorMessage),
    PropertyInspectorDidAppear(ContextEvent),
    PropertyInspectorDidDisappear(ContextEvent),
    SystemDidWakeUp,
    #[serde(other)]
    Other,
}

impl HostEvent {
    pub fn context(&self) -> Option<&str> {
        match self {
            HostEvent::WillAppear(e)
            | HostEvent::WillDisappear(e)
            | HostEvent::KeyDown(e)
            | HostEvent::KeyUp(e)
            | HostEvent::DidReceiveSettings(e) => Some(&e.context),
            HostEvent::SendToPlugin(m) => Some(&m.context),
            HostEvent::PropertyInspectorDidAppear(e) | HostEvent::PropertyInspectorDidDisappear(e) => {
                Some(&e.context)
            }
            HostEvent::SystemDidWakeUp | HostEvent::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionEvent {
    #[serde(default)]
    pub action: String,
    pub context: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub payload: ActionPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub is_in_multi_action: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Coordinates {
    pub column: u32,
    pub row: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContextEvent {
    #[serde(default)]
    pub action: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InspectorMessage {
    #[serde(default)]
    pub action: String,
    pub context: String,
    #[serde(default)]
    pub payload: Value,
}

impl InspectorMessage {
    /// The `{key, value}` pair the inspector form sends when a field changes
    pub fn setting_change(&self) -> Option<(&str, &Value)> {
        let collection = self.payload.get("sdpi_collection")?;
        let key = collection.get("key")?.as_str()?;
        if key.is_empty() {
            return None;
        }
        Some((key, collection.get("value").unwrap_or(&Value::Null)))
    }
}

/// Which display a title or image applies to
const TARGET_HARDWARE_AND_SOFTWARE: u8 = 0;

/// Commands the plugin sends to the host, each addressed to one key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostCommand {
    SetTitle { context: String, payload: TitlePayload },
    SetImage { context: String, payload: ImagePayload },
    SetSettings { context: String, payload: Settings },
    ShowAlert { context: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitlePayload {
    pub title: String,
    pub target: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePayload {
    pub image: String,
    pub target: u8,
}

impl HostCommand {
    pub fn set_title(context: &str, title: impl Into<String>) -> Self {
        HostCommand::SetTitle {
            context: context.to_string(),
            payload: TitlePayload {
                title: title.into(),
                target: TARGET_HARDWARE_AND_SOFTWARE,
            },
        }
    }

    pub fn set_image(context: &str, image: String) -> Self {
        HostCommand::SetImage {
            context: context.to_string(),
            payload: ImagePayload {
                image,
                target: TARGET_HARDWARE_AND_SOFTWARE,
            },
        }
    }

    pub fn set_settings(context: &str, settings: Settings) -> Self {
        HostCommand::SetSettings {
            context: context.to_string(),
            payload: settings,
        }
    }

    pub fn show_alert(context: &str) -> Self {
        HostCommand::ShowAlert {
            context: context.to_string(),
        }
    }

    pub fn context(&self) -> &str {
        match self {
            HostCommand::SetTitle { context, .. }
            | HostCommand::SetImage { context, .. }
            | HostCommand::SetSettings { context, .. }
            | HostCommand::ShowAlert { context } => context,
        }
    }
}

/// First message on the socket; tells the host which plugin instance this is
#[derive(Debug, Serialize)]
pub struct Registration<'a> {
    pub event: &'a str,
    pub uuid: &'a str,
}
