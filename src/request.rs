//! Inbound requests: slash commands and interactive payloads.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::app::SlackApp;
use crate::client::SlackClient;
use crate::error::{Error, Result};

/// The kind of inbound request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestType {
    /// A slash command.
    Command,
    /// A block element interaction.
    BlockActions,
    /// A modal was submitted.
    ViewSubmission,
    /// A modal was closed by the user.
    ViewClosed,
    /// A global shortcut.
    Shortcut,
    /// A message shortcut.
    MessageAction,
    /// Anything else, by its wire name.
    Other(String),
}

impl RequestType {
    /// Parse the `type` field of an interactive payload.
    pub fn parse(s: &str) -> Self {
        match s {
            "command" => RequestType::Command,
            "block_actions" => RequestType::BlockActions,
            "view_submission" => RequestType::ViewSubmission,
            "view_closed" => RequestType::ViewClosed,
            "shortcut" => RequestType::Shortcut,
            "message_action" => RequestType::MessageAction,
            other => RequestType::Other(other.to_string()),
        }
    }

    /// The wire name of this request type.
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Command => "command",
            RequestType::BlockActions => "block_actions",
            RequestType::ViewSubmission => "view_submission",
            RequestType::ViewClosed => "view_closed",
            RequestType::Shortcut => "shortcut",
            RequestType::MessageAction => "message_action",
            RequestType::Other(other) => other,
        }
    }
}

/// A request received from the platform, bound to the app that received it.
#[derive(Clone)]
pub struct Request {
    app: Arc<SlackApp>,
    /// What kind of request this is.
    pub rqst_type: RequestType,
    /// The decoded request payload.
    pub rqst_data: Value,
    /// The user who triggered the request.
    pub user_id: String,
    /// The channel the request originated in, when there is one.
    pub channel: Option<String>,
    /// The URL replies to this request may be posted to.
    pub response_url: Option<String>,
    /// Short-lived token for opening or pushing views.
    pub trigger_id: Option<String>,
}

impl Request {
    /// Construct a request from its parts.
    pub fn new(app: Arc<SlackApp>, rqst_type: RequestType, rqst_data: Value) -> Self {
        Self {
            app,
            rqst_type,
            rqst_data,
            user_id: String::new(),
            channel: None,
            response_url: None,
            trigger_id: None,
        }
    }

    /// Decode an `application/x-www-form-urlencoded` slash-command body.
    pub fn from_command_form(app: Arc<SlackApp>, body: &str) -> Result<Self> {
        let mut data = Map::new();
        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            data.insert(key.into_owned(), Value::String(value.into_owned()));
        }
        if !data.contains_key("command") {
            return Err(Error::validation(
                "slash command body has no command",
                Some("command".to_string()),
            ));
        }
        let field = |name: &str| data.get(name).and_then(Value::as_str).map(String::from);
        let user_id = field("user_id").unwrap_or_default();
        let channel = field("channel_id");
        let response_url = field("response_url");
        let trigger_id = field("trigger_id");
        Ok(Self {
            app,
            rqst_type: RequestType::Command,
            rqst_data: Value::Object(data),
            user_id,
            channel,
            response_url,
            trigger_id,
        })
    }

    /// Decode an interactive POST body carrying a `payload=` JSON field.
    pub fn from_interactive_form(app: Arc<SlackApp>, body: &str) -> Result<Self> {
        let payload = url::form_urlencoded::parse(body.as_bytes())
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                Error::validation(
                    "interactive body has no payload",
                    Some("payload".to_string()),
                )
            })?;
        let value: Value = serde_json::from_str(&payload)?;
        Self::from_payload(app, value)
    }

    /// Build a request from a decoded interactive payload.
    pub fn from_payload(app: Arc<SlackApp>, payload: Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::validation("payload is not an object", None));
        }
        let text = |pointer: &str| {
            payload
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(String::from)
        };
        let rqst_type = text("/type")
            .map(|t| RequestType::parse(&t))
            .ok_or_else(|| Error::validation("payload has no type", Some("type".to_string())))?;
        let user_id = text("/user/id").unwrap_or_default();
        let channel = text("/channel/id").or_else(|| text("/container/channel_id"));
        let response_url =
            text("/response_url").or_else(|| text("/response_urls/0/response_url"));
        let trigger_id = text("/trigger_id");
        Ok(Self {
            app,
            rqst_type,
            rqst_data: payload,
            user_id,
            channel,
            response_url,
            trigger_id,
        })
    }

    /// Set the originating user.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the originating channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set the response URL.
    pub fn with_response_url(mut self, response_url: impl Into<String>) -> Self {
        self.response_url = Some(response_url.into());
        self
    }

    /// Set the trigger id.
    pub fn with_trigger_id(mut self, trigger_id: impl Into<String>) -> Self {
        self.trigger_id = Some(trigger_id.into());
        self
    }

    /// The app that received this request.
    pub fn app(&self) -> &Arc<SlackApp> {
        &self.app
    }

    /// The app's Web API client.
    pub fn client(&self) -> &SlackClient {
        self.app.client()
    }

    /// The slash command, e.g. `/ops`; empty for interactive requests.
    pub fn command(&self) -> &str {
        self.rqst_data
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The raw text typed after the slash command.
    pub fn text(&self) -> &str {
        self.rqst_data
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("rqst_type", &self.rqst_type)
            .field("user_id", &self.user_id)
            .field("channel", &self.channel)
            .field("response_url", &self.response_url)
            .field("trigger_id", &self.trigger_id)
            .finish_non_exhaustive()
    }
}
