//! Sending messages to a channel, a user, or a response URL.

use serde_json::{Map, Value};

use crate::app::SlackApp;
use crate::client::SlackClient;
use crate::error::{Error, Result};

/// Sends messages on behalf of an app.
///
/// A messenger carries a bag of default fields that is merged into every
/// outgoing message, plus a default channel and response URL. Usable outside
/// any request, e.g. from background work.
///
/// Fields are merged in this order, later entries replacing earlier ones:
/// the channel, then the messenger's own fields, then the per-call fields.
/// Nothing reconciles a per-call field that reuses a key already held by the
/// messenger (e.g. `thread_ts`); keep the two sets of names distinct.
#[derive(Clone, Debug)]
pub struct Messenger {
    client: SlackClient,
    /// Default response URL for [`Messenger::send_response`].
    pub response_url: Option<String>,
    /// Default channel for [`Messenger::send`].
    pub channel: Option<String>,
    fields: Map<String, Value>,
}

impl Messenger {
    /// Create a messenger for `app`.
    ///
    /// When `thread_ts` is given every message is sent as a threaded reply.
    pub fn new(
        app: &SlackApp,
        response_url: Option<String>,
        channel: Option<String>,
        thread_ts: Option<String>,
    ) -> Self {
        let mut fields = Map::new();
        if let Some(thread_ts) = thread_ts {
            fields.insert("thread_ts".to_string(), Value::String(thread_ts));
        }
        Self {
            client: app.client().clone(),
            response_url,
            channel,
            fields,
        }
    }

    /// The client messages are sent through.
    pub fn client(&self) -> &SlackClient {
        &self.client
    }

    /// The default fields merged into every message.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Set a default field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Get a default field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Remove a default field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Send a message to `channel`, or to the messenger's channel when `None`.
    ///
    /// `fields` is a JSON object of message fields (`text`, `blocks`, ...);
    /// `Value::Null` means no extra fields. A `user` field makes the message
    /// ephemeral, visible to that user only.
    pub async fn send(&self, channel: Option<&str>, fields: Value) -> Result<Value> {
        let extra = into_fields(fields)?;
        let ephemeral = extra.contains_key("user");

        let mut body = Map::new();
        match channel.or(self.channel.as_deref()) {
            Some(channel) => {
                body.insert("channel".to_string(), Value::from(channel));
            }
            None => {
                return Err(Error::validation(
                    "no channel to send the message to",
                    Some("channel".to_string()),
                ));
            }
        }
        body.extend(self.fields.clone());
        body.extend(extra);
        let body = Value::Object(body);

        if ephemeral {
            self.client.chat_post_ephemeral(&body).await
        } else {
            self.client.chat_post_message(&body).await
        }
    }

    /// Send a message through `response_url`, or the messenger's default.
    ///
    /// Fails with [`Error::Delivery`] unless the URL answers HTTP 200.
    pub async fn send_response(&self, response_url: Option<&str>, fields: Value) -> Result<()> {
        let extra = into_fields(fields)?;
        let Some(url) = response_url.or(self.response_url.as_deref()) else {
            return Err(Error::validation(
                "no response_url to send the message to",
                Some("response_url".to_string()),
            ));
        };
        let mut body = self.fields.clone();
        body.extend(extra);
        self.client
            .post_response_url(url, &Value::Object(body))
            .await
    }
}

fn into_fields(fields: Value) -> Result<Map<String, Value>> {
    match fields {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::validation(
            format!("message fields must be a JSON object, not {other}"),
            None,
        )),
    }
}
