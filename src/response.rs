use std::ops::{Deref, DerefMut};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::messenger::Messenger;
use crate::request::Request;

/// A [`Messenger`] bound to the request it answers.
///
/// Defaults to the request's channel and response URL.
#[derive(Clone, Debug)]
pub struct Response {
    messenger: Messenger,
    rqst: Request,
}

impl Response {
    /// Create a response for `rqst`.
    pub fn new(rqst: &Request) -> Self {
        let messenger = Messenger::new(
            rqst.app(),
            rqst.response_url.clone(),
            rqst.channel.clone(),
            None,
        );
        Self {
            messenger,
            rqst: rqst.clone(),
        }
    }

    /// The request being answered.
    pub fn request(&self) -> &Request {
        &self.rqst
    }

    /// Delete the message that triggered the request.
    pub async fn delete_origin(&self) -> Result<Value> {
        let channel = self
            .rqst
            .channel
            .as_deref()
            .ok_or_else(|| Error::state("request has no originating channel"))?;
        let ts = self
            .rqst
            .rqst_data
            .pointer("/message/ts")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::state("request has no originating message"))?;
        self.messenger.client().chat_delete(channel, ts).await
    }
}

impl Deref for Response {
    type Target = Messenger;

    fn deref(&self) -> &Messenger {
        &self.messenger
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Messenger {
        &mut self.messenger
    }
}
