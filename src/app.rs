//! The application object every request, message and modal hangs off.

use std::sync::Arc;

use serde_json::Value;

use crate::client::SlackClient;
use crate::config::AppConfig;
use crate::emitter::{EventRegistry, Handler};
use crate::error::{Error, Result};
use crate::observability::VIEW_CALLBACKS;
use crate::request::{Request, RequestType};

/// A handler for view submissions and closes.
///
/// The returned value, when present, is the body of the HTTP reply to the
/// platform, e.g. a `response_action` directive produced by a modal.
pub type ViewHandler = dyn Handler<Request, Option<Value>>;

/// The emitters modal views route their callbacks through.
#[derive(Debug)]
pub struct Interactivity {
    /// `view_submission` handlers keyed by the view's `callback_id`.
    pub view: EventRegistry<Request, Option<Value>>,
    /// `view_closed` handlers keyed by the view's `callback_id`.
    pub view_closed: EventRegistry<Request, Option<Value>>,
}

impl Default for Interactivity {
    fn default() -> Self {
        Self {
            view: EventRegistry::new("view"),
            view_closed: EventRegistry::new("view_closed"),
        }
    }
}

/// A Slack app: its configuration, Web API client and interactivity emitters.
#[derive(Debug)]
pub struct SlackApp {
    config: AppConfig,
    client: SlackClient,
    /// Interactivity emitters.
    pub ic: Interactivity,
}

impl SlackApp {
    /// Create an app from a configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = SlackClient::from_config(&config)?;
        Ok(Self {
            config,
            client,
            ic: Interactivity::default(),
        })
    }

    /// Create an app and wrap it for sharing with requests.
    pub fn shared(config: AppConfig) -> Result<Arc<Self>> {
        Self::new(config).map(Arc::new)
    }

    /// The app configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The Web API client.
    pub fn client(&self) -> &SlackClient {
        &self.client
    }

    /// Route a `view_submission` or `view_closed` request to its registered
    /// handler by the view's `callback_id`.
    ///
    /// Returns `Ok(None)` when no handler is registered; the platform treats
    /// an empty reply to a submission as "close the modal".
    pub async fn handle_view(&self, rqst: Request) -> Result<Option<Value>> {
        let callback_id = rqst
            .rqst_data
            .pointer("/view/callback_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                Error::validation(
                    "view payload has no callback_id",
                    Some("view.callback_id".to_string()),
                )
            })?;
        let registry = match &rqst.rqst_type {
            RequestType::ViewSubmission => &self.ic.view,
            RequestType::ViewClosed => &self.ic.view_closed,
            other => {
                return Err(Error::validation(
                    format!("{} is not a view request", other.as_str()),
                    Some("type".to_string()),
                ));
            }
        };
        VIEW_CALLBACKS.click();
        tracing::debug!(
            callback_id = %callback_id,
            rqst_type = rqst.rqst_type.as_str(),
            "routing view callback"
        );
        Ok(registry.emit(&callback_id, rqst).await?.flatten())
    }
}
