//! Opening, updating and pushing modal views.
//!
//! A [`Modal`] is bound to the request that produced it. While that request is
//! a `view_submission` being answered, updates and pushes are expressed as
//! `response_action` directives returned to the platform in the HTTP reply
//! instead of Web API calls. A detached modal, one manipulated outside the
//! request/response cycle, always uses the Web API.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::app::{SlackApp, ViewHandler};
use crate::emitter::{EventRegistry, Handler};
use crate::error::{Error, Result};
use crate::request::{Request, RequestType};
use crate::view::View;

/// Which operation [`Modal::show`] performs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModalMode {
    /// `views.open`
    #[default]
    Open,
    /// `views.push`, or a push directive while answering a submission.
    Push,
    /// `views.update`, or an update directive while answering a submission.
    Update,
}

/// The outcome of a modal operation.
#[derive(Clone, Debug, PartialEq)]
pub enum ModalResult {
    /// A `response_action` directive to return as the HTTP reply body.
    ResponseAction(Value),
    /// The Web API reply to the call that was made.
    Api(Value),
}

impl ModalResult {
    /// The directive, if this outcome must be returned to the platform.
    pub fn response_action(&self) -> Option<&Value> {
        match self {
            ModalResult::ResponseAction(directive) => Some(directive),
            ModalResult::Api(_) => None,
        }
    }

    /// The underlying JSON value.
    pub fn into_value(self) -> Value {
        match self {
            ModalResult::ResponseAction(value) | ModalResult::Api(value) => value,
        }
    }
}

/// A modal view bound to a request.
pub struct Modal {
    rqst: Request,
    /// The view this modal shows.
    pub view: View,
    /// Operating outside the originating request/response cycle.
    pub detached: bool,
    /// What [`Modal::show`] does.
    pub mode: ModalMode,
    callback: Option<Arc<ViewHandler>>,
    notify_on_close: Option<Arc<ViewHandler>>,
}

impl Modal {
    /// Create a modal for `rqst`.
    ///
    /// A request carrying a `view` (e.g. a submission) seeds the modal with
    /// that view; otherwise it starts from an empty modal view.
    pub fn new(rqst: &Request) -> Result<Self> {
        let view = match rqst.rqst_data.get("view") {
            Some(payload) => View::from_payload(payload)?,
            None => View::modal(),
        };
        Ok(Self::with_view(rqst, view))
    }

    /// Create a modal for `rqst` showing `view`.
    pub fn with_view(rqst: &Request, view: View) -> Self {
        Self {
            rqst: rqst.clone(),
            view,
            detached: false,
            mode: ModalMode::Open,
            callback: None,
            notify_on_close: None,
        }
    }

    /// Mark the modal as detached from the originating request.
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    /// Set the operation [`Modal::show`] performs.
    pub fn show_as(mut self, mode: ModalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run `handler` when the view is submitted.
    ///
    /// Handlers are keyed by the view's `callback_id` and the first one
    /// registered for an id serves every view carrying it. Later modals with
    /// the same id keep that handler; register a shared callback once through
    /// `app.ic.view` and leave it off the modal.
    pub fn on_submit<H>(mut self, handler: H) -> Self
    where
        H: Handler<Request, Option<Value>> + 'static,
    {
        self.callback = Some(Arc::new(handler));
        self
    }

    /// Ask for close notifications and run `handler` when the view is closed.
    ///
    /// Keyed by `callback_id` like [`Modal::on_submit`].
    pub fn on_close<H>(mut self, handler: H) -> Self
    where
        H: Handler<Request, Option<Value>> + 'static,
    {
        self.notify_on_close = Some(Arc::new(handler));
        self
    }

    /// The request this modal is bound to.
    pub fn request(&self) -> &Request {
        &self.rqst
    }

    fn app(&self) -> &SlackApp {
        self.rqst.app()
    }

    fn answering_submission(&self) -> bool {
        self.rqst.rqst_type == RequestType::ViewSubmission
    }

    /// Perform the configured [`ModalMode`].
    pub async fn show(&mut self) -> Result<ModalResult> {
        self.apply(self.mode, None).await
    }

    /// Open the view with `views.open`.
    pub async fn open(&mut self) -> Result<ModalResult> {
        self.apply(ModalMode::Open, None).await
    }

    /// Update the view in place.
    pub async fn update(&mut self) -> Result<ModalResult> {
        self.apply(ModalMode::Update, None).await
    }

    /// Push the view onto the modal stack.
    pub async fn push(&mut self) -> Result<ModalResult> {
        self.apply(ModalMode::Push, None).await
    }

    /// Register callbacks, then perform `mode`.
    ///
    /// `callback`, when given, replaces the construction-time submit handler
    /// for this call.
    pub async fn apply(
        &mut self,
        mode: ModalMode,
        callback: Option<Arc<ViewHandler>>,
    ) -> Result<ModalResult> {
        self.register_callbacks(callback)?;
        match mode {
            ModalMode::Open => self.do_open().await,
            ModalMode::Update => self.do_update().await,
            ModalMode::Push => self.do_push().await,
        }
    }

    fn register_callbacks(&mut self, callback: Option<Arc<ViewHandler>>) -> Result<()> {
        let callback = callback.or_else(|| self.callback.clone());
        if callback.is_none() && self.notify_on_close.is_none() {
            return Ok(());
        }
        let callback_id = self
            .view
            .callback_id
            .clone()
            .ok_or_else(|| Error::state("view has no callback_id to route callbacks by"))?;
        if let Some(callback) = callback {
            register_once(&self.app().ic.view, &callback_id, callback);
        }
        if let Some(on_close) = self.notify_on_close.clone() {
            self.view.notify_on_close = true;
            register_once(&self.app().ic.view_closed, &callback_id, on_close);
        }
        Ok(())
    }

    async fn do_open(&self) -> Result<ModalResult> {
        let trigger_id = self.trigger_id()?;
        let reply = self
            .rqst
            .client()
            .views_open(trigger_id, self.view.to_payload()?)
            .await?;
        Ok(ModalResult::Api(reply))
    }

    async fn do_update(&self) -> Result<ModalResult> {
        if self.answering_submission() && !self.detached {
            return Ok(ModalResult::ResponseAction(json!({
                "response_action": "update",
                "view": self.view.to_payload()?,
            })));
        }
        let Some(view_id) = self.view.view_id.as_deref() else {
            return Err(Error::state("Attempting to update view in unknown context"));
        };
        let hash = if self.detached {
            None
        } else {
            self.view.hash.as_deref()
        };
        let reply = self
            .rqst
            .client()
            .views_update(self.view.to_payload()?, view_id, hash)
            .await?;
        Ok(ModalResult::Api(reply))
    }

    async fn do_push(&self) -> Result<ModalResult> {
        if self.answering_submission() {
            return Ok(ModalResult::ResponseAction(json!({
                "response_action": "push",
                "view": self.view.to_payload()?,
            })));
        }
        let trigger_id = self.trigger_id()?;
        let reply = self
            .rqst
            .client()
            .views_push(trigger_id, self.view.to_payload()?)
            .await?;
        Ok(ModalResult::Api(reply))
    }

    fn trigger_id(&self) -> Result<&str> {
        self.rqst
            .trigger_id
            .as_deref()
            .ok_or_else(|| Error::state("request has no trigger_id"))
    }
}

fn register_once(
    registry: &EventRegistry<Request, Option<Value>>,
    callback_id: &str,
    handler: Arc<ViewHandler>,
) {
    if registry.contains(callback_id) {
        tracing::debug!(callback_id, "view callback already registered, keeping it");
        return;
    }
    registry.register(callback_id, handler);
}
