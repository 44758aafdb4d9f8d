use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;

/// A modal view payload.
///
/// Views are built fresh or hydrated from an inbound payload. Hydration keeps
/// the read-only `id`, `hash` and `state` the platform sent; those never go
/// back out inside the `view` object, only as the separate `view_id` and
/// `hash` arguments of `views.update`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct View {
    /// The view type, `modal` for modals.
    pub r#type: String,

    /// Identifier submissions and closes are routed by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,

    /// Title text object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,

    /// Submit button text object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<Value>,

    /// Close button text object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<Value>,

    /// Layout blocks.
    #[serde(default)]
    pub blocks: Vec<Value>,

    /// Opaque string carried through submissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<String>,

    /// App-chosen unique identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Ask the platform to send `view_closed` when the user closes the view.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub notify_on_close: bool,

    /// Close every view in the stack when this one is closed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_on_close: bool,

    /// Disable the submit button until an input changes.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub submit_disabled: bool,

    /// Platform-assigned view identifier.
    #[serde(rename = "id", default, skip_serializing)]
    pub view_id: Option<String>,

    /// Optimistic-concurrency token for `views.update`.
    #[serde(default, skip_serializing)]
    pub hash: Option<String>,

    /// Submitted input values.
    #[serde(default, skip_serializing)]
    pub state: Option<Value>,
}

impl View {
    /// Create an empty view of the given type.
    pub fn new(r#type: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            ..Self::default()
        }
    }

    /// Create an empty modal view.
    pub fn modal() -> Self {
        Self::new("modal")
    }

    /// Hydrate a view from a payload received from the platform.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        Ok(serde_json::from_value(payload.clone())?)
    }

    /// The `view` object to send to the Web API or in a response directive.
    pub fn to_payload(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Set the callback id.
    pub fn with_callback_id(mut self, callback_id: impl Into<String>) -> Self {
        self.callback_id = Some(callback_id.into());
        self
    }

    /// Set the title as plain text.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(plain_text(title));
        self
    }

    /// Set the submit button label as plain text.
    pub fn with_submit(mut self, label: &str) -> Self {
        self.submit = Some(plain_text(label));
        self
    }

    /// Set the close button label as plain text.
    pub fn with_close(mut self, label: &str) -> Self {
        self.close = Some(plain_text(label));
        self
    }

    /// Set the private metadata.
    pub fn with_private_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.private_metadata = Some(metadata.into());
        self
    }

    /// Replace the blocks.
    pub fn with_blocks(mut self, blocks: Vec<Value>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Append a block.
    pub fn push_block(&mut self, block: Value) {
        self.blocks.push(block);
    }

    /// Submitted values, `state.values`, if the view came from a submission.
    pub fn state_values(&self) -> Option<&Value> {
        self.state.as_ref().and_then(|state| state.get("values"))
    }
}

/// A `plain_text` text object.
pub fn plain_text(text: &str) -> Value {
    json!({"type": "plain_text", "text": text})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> Value {
        json!({
            "id": "V0123",
            "team_id": "T1",
            "type": "modal",
            "callback_id": "vlan-edit",
            "hash": "156772938.1827394",
            "title": {"type": "plain_text", "text": "Edit VLAN"},
            "submit": {"type": "plain_text", "text": "Save"},
            "blocks": [{"type": "input", "block_id": "name"}],
            "private_metadata": "vlan=132",
            "notify_on_close": true,
            "state": {"values": {"name": {"value": {"type": "plain_text_input", "value": "Blue"}}}},
            "root_view_id": "V0123",
            "app_id": "A1",
        })
    }

    #[test]
    fn hydrate_keeps_id_and_hash() {
        let view = View::from_payload(&submitted()).unwrap();
        assert_eq!(view.view_id.as_deref(), Some("V0123"));
        assert_eq!(view.hash.as_deref(), Some("156772938.1827394"));
        assert_eq!(view.callback_id.as_deref(), Some("vlan-edit"));
        assert!(view.notify_on_close);
        assert_eq!(
            view.state_values().unwrap()["name"]["value"]["value"],
            json!("Blue")
        );
    }

    #[test]
    fn payload_drops_read_only_fields() {
        let view = View::from_payload(&submitted()).unwrap();
        let payload = view.to_payload().unwrap();
        assert_eq!(
            payload,
            json!({
                "type": "modal",
                "callback_id": "vlan-edit",
                "title": {"type": "plain_text", "text": "Edit VLAN"},
                "submit": {"type": "plain_text", "text": "Save"},
                "blocks": [{"type": "input", "block_id": "name"}],
                "private_metadata": "vlan=132",
                "notify_on_close": true,
            })
        );
    }

    #[test]
    fn builders() {
        let mut view = View::modal()
            .with_callback_id("ping")
            .with_title("Ping")
            .with_close("Done");
        view.push_block(json!({"type": "divider"}));
        assert_eq!(view.r#type, "modal");
        assert_eq!(view.title, Some(plain_text("Ping")));
        assert_eq!(view.blocks.len(), 1);
        assert!(view.view_id.is_none());
    }
}
