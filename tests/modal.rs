use std::sync::Arc;

use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slashkit::{
    AppConfig, Error, Modal, ModalMode, ModalResult, Request, RequestType, SlackApp, View,
};

fn app(server: &MockServer) -> Arc<SlackApp> {
    let config = AppConfig::new("xoxb-test").with_api_url(format!("{}/api/", server.uri()));
    SlackApp::shared(config).unwrap()
}

fn ok_reply() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "view": {"id": "V42"}}))
}

fn edit_view() -> Value {
    json!({
        "id": "V42",
        "hash": "1700000000.abcdef",
        "type": "modal",
        "callback_id": "vlan-edit",
        "title": {"type": "plain_text", "text": "Edit VLAN"},
        "submit": {"type": "plain_text", "text": "Save"},
        "blocks": [{"type": "input", "block_id": "name"}],
        "state": {"values": {"name": {"value": {"type": "plain_text_input", "value": "Blue"}}}},
    })
}

fn block_action(app: Arc<SlackApp>) -> Request {
    Request::from_payload(
        app,
        json!({
            "type": "block_actions",
            "user": {"id": "U1"},
            "trigger_id": "t-2",
            "view": edit_view(),
        }),
    )
    .unwrap()
}

fn submission(app: Arc<SlackApp>) -> Request {
    Request::from_payload(
        app,
        json!({
            "type": "view_submission",
            "user": {"id": "U1"},
            "trigger_id": "t-3",
            "view": edit_view(),
        }),
    )
    .unwrap()
}

#[tokio::test]
async fn open_calls_views_open_with_the_trigger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/views.open"))
        .and(body_partial_json(json!({
            "trigger_id": "t-1",
            "view": {"type": "modal", "callback_id": "vlan-new", "notify_on_close": true},
        })))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let app = app(&server);
    let rqst = Request::new(Arc::clone(&app), RequestType::Command, json!({"command": "/ops"}))
        .with_user_id("U1")
        .with_trigger_id("t-1");
    let view = View::modal().with_callback_id("vlan-new").with_title("New VLAN");
    let mut modal = Modal::with_view(&rqst, view)
        .on_submit(|_: Request| async { Ok::<Option<Value>, Error>(None) })
        .on_close(|_: Request| async { Ok::<Option<Value>, Error>(None) });
    let result = assert_ok!(modal.open().await);
    assert!(matches!(result, ModalResult::Api(_)));
    assert!(app.ic.view.contains("vlan-new"));
    assert!(app.ic.view_closed.contains("vlan-new"));
}

#[tokio::test]
async fn update_outside_a_submission_sends_the_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/views.update"))
        .and(body_partial_json(json!({
            "view_id": "V42",
            "hash": "1700000000.abcdef",
            "view": {"title": {"type": "plain_text", "text": "Edit VLAN 132"}},
        })))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let rqst = block_action(app(&server));
    let mut modal = assert_ok!(Modal::new(&rqst));
    modal.view = modal.view.clone().with_title("Edit VLAN 132");
    let result = assert_ok!(modal.update().await);
    assert_eq!(result.into_value()["ok"], json!(true));

    let sent: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert!(sent[0]["view"].get("id").is_none());
    assert!(sent[0]["view"].get("state").is_none());
}

#[tokio::test]
async fn detached_update_omits_the_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/views.update"))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let rqst = submission(app(&server));
    let mut modal = assert_ok!(Modal::new(&rqst)).detached(true);
    let result = assert_ok!(modal.update().await);
    assert!(result.response_action().is_none());

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["view_id"], json!("V42"));
    assert!(body.get("hash").is_none());
}

#[tokio::test]
async fn push_outside_a_submission_calls_views_push() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/views.push"))
        .and(body_partial_json(json!({"trigger_id": "t-2"})))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let rqst = block_action(app(&server));
    let mut modal = Modal::with_view(&rqst, View::modal().with_title("Confirm"))
        .show_as(ModalMode::Push);
    assert_ok!(modal.show().await);
}

#[tokio::test]
async fn submissions_route_to_the_registered_callback() {
    let server = MockServer::start().await;
    let app = app(&server);

    let opener = Request::new(Arc::clone(&app), RequestType::Command, json!({}))
        .with_trigger_id("t-1");
    Mock::given(method("POST"))
        .and(path("/api/views.open"))
        .respond_with(ok_reply())
        .mount(&server)
        .await;
    let mut modal = Modal::with_view(&opener, View::modal().with_callback_id("vlan-edit"))
        .on_submit(|rqst: Request| async move {
            let mut modal = Modal::new(&rqst)?;
            let name = modal
                .view
                .state_values()
                .and_then(|values| values.pointer("/name/value/value"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            modal.view = modal.view.clone().with_title(&format!("Saved {name}"));
            let result = modal.update().await?;
            Ok::<Option<Value>, Error>(result.response_action().cloned())
        });
    assert_ok!(modal.open().await);

    let reply = assert_ok!(app.handle_view(submission(Arc::clone(&app))).await);
    let directive = reply.unwrap();
    assert_eq!(directive["response_action"], json!("update"));
    assert_eq!(directive["view"]["title"]["text"], json!("Saved Blue"));
    assert!(directive["view"].get("hash").is_none());

    // Only the open went over the network; the update rode on the reply.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn closes_without_a_handler_are_ignored() {
    let server = MockServer::start().await;
    let app = app(&server);
    let closed = Request::from_payload(
        Arc::clone(&app),
        json!({"type": "view_closed", "user": {"id": "U1"}, "view": edit_view()}),
    )
    .unwrap();
    let reply = assert_ok!(app.handle_view(closed).await);
    assert_eq!(reply, None);

    let rqst = Request::new(Arc::clone(&app), RequestType::Command, json!({}));
    let err = assert_err!(app.handle_view(rqst).await);
    assert!(err.is_validation());
}
