use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::{Arg, Command};
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slashkit::cli::context;
use slashkit::{
    AppConfig, Dispatch, Error, Invocation, Request, RequestType, Resolution, SlackApp,
    SlashCommand,
};

fn ops() -> SlashCommand {
    SlashCommand::new(
        Command::new("ops")
            .version("1.2.0")
            .about("Network operations")
            .subcommand(Command::new("ping").about("Check the bot is alive"))
            .subcommand(
                Command::new("vlan").about("VLAN commands").subcommand(
                    Command::new("show")
                        .about("Show a VLAN")
                        .arg(Arg::new("id").long("id").required(true).help("VLAN id")),
                ),
            ),
    )
    .unwrap()
}

async fn server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "channel": "C1",
            "ts": "1.2",
        })))
        .mount(&server)
        .await;
    server
}

fn app(server: &MockServer) -> Arc<SlackApp> {
    let config = AppConfig::new("xoxb-test").with_api_url(format!("{}/api/", server.uri()));
    SlackApp::shared(config).unwrap()
}

fn command(app: &Arc<SlackApp>, text: &str) -> Request {
    Request::new(
        Arc::clone(app),
        RequestType::Command,
        json!({"command": "/ops", "text": text, "user_id": "U1", "channel_id": "C1"}),
    )
    .with_user_id("U1")
    .with_channel("C1")
}

async fn posted(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/chat.postMessage")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn counter(ops: &SlashCommand, event_id: &str) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    ops.on(event_id, move |_: Invocation| {
        let seen = Arc::clone(&seen);
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok::<(), Error>(())
        }
    });
    calls
}

#[tokio::test]
async fn help_flag_replies_with_generated_help() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();
    let root = counter(&ops, "ops");

    let outcome = assert_ok!(ops.dispatch(command(&app, "--help")).await);
    assert_eq!(outcome, Dispatch::HelpSent);
    assert_eq!(root.load(Ordering::SeqCst), 0);

    let Resolution::Help { text } = context::scope(|| ops.resolve(&["--help".to_string()])) else {
        panic!("expected help");
    };
    let messages = posted(&server).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["channel"], json!("C1"));
    assert_eq!(messages[0]["fallback"], json!(text));
    assert_eq!(messages[0]["text"], json!(format!("*Command help:*\n```{text}```")));
}

#[tokio::test]
async fn unknown_option_shows_the_attempt_and_help() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();
    let show = counter(&ops, "ops.vlan.show");

    let outcome = assert_ok!(ops.dispatch(command(&app, "vlan show --id 7 --bogus")).await);
    assert_eq!(outcome, Dispatch::HelpSent);
    assert_eq!(show.load(Ordering::SeqCst), 0);

    let messages = posted(&server).await;
    assert_eq!(messages.len(), 1);
    let attachments = messages[0]["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 3);
    assert_eq!(attachments[0]["color"], json!("#FF0000"));
    assert_eq!(
        attachments[0]["pretext"],
        json!("Hi <@U1>, I could not run your command")
    );
    assert_eq!(
        attachments[0]["text"],
        json!("```/ops vlan show --id 7 --bogus```")
    );
    assert!(attachments[1]["text"].as_str().unwrap().contains("--bogus"));
    let help = attachments[2]["text"].as_str().unwrap();
    assert!(help.contains("Usage: ops vlan show"));
    assert!(help.contains("VLAN id"));
}

#[tokio::test]
async fn missing_parameter_is_answered_not_raised() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();
    let show = counter(&ops, "ops.vlan.show");

    let outcome = assert_ok!(ops.dispatch(command(&app, "vlan show")).await);
    assert_eq!(outcome, Dispatch::HelpSent);
    assert_eq!(show.load(Ordering::SeqCst), 0);

    let messages = posted(&server).await;
    assert_eq!(messages.len(), 1);
    let attachments = messages[0]["attachments"].as_array().unwrap();
    assert!(attachments[1]["text"].as_str().unwrap().contains("--id"));
    assert!(
        attachments[2]["text"]
            .as_str()
            .unwrap()
            .contains("Usage: ops vlan show")
    );
}

#[tokio::test]
async fn leaf_handler_is_awaited_once_with_its_arguments() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    ops.on("ops.vlan.show", move |inv: Invocation| {
        let seen = Arc::clone(&seen);
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(inv.event_id, "ops.vlan.show");
            assert_eq!(inv.args, vec!["vlan", "show", "--id", "7"]);
            let id = inv.matches.get_one::<String>("id").cloned().unwrap_or_default();
            inv.response()
                .send(None, json!({"text": format!("VLAN {id}")}))
                .await?;
            Ok::<(), Error>(())
        }
    });

    let outcome = assert_ok!(ops.dispatch(command(&app, "vlan show --id 7")).await);
    assert_eq!(outcome, Dispatch::HandlerRun);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let messages = posted(&server).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], json!("VLAN 7"));
}

#[tokio::test]
async fn group_runs_only_when_no_child_was_invoked() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();
    let group = counter(&ops, "ops.vlan");
    let child = counter(&ops, "ops.vlan.show");

    let outcome = assert_ok!(ops.dispatch(command(&app, "vlan")).await);
    assert_eq!(outcome, Dispatch::HandlerRun);
    assert_eq!(group.load(Ordering::SeqCst), 1);
    assert_eq!(child.load(Ordering::SeqCst), 0);

    let outcome = assert_ok!(ops.dispatch(command(&app, "vlan show --id 1")).await);
    assert_eq!(outcome, Dispatch::HandlerRun);
    assert_eq!(group.load(Ordering::SeqCst), 1);
    assert_eq!(child.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unregistered_commands_are_silent() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();

    let outcome = assert_ok!(ops.dispatch(command(&app, "ping")).await);
    assert_eq!(outcome, Dispatch::Noop);
    let outcome = assert_ok!(ops.dispatch(command(&app, "")).await);
    assert_eq!(outcome, Dispatch::Noop);
    assert!(posted(&server).await.is_empty());
}

#[tokio::test]
async fn version_flag_sends_the_version() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();

    let outcome = assert_ok!(ops.dispatch(command(&app, "--version")).await);
    assert_eq!(outcome, Dispatch::Exited);
    let messages = posted(&server).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], json!("ops, version 1.2.0"));
}

#[tokio::test]
async fn handler_errors_reach_the_caller() {
    let server = server().await;
    let app = app(&server);
    let ops = ops();
    ops.on("ops.ping", |_: Invocation| async {
        Err::<(), _>(Error::handler("device unreachable"))
    });

    let err = assert_err!(ops.dispatch(command(&app, "ping")).await);
    assert!(matches!(err, Error::Handler { .. }));
    assert!(posted(&server).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_usage_errors_keep_their_own_context() {
    let server = server().await;
    let app = app(&server);
    let ops = Arc::new(ops());

    let mut dispatches = Vec::new();
    for i in 0..12 {
        let text = if i % 2 == 0 { "vlan show" } else { "ping --nope" };
        let ops = Arc::clone(&ops);
        let rqst = command(&app, text);
        dispatches.push(tokio::spawn(async move { ops.dispatch(rqst).await }));
    }
    for outcome in futures::future::join_all(dispatches).await {
        assert_eq!(outcome.unwrap().unwrap(), Dispatch::HelpSent);
    }

    let messages = posted(&server).await;
    assert_eq!(messages.len(), 12);
    for message in messages {
        let attempt = message["attachments"][0]["text"].as_str().unwrap().to_string();
        let help = message["attachments"][2]["text"].as_str().unwrap().to_string();
        if attempt.contains("vlan show") {
            assert!(help.contains("Usage: ops vlan show"), "{help}");
        } else {
            assert!(help.contains("Usage: ops ping"), "{help}");
        }
    }
}
