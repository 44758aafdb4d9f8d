//! Dispatch a slash command line against a demo `/ops` command tree.
//!
//! The request is synthesized locally and every reply goes out through the
//! Web API, so this exercises the whole dispatch path against a workspace or
//! a mock server.
//!
//! # Usage
//!
//! ```bash
//! # Ask for help; the reply is posted in C0123
//! slashkit-invoke --channel C0123 --user U0123 -- --help
//!
//! # Run a leaf command against a local mock of the Web API
//! slashkit-invoke --api-url http://localhost:8080/api/ --channel C0123 --text "vlan show --id 132"
//! ```
//!
//! Set `RUST_LOG=slashkit=debug` to follow routing decisions.

use arrrg::CommandLine;
use clap::{Arg, ArgAction, Command, value_parser};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use slashkit::utils::text::TextBlockWrapper;
use slashkit::{
    AppArgs, AppConfig, Error, Invocation, Request, RequestType, SlackApp, SlashCommand,
};

const DEFAULT_COMMAND: &str = "/ops";

fn ops_command() -> Command {
    Command::new("ops")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Network operations from chat")
        .subcommand(Command::new("ping").about("Check that the bot is listening"))
        .subcommand(
            Command::new("vlan")
                .about("Inspect VLANs")
                .subcommand(
                    Command::new("show")
                        .about("Show VLAN membership")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(u16))
                                .help("VLAN id"),
                        )
                        .arg(
                            Arg::new("ports")
                                .long("ports")
                                .default_value("48")
                                .value_parser(value_parser!(u16))
                                .help("Number of ports to list"),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("List configured VLANs")
                        .arg(Arg::new("all").long("all").action(ArgAction::SetTrue)),
                ),
        )
}

async fn ping(inv: Invocation) -> slashkit::Result<()> {
    inv.response().send(None, json!({"text": "pong"})).await?;
    Ok(())
}

async fn vlan_summary(inv: Invocation) -> slashkit::Result<()> {
    let text = format!(
        "<@{}>, try `{} vlan show --id <ID>`",
        inv.rqst.user_id,
        inv.rqst.command()
    );
    inv.response().send(None, json!({"text": text})).await?;
    Ok(())
}

async fn vlan_show(inv: Invocation) -> slashkit::Result<()> {
    let id = inv
        .matches
        .get_one::<u16>("id")
        .copied()
        .ok_or_else(|| Error::handler("--id is required"))?;
    let ports = inv.matches.get_one::<u16>("ports").copied().unwrap_or(48);
    let mut report = String::from("VLAN  Name      Status    Ports\n");
    report.push_str(&format!("{id:<5} demo-{id:<5} active    "));
    for port in 1..=ports {
        if port > 1 && port % 8 == 1 {
            report.push_str(&format!("\n{:26}", ""));
        }
        report.push_str(&format!("Po{port}, "));
    }
    let blocks: Vec<_> = TextBlockWrapper::new(500)
        .with_break_long_words(false)
        .wrap(&report)
        .into_iter()
        .map(|chunk| {
            json!({
                "type": "section",
                "text": {"type": "mrkdwn", "text": format!("```{chunk}```")},
            })
        })
        .collect();
    inv.response()
        .send(None, json!({"text": format!("VLAN {id}"), "blocks": blocks}))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (args, free) = AppArgs::from_command_line_relaxed("slashkit-invoke [OPTIONS] [TEXT]...");
    let config = AppConfig::from_args(&args)?;
    let app = SlackApp::shared(config)?;

    let ops = SlashCommand::new(ops_command())?;
    ops.on("ops.ping", ping);
    ops.on("ops.vlan", vlan_summary);
    ops.on("ops.vlan.show", vlan_show);

    let command = args.command.clone().unwrap_or_else(|| DEFAULT_COMMAND.to_string());
    let text = args.text.clone().unwrap_or_else(|| free.join(" "));
    let user = args.user.clone().unwrap_or_else(|| "USLASHKIT".to_string());
    let Some(channel) = args.channel.clone() else {
        eprintln!("Error: --channel is required to post replies");
        std::process::exit(1);
    };

    let rqst = Request::new(
        app,
        RequestType::Command,
        json!({
            "command": command,
            "text": text,
            "user_id": user.clone(),
            "channel_id": channel.clone(),
        }),
    )
    .with_user_id(user)
    .with_channel(channel);

    let outcome = ops.dispatch(rqst).await?;
    println!("{outcome:?}");
    Ok(())
}
