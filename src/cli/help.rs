//! Chat messages for help, usage errors and version requests.

use serde_json::{Value, json};

use crate::request::Request;

const ERROR_COLOR: &str = "#FF0000";

/// The message sent when help is requested explicitly.
pub fn help_message(help_text: &str) -> Value {
    json!({
        "text": format!("*Command help:*\n```{help_text}```"),
        "fallback": help_text,
    })
}

/// The message sent for a version request.
pub fn version_message(version_text: &str) -> Value {
    json!({"text": version_text})
}

/// The message sent when a command line could not be run.
///
/// The attempted command line is shown in red under the user's mention,
/// followed by the error and the help text of the command that failed.
pub fn usage_message(rqst: &Request, errmsg: Option<&str>, help_text: &str) -> Value {
    let try_cmd = format!("{} {}", rqst.command(), rqst.text());
    let mut attachments = Vec::new();
    if let Some(errmsg) = errmsg {
        attachments.push(json!({
            "color": ERROR_COLOR,
            "pretext": format!("Hi <@{}>, I could not run your command", rqst.user_id),
            "text": format!("```{try_cmd}```"),
            "fallback": try_cmd,
        }));
        attachments.push(json!({
            "text": format!("```{errmsg}```"),
            "fallback": errmsg,
        }));
    }
    attachments.push(json!({
        "pretext": "Command help",
        "text": format!("```{help_text}```"),
        "fallback": help_text,
    }));
    json!({"attachments": attachments})
}
