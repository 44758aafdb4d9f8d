//! Slash commands backed by a clap command tree.
//!
//! Dispatch runs in two steps. [`SlashCommand::resolve`] is synchronous: it
//! parses the command text against the tree and decides what should happen,
//! producing a [`Resolution`]. [`SlashCommand::dispatch`] then carries that out
//! asynchronously: it runs the handler registered for the resolved command, or
//! answers the user with help, a version string, or a usage error.
//!
//! Every node in the tree is addressed by its dotted event path, e.g.
//! `ops.vlan.show`, and handlers are registered under that path. A group
//! invoked without a subcommand runs the handler registered for the group
//! itself, if there is one.

pub mod context;
pub mod help;

use std::collections::HashSet;
use std::sync::Arc;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgMatches, ColorChoice, Command};

use crate::emitter::{EventRegistry, Handler};
use crate::error::{Error, Result};
use crate::observability::{
    DISPATCH_HANDLER_RUNS, DISPATCH_HELP, DISPATCH_UNHANDLED, DISPATCH_USAGE_ERRORS, DISPATCHES,
};
use crate::request::Request;
use crate::response::Response;

pub use context::CommandPath;

/// A handler for a resolved command.
pub type CommandHandler = dyn Handler<Invocation, ()>;

///////////////////////////////////////////// Invocation ///////////////////////////////////////////

/// Everything a command handler gets to work with.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// The request that carried the command.
    pub rqst: Request,
    /// Path of the command that was resolved.
    pub path: CommandPath,
    /// Dotted event path the handler was registered under.
    pub event_id: String,
    /// The tokenized command text.
    pub args: Vec<String>,
    /// Parsed arguments of the resolved command.
    pub matches: ArgMatches,
}

impl Invocation {
    /// A response bound to the invoking request.
    pub fn response(&self) -> Response {
        Response::new(&self.rqst)
    }
}

///////////////////////////////////////////// Resolution ///////////////////////////////////////////

/// The category of a usage error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// An unknown option, or an option or subcommand with an invalid value.
    BadOption,
    /// A required argument or subcommand was not given.
    MissingParameter,
    /// Any other misuse.
    Usage,
}

/// A command line that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageError {
    /// What went wrong.
    pub kind: UsageErrorKind,
    /// The parser's message, without usage or tips.
    pub message: String,
    /// The command whose arguments were being parsed.
    pub context: CommandPath,
    /// Help text of that command.
    pub help: String,
}

/// What a command line resolves to.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// A command without subcommands.
    Leaf {
        /// Path of the command.
        path: CommandPath,
        /// Its parsed arguments.
        matches: ArgMatches,
    },
    /// A group invoked without any of its subcommands.
    GroupDefault {
        /// Path of the group.
        path: CommandPath,
        /// Its parsed arguments.
        matches: ArgMatches,
    },
    /// Help was requested; carries the rendered help.
    Help {
        /// Rendered help text.
        text: String,
    },
    /// The version was requested; carries the version line.
    Exit {
        /// Version line.
        text: String,
    },
    /// The command line could not be parsed.
    Error(UsageError),
}

/// How a dispatch ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A registered handler ran to completion.
    HandlerRun,
    /// Help or a usage error was sent to the user.
    HelpSent,
    /// The version was sent to the user.
    Exited,
    /// Nothing was registered for the resolved command.
    Noop,
}

/////////////////////////////////////////// SlashCommand ///////////////////////////////////////////

/// A slash command: a clap command tree plus the handlers for its nodes.
#[derive(Debug)]
pub struct SlashCommand {
    command: Command,
    event_ids: HashSet<String>,
    handlers: EventRegistry<Invocation, ()>,
}

impl SlashCommand {
    /// Wrap a command tree.
    ///
    /// The root's name is the slash command without its leading slash. Fails
    /// when a name contains the path separator or two nodes share an event
    /// path.
    pub fn new(command: Command) -> Result<Self> {
        let command = command.color(ColorChoice::Never);
        let mut event_ids = HashSet::new();
        collect_event_ids(&command, CommandPath::root(command.get_name()), &mut event_ids)?;
        Ok(Self {
            command,
            event_ids,
            handlers: EventRegistry::new("command"),
        })
    }

    /// The root command name.
    pub fn name(&self) -> &str {
        self.command.get_name()
    }

    /// The command tree.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Every event path in the tree, sorted.
    pub fn event_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.event_ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Register `handler` for the node at `event_id`.
    ///
    /// Returns false if a handler was already registered there.
    pub fn register(&self, event_id: &str, handler: Arc<CommandHandler>) -> bool {
        if !self.event_ids.contains(event_id) {
            tracing::warn!(
                event_id,
                command = self.name(),
                "registering handler for unknown command path"
            );
        }
        self.handlers.register(event_id, handler)
    }

    /// Register an async closure for the node at `event_id`.
    pub fn on<H>(&self, event_id: &str, handler: H) -> bool
    where
        H: Handler<Invocation, ()> + 'static,
    {
        self.register(event_id, Arc::new(handler))
    }

    /// Run the handler registered for `event_id`.
    ///
    /// Returns `Ok(None)`, after logging at error severity, when nothing is
    /// registered. Handler errors are returned unchanged.
    pub async fn emit(&self, event_id: &str, invocation: Invocation) -> Result<Option<()>> {
        let outcome = self.handlers.emit(event_id, invocation).await?;
        if outcome.is_none() {
            DISPATCH_UNHANDLED.click();
            tracing::error!(event_id, "No handler for command option '{event_id}'");
        }
        Ok(outcome)
    }

    /// Rendered help for the node at `path`, or the closest ancestor that exists.
    pub fn help(&self, path: &CommandPath) -> String {
        let mut root = self.command.clone().bin_name(self.name().to_string());
        root.build();
        let mut cmd = &root;
        for name in path.names().iter().skip(1) {
            match cmd.find_subcommand(name) {
                Some(child) => cmd = child,
                None => break,
            }
        }
        cmd.clone().render_help().to_string()
    }

    fn version_text(&self) -> String {
        format!(
            "{}, version {}",
            self.name(),
            self.command.get_version().unwrap_or_default()
        )
    }

    /// Decide what `args` should do, without doing it.
    ///
    /// Call inside [`context::scope`] so that error context is tracked for
    /// this dispatch only; [`SlashCommand::dispatch`] does so.
    pub fn resolve(&self, args: &[String]) -> Resolution {
        let root = CommandPath::root(self.name());
        context::enter(root.clone());
        let argv = std::iter::once(self.name().to_string()).chain(args.iter().cloned());
        match self.command.clone().try_get_matches_from(argv) {
            Ok(matches) => self.resolve_matches(root, matches),
            Err(err) => self.resolve_error(args, err),
        }
    }

    fn resolve_matches(&self, mut path: CommandPath, mut matches: ArgMatches) -> Resolution {
        let mut cmd = &self.command;
        while let Some((name, sub_matches)) = matches.remove_subcommand() {
            let Some(child) = cmd.find_subcommand(&name) else {
                break;
            };
            cmd = child;
            path = path.child(name);
            context::enter(path.clone());
            matches = sub_matches;
        }
        if cmd.has_subcommands() {
            Resolution::GroupDefault { path, matches }
        } else {
            Resolution::Leaf { path, matches }
        }
    }

    fn resolve_error(&self, args: &[String], err: clap::Error) -> Resolution {
        self.locate(args);
        let kind = match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                return Resolution::Help {
                    text: err.render().to_string(),
                };
            }
            ErrorKind::DisplayVersion => {
                return Resolution::Exit {
                    text: self.version_text(),
                };
            }
            ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::TooFewValues => UsageErrorKind::MissingParameter,
            ErrorKind::UnknownArgument
            | ErrorKind::InvalidSubcommand
            | ErrorKind::InvalidValue
            | ErrorKind::ValueValidation
            | ErrorKind::NoEquals
            | ErrorKind::TooManyValues
            | ErrorKind::WrongNumberOfValues => UsageErrorKind::BadOption,
            _ => UsageErrorKind::Usage,
        };
        let context = self.usage_context(&err);
        let help = self.help(&context);
        Resolution::Error(UsageError {
            kind,
            message: error_message(&err),
            context,
            help,
        })
    }

    /// The command a usage error is reported against: the one clap names in
    /// `err`, else the current parse context, else the root.
    fn usage_context(&self, err: &clap::Error) -> CommandPath {
        self.error_context(err)
            .or_else(context::current)
            .unwrap_or_else(|| CommandPath::root(self.name()))
    }

    /// The failing command named by the usage line clap attached to `err`.
    fn error_context(&self, err: &clap::Error) -> Option<CommandPath> {
        let Some(ContextValue::StyledStr(usage)) = err.get(ContextKind::Usage) else {
            return None;
        };
        let usage = usage.to_string();
        let line = usage.lines().next()?.trim();
        let line = line.strip_prefix("Usage:").unwrap_or(line);
        let mut tokens = line.split_whitespace();
        if tokens.next()? != self.name() {
            return None;
        }
        let mut path = CommandPath::root(self.name());
        let mut cmd = &self.command;
        for token in tokens {
            match cmd.find_subcommand(token) {
                Some(child) => {
                    path = path.child(child.get_name());
                    cmd = child;
                }
                None => break,
            }
        }
        Some(path)
    }

    /// Walk the subcommand names in `args`, recording progress as the
    /// current parse context.
    fn locate(&self, args: &[String]) {
        let mut path = CommandPath::root(self.name());
        let mut cmd = &self.command;
        for arg in args {
            if arg == "--" || !cmd.has_subcommands() {
                break;
            }
            if arg.starts_with('-') {
                continue;
            }
            if let Some(child) = cmd.find_subcommand(arg) {
                path = path.child(child.get_name());
                cmd = child;
                context::enter(path.clone());
            }
        }
    }

    /// Resolve the request's command text and act on it.
    ///
    /// Usage errors, help and version requests are answered in the request's
    /// channel and never returned as errors. Errors from a handler, or from
    /// sending the reply, are returned to the caller.
    pub async fn dispatch(&self, rqst: Request) -> Result<Dispatch> {
        DISPATCHES.click();
        let args = tokenize(rqst.text());
        let resolution = context::scope(|| self.resolve(&args));
        match resolution {
            Resolution::Leaf { path, matches } => {
                let event_id = path.event_id();
                tracing::debug!(event_id = %event_id, "dispatching command");
                let invocation = Invocation {
                    rqst,
                    path,
                    event_id: event_id.clone(),
                    args,
                    matches,
                };
                Ok(self.finish(self.emit(&event_id, invocation).await?))
            }
            Resolution::GroupDefault { path, matches } => {
                let event_id = path.event_id();
                if !self.handlers.contains(&event_id) {
                    tracing::debug!(
                        event_id = %event_id,
                        "group invoked without subcommand and has no handler"
                    );
                    return Ok(Dispatch::Noop);
                }
                let invocation = Invocation {
                    rqst,
                    path,
                    event_id: event_id.clone(),
                    args,
                    matches,
                };
                Ok(self.finish(self.handlers.emit(&event_id, invocation).await?))
            }
            Resolution::Help { text } => {
                DISPATCH_HELP.click();
                Response::new(&rqst)
                    .send(None, help::help_message(&text))
                    .await?;
                Ok(Dispatch::HelpSent)
            }
            Resolution::Exit { text } => {
                Response::new(&rqst)
                    .send(None, help::version_message(&text))
                    .await?;
                Ok(Dispatch::Exited)
            }
            Resolution::Error(err) => {
                DISPATCH_USAGE_ERRORS.click();
                tracing::debug!(
                    kind = ?err.kind,
                    context = %err.context,
                    message = %err.message,
                    "command line rejected"
                );
                let message = help::usage_message(&rqst, Some(&err.message), &err.help);
                Response::new(&rqst).send(None, message).await?;
                Ok(Dispatch::HelpSent)
            }
        }
    }

    fn finish(&self, outcome: Option<()>) -> Dispatch {
        match outcome {
            Some(()) => {
                DISPATCH_HANDLER_RUNS.click();
                Dispatch::HandlerRun
            }
            None => Dispatch::Noop,
        }
    }
}

fn collect_event_ids(
    cmd: &Command,
    path: CommandPath,
    seen: &mut HashSet<String>,
) -> Result<()> {
    if cmd.get_name().contains(context::SEPARATOR) {
        return Err(Error::validation(
            format!("command name {:?} contains the path separator", cmd.get_name()),
            Some(path.event_id()),
        ));
    }
    for child in cmd.get_subcommands() {
        collect_event_ids(child, path.child(child.get_name()), seen)?;
    }
    let event_id = path.event_id();
    if !seen.insert(event_id.clone()) {
        return Err(Error::validation(
            format!("two commands share the event path {event_id}"),
            Some(event_id),
        ));
    }
    Ok(())
}

/// The parser's message without the `error:` prefix, usage or tips.
fn error_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.split("\n\n").next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

/// Split command text into arguments the way a shell would.
///
/// Typographic quotes, which chat clients like to substitute, count as plain
/// quotes. Text with unbalanced quotes falls back to splitting on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    let text: String = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .collect();
    shlex::split(&text).unwrap_or_else(|| text.split_whitespace().map(String::from).collect())
}
