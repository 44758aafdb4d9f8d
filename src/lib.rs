// Public modules
pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod emitter;
pub mod error;
pub mod messenger;
pub mod modal;
pub mod request;
pub mod response;
pub mod utils;
pub mod view;

mod observability;

// Re-exports
pub use app::{Interactivity, SlackApp, ViewHandler};
pub use cli::{Dispatch, Invocation, Resolution, SlashCommand, UsageError, UsageErrorKind};
pub use client::SlackClient;
pub use config::{AppArgs, AppConfig};
pub use emitter::{EventRegistry, Handler};
pub use error::{Error, Result};
pub use messenger::Messenger;
pub use modal::{Modal, ModalMode, ModalResult};
pub use observability::register_biometrics;
pub use request::{Request, RequestType};
pub use response::Response;
pub use utils::text::TextBlockWrapper;
pub use view::View;
