use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("slashkit.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("slashkit.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("slashkit.client.request_duration_seconds");
pub(crate) static RESPONSE_URL_POSTS: Counter = Counter::new("slashkit.client.response_url_posts");
pub(crate) static RESPONSE_URL_FAILURES: Counter =
    Counter::new("slashkit.client.response_url_failures");

pub(crate) static DISPATCHES: Counter = Counter::new("slashkit.cli.dispatches");
pub(crate) static DISPATCH_HANDLER_RUNS: Counter = Counter::new("slashkit.cli.handler_runs");
pub(crate) static DISPATCH_HELP: Counter = Counter::new("slashkit.cli.help");
pub(crate) static DISPATCH_USAGE_ERRORS: Counter = Counter::new("slashkit.cli.usage_errors");
pub(crate) static DISPATCH_UNHANDLED: Counter = Counter::new("slashkit.cli.unhandled");

pub(crate) static VIEW_CALLBACKS: Counter = Counter::new("slashkit.modal.callbacks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&RESPONSE_URL_POSTS);
    collector.register_counter(&RESPONSE_URL_FAILURES);

    collector.register_counter(&DISPATCHES);
    collector.register_counter(&DISPATCH_HANDLER_RUNS);
    collector.register_counter(&DISPATCH_HELP);
    collector.register_counter(&DISPATCH_USAGE_ERRORS);
    collector.register_counter(&DISPATCH_UNHANDLED);

    collector.register_counter(&VIEW_CALLBACKS);
}
