use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde_json::{Value, json};
use url::Url;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, RESPONSE_URL_FAILURES,
    RESPONSE_URL_POSTS,
};

/// Web API error codes that indicate a bad or missing token.
const AUTH_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "token_revoked",
    "token_expired",
    "account_inactive",
];

/// Client for the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackClient {
    token: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl SlackClient {
    /// Create a client for the given token against the default endpoint.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::from_config(&AppConfig::new(token))
    }

    /// Create a client from an app configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            token: config.token.clone(),
            client,
            base_url: config.api_url.clone(),
            timeout: config.timeout,
        })
    }

    /// The base URL Web API methods are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::authentication("token contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Convert a non-success HTTP response into our Error type.
    async fn process_error_response(method: &str, response: Response) -> Error {
        let status_code = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            format!("{method} failed")
        } else {
            format!("{method} failed: {body}")
        };
        match status_code {
            401 | 403 => Error::authentication(message),
            429 => Error::rate_limit(message, retry_after),
            _ => Error::status(status_code, message),
        }
    }

    /// Call a Web API method with a JSON body and return the JSON reply.
    ///
    /// Replies carrying `ok: false` become [`Error::Api`], or
    /// [`Error::Authentication`] when the token itself was rejected.
    pub async fn api_call(&self, method: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, method);
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.api_call_inner(method, &url, body).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            CLIENT_REQUEST_ERRORS.click();
        }
        result
    }

    async fn api_call_inner(&self, method: &str, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!(method, "calling web api");
        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(method, response).await);
        }

        let reply = response.json::<Value>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse {method} response: {}", e),
                Some(Box::new(e)),
            )
        })?;

        if reply.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(reply);
        }
        let code = reply
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        if AUTH_ERRORS.contains(&code.as_str()) {
            Err(Error::authentication(format!("{method} failed: {code}")))
        } else {
            Err(Error::api(method, code, reply))
        }
    }

    /// `chat.postMessage`
    pub async fn chat_post_message(&self, args: &Value) -> Result<Value> {
        self.api_call("chat.postMessage", args).await
    }

    /// `chat.postEphemeral`; `args` must carry a `user`.
    pub async fn chat_post_ephemeral(&self, args: &Value) -> Result<Value> {
        self.api_call("chat.postEphemeral", args).await
    }

    /// `chat.delete`
    pub async fn chat_delete(&self, channel: &str, ts: &str) -> Result<Value> {
        self.api_call("chat.delete", &json!({"channel": channel, "ts": ts}))
            .await
    }

    /// `views.open`
    pub async fn views_open(&self, trigger_id: &str, view: Value) -> Result<Value> {
        self.api_call("views.open", &json!({"trigger_id": trigger_id, "view": view}))
            .await
    }

    /// `views.update`; the hash is omitted when `None`.
    pub async fn views_update(
        &self,
        view: Value,
        view_id: &str,
        hash: Option<&str>,
    ) -> Result<Value> {
        let mut args = json!({"view": view, "view_id": view_id});
        if let Some(hash) = hash {
            args["hash"] = Value::from(hash);
        }
        self.api_call("views.update", &args).await
    }

    /// `views.push`
    pub async fn views_push(&self, trigger_id: &str, view: Value) -> Result<Value> {
        self.api_call("views.push", &json!({"trigger_id": trigger_id, "view": view}))
            .await
    }

    /// POST a JSON message to a response URL.
    ///
    /// Any status other than 200 is an [`Error::Delivery`] carrying the URL,
    /// status and body. The post is never retried.
    pub async fn post_response_url(&self, response_url: &str, body: &Value) -> Result<()> {
        let url = Url::parse(response_url)?;
        RESPONSE_URL_POSTS.click();
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                RESPONSE_URL_FAILURES.click();
                self.map_send_error(e)
            })?;

        let status_code = response.status().as_u16();
        if status_code != 200 {
            RESPONSE_URL_FAILURES.click();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::delivery(response_url, status_code, body));
        }
        Ok(())
    }
}
