//! HTTP client for the notes backend.
//!
//! Every call attaches the stored bearer token, and every failure comes back
//! as a single [`ApiError`] shape whether the server answered with an error
//! status or never answered at all.

use crate::backend::NotesBackend;
use crate::config::ClientConfig;
use crate::session::SessionStore;
use async_trait::async_trait;
use deck_notes_core::{
    ApiError, Deck, Error, ExpandedSlide, LoginResponse, Result, SearchHit, Session, Slide,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

const USER_AGENT: &str = concat!("deck-notes/", env!("CARGO_PKG_VERSION"));

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response declared a JSON content type.
    Json(Value),
    /// Anything else, returned verbatim.
    Text(String),
}

impl ResponseBody {
    /// Deserialize a JSON body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => {
                serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
            }
            Self::Text(text) => Err(Error::Decode(format!(
                "expected JSON, got text: {}",
                message_short(&text)
            ))),
        }
    }
}

/// Body attached to a request.
#[derive(Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Form),
}

/// Query parameters and body for [`ApiClient::request`].
#[derive(Default)]
pub struct RequestOptions {
    query: Vec<(&'static str, String)>,
    body: RequestBody,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Send a JSON body.
    pub fn json(mut self, value: Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Send a multipart form.
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

/// HTTP client for the notes backend.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client using `session` for credentials.
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Issue a request and decode the response.
    ///
    /// JSON responses are parsed; any other content type is returned as
    /// text. Non-2xx statuses and transport failures become [`ApiError`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        let url = self.config.url(path);
        log::debug!("{} {}", method, url);

        let mut builder = self.http.request(method, &url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(token) = self.session.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder = match options.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(transport_message(&e)))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::transport(transport_message(&e)))?;

        if !status.is_success() {
            let err = ApiError::from_body(status.as_u16(), &text);
            log::debug!("{} failed: {}", path, err);
            return Err(err.into());
        }

        if !is_json {
            return Ok(ResponseBody::Text(text));
        }
        if text.trim().is_empty() {
            return Ok(ResponseBody::Json(Value::Null));
        }
        serde_json::from_str(&text).map(ResponseBody::Json).map_err(|e| {
            ApiError::new(
                status.as_u16(),
                format!("invalid JSON in response: {}", message_short(&e.to_string())),
            )
            .into()
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::GET, path, options).await?.into_json()
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(Method::POST, path, options).await?.into_json()
    }

    /// Backend liveness check; returns the reported status.
    pub async fn health(&self) -> Result<String> {
        let body: Value = self.get_json("/health", RequestOptions::new()).await?;
        Ok(body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// Log in and store the returned session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(Error::validation("username and password are required"));
        }

        let resp: LoginResponse = self
            .post_json(
                "/auth/login",
                RequestOptions::new().json(json!({ "username": username, "password": password })),
            )
            .await?;

        let name = if resp.username.is_empty() {
            username.to_string()
        } else {
            resp.username
        };
        self.session.set(&resp.token, &name);
        log::info!("Logged in as {}", name);
        Ok(Session::new(resp.token, name))
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, username: &str, password: &str, confirm: &str) -> Result<()> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(Error::validation("username and password are required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if password != confirm {
            return Err(Error::validation("passwords do not match"));
        }

        self.request(
            Method::POST,
            "/auth/register",
            RequestOptions::new().json(json!({ "username": username, "password": password })),
        )
        .await?;
        log::info!("Registered {}", username);
        Ok(())
    }

    /// Forget the stored session.
    pub fn logout(&self) {
        self.session.clear();
    }
}

#[async_trait]
impl NotesBackend for ApiClient {
    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<Deck> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        self.post_json("/upload", RequestOptions::new().multipart(form))
            .await
    }

    async fn upload_url(&self, url: &str) -> Result<Deck> {
        self.post_json("/upload_url", RequestOptions::new().json(json!({ "url": url })))
            .await
    }

    async fn list_slides(&self, ppt_id: &str) -> Result<Vec<Slide>> {
        self.get_json("/slides", RequestOptions::new().query("ppt_id", ppt_id))
            .await
    }

    async fn expand_slide(&self, ppt_id: &str, slide_index: u32) -> Result<ExpandedSlide> {
        self.get_json(
            "/expand",
            RequestOptions::new()
                .query("ppt_id", ppt_id)
                .query("slide_index", slide_index)
                .query("use_wikipedia", self.config.use_wikipedia),
        )
        .await
    }

    async fn search(&self, ppt_id: &str, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let body = self
            .request(
                Method::GET,
                "/search",
                RequestOptions::new()
                    .query("ppt_id", ppt_id)
                    .query("q", query)
                    .query("top_k", top_k),
            )
            .await?;
        match body {
            ResponseBody::Json(Value::Null) => Ok(Vec::new()),
            other => other.into_json(),
        }
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "request timed out".to_string();
    }
    if err.is_connect() {
        return format!("could not connect to backend: {}", message_short(&err.to_string()));
    }
    message_short(&err.to_string())
}

/// Single-line, length-capped version of a message.
fn message_short(s: &str) -> String {
    let single_line = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect::<String>();
    let trimmed = single_line.trim();
    if trimmed.chars().count() <= 200 {
        trimmed.to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
