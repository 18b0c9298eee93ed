use crate::http_client::{blocking_client, handle_http_response};
use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};
use log::debug;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::{
    Method,
    blocking::{Client, RequestBuilder},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Emoji the server falls back to when a status is saved without one
pub const DEFAULT_STATUS_EMOJI: &str = "speech_balloon";
/// Maximum number of characters the server keeps of a status text
pub const STATUS_TEXT_MAX_CHARS: usize = 100;

// Unix timestamp of 0001-01-01T00:00:00Z, the server's "no expiry" value
const ZERO_TIME_TIMESTAMP: i64 = -62_135_596_800;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusDuration {
    #[default]
    #[serde(rename = "")]
    Unset,
    ThirtyMinutes,
    OneHour,
    FourHours,
    Today,
    ThisWeek,
    DateAndTime,
    #[serde(other)]
    Unknown,
}

/// Custom status of a chat account
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CustomStatus {
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub duration: StatusDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CustomStatus {
    /// Expiry of the status, `None` if unset or the zero time
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .filter(|expires_at| expires_at.timestamp() != ZERO_TIME_TIMESTAMP)
    }

    /// Whether duration and expiry describe a status that is still in effect at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.duration {
            StatusDuration::Unset => self.expiry().is_none_or(|expiry| expiry >= now),
            StatusDuration::Unknown => false,
            _ => self.expiry().is_some_and(|expiry| expiry >= now),
        }
    }

    /// Apply the normalization the server performs before storing a status
    pub fn prepare_for_save(&mut self) {
        if self.emoji.is_empty() {
            self.emoji = DEFAULT_STATUS_EMOJI.to_string();
        }

        if let Some((idx, _)) = self.text.char_indices().nth(STATUS_TEXT_MAX_CHARS) {
            self.text.truncate(idx);
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
}

impl User {
    const CUSTOM_STATUS_PROP: &str = "customStatus";

    /// Custom status stored in the user props, `None` if missing or unreadable
    pub fn custom_status(&self) -> Option<CustomStatus> {
        let raw = self.props.get(Self::CUSTOM_STATUS_PROP)?.as_str()?;
        if raw.is_empty() {
            return None;
        }

        serde_json::from_str(raw)
            .inspect_err(|e| debug!("ignoring unreadable custom status {raw:?}: {e}"))
            .ok()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Channel {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Post {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub channel_id: String,
    pub message: String,
}

#[derive(Serialize)]
struct Login<'a> {
    login_id: &'a str,
    password: &'a str,
}

#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait ChatClient {
    fn set_auth_token(&mut self, token: &str);
    fn auth_token(&self) -> Option<String>;
    fn user_by_username(&self, username: &str) -> Result<User>;
    fn login(&mut self, login_id: &str, password: &str) -> Result<User>;
    fn update_custom_status(&self, user_id: &str, status: &CustomStatus) -> Result<()>;
    fn create_direct_channel(&self, user_id: &str, other_user_id: &str) -> Result<Channel>;
    fn create_post(&self, post: &Post) -> Result<Post>;
}

/// Blocking client for the Mattermost v4 REST API
pub struct MattermostClient {
    client: Client,
    server_url: String,
    auth_token: Option<String>,
}

impl MattermostClient {
    const API_PATH: &str = "/api/v4";

    // API endpoint constants
    const USER_BY_USERNAME_ENDPOINT: &str = "/users/username";
    const LOGIN_ENDPOINT: &str = "/users/login";
    const USERS_ENDPOINT: &str = "/users";
    const DIRECT_CHANNEL_ENDPOINT: &str = "/channels/direct";
    const POSTS_ENDPOINT: &str = "/posts";

    const TOKEN_HEADER: &str = "Token";

    pub fn new(server_url: &str) -> Result<Self> {
        Ok(MattermostClient {
            client: blocking_client()?,
            server_url: server_url.trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    fn build_url(&self, path: &str) -> Result<String> {
        ensure!(
            !self.server_url.is_empty(),
            "failed to build request url: missing server url"
        );

        // Normalize path to always start with a single "/"
        let normalized_path = path.trim_start_matches('/');
        Ok(format!(
            "{}{}/{normalized_path}",
            self.server_url,
            Self::API_PATH
        ))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);

        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET request to the chat API
    fn get(&self, path: &str) -> Result<String> {
        let url = self.build_url(path)?;
        debug!("GET {url}");

        let res = self
            .request(Method::GET, &url)
            .send()
            .context(format!("failed to send GET request to {url}"))?;

        handle_http_response(res, &format!("GET {url}"))
    }

    /// Request to the chat API with JSON body
    fn send_json(&self, method: Method, path: &str, body: &impl Serialize) -> Result<String> {
        let url = self.build_url(path)?;
        debug!("{method} {url}");

        let res = self
            .request(method.clone(), &url)
            .json(body)
            .send()
            .context(format!("failed to send {method} request to {url}"))?;

        handle_http_response(res, &format!("{method} {url}"))
    }
}

impl ChatClient for MattermostClient {
    fn set_auth_token(&mut self, token: &str) {
        self.auth_token = Some(token.to_string());
    }

    fn auth_token(&self) -> Option<String> {
        self.auth_token.clone()
    }

    fn user_by_username(&self, username: &str) -> Result<User> {
        let body = self.get(&format!("{}/{username}", Self::USER_BY_USERNAME_ENDPOINT))?;
        serde_json::from_str(&body).context("failed to parse user")
    }

    fn login(&mut self, login_id: &str, password: &str) -> Result<User> {
        let url = self.build_url(Self::LOGIN_ENDPOINT)?;
        debug!("POST {url}");

        let res = self
            .client
            .post(&url)
            .json(&Login { login_id, password })
            .send()
            .context(format!("failed to send POST request to {url}"))?;

        let token = res
            .headers()
            .get(Self::TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = handle_http_response(res, &format!("POST {url}"))?;

        let Some(token) = token else {
            anyhow::bail!("failed to login: response carries no session token");
        };
        self.auth_token = Some(token);

        serde_json::from_str(&body).context("failed to parse user")
    }

    fn update_custom_status(&self, user_id: &str, status: &CustomStatus) -> Result<()> {
        self.send_json(
            Method::PUT,
            &format!("{}/{user_id}/status/custom", Self::USERS_ENDPOINT),
            status,
        )?;
        Ok(())
    }

    fn create_direct_channel(&self, user_id: &str, other_user_id: &str) -> Result<Channel> {
        let body = self.send_json(
            Method::POST,
            Self::DIRECT_CHANNEL_ENDPOINT,
            &[user_id, other_user_id],
        )?;
        serde_json::from_str(&body).context("failed to parse channel")
    }

    fn create_post(&self, post: &Post) -> Result<Post> {
        let body = self.send_json(Method::POST, Self::POSTS_ENDPOINT, post)?;
        serde_json::from_str(&body).context("failed to parse post")
    }
}
