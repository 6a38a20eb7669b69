/// Bluesky (AT Protocol) publishing client
///
/// Posts the rendered report as a single text post. Two XRPC calls per
/// publish: `com.atproto.server.createSession` to trade the handle and app
/// password for an access token, then `com.atproto.repo.createRecord` to
/// write an `app.bsky.feed.post` record into the account's repo.
///
/// API Documentation: https://docs.bsky.app/docs/advanced-guides/posts

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{BlueskyConfig, Credentials};
use crate::logging::{self, DataSource};
use crate::model::PublishError;
use crate::publish::{PostRef, Publisher};

/// Bluesky's limit on post length, in graphemes. Counted here in chars,
/// which is never fewer than graphemes.
pub const MAX_POST_CHARS: usize = 300;

const POST_COLLECTION: &str = "app.bsky.feed.post";

// ============================================================================
// XRPC Request/Response Structures
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: PostRecord<'a>,
}

#[derive(Debug, Serialize)]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    text: &'a str,
    langs: [&'a str; 1],
    #[serde(rename = "createdAt")]
    created_at: String,
}

/// Error body returned by XRPC endpoints.
#[derive(Debug, Deserialize)]
struct XrpcError {
    error: String,
    message: Option<String>,
}

impl XrpcError {
    fn describe(&self) -> String {
        match &self.message {
            Some(m) => format!("{}: {}", self.error, m),
            None => self.error.clone(),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Rejects text the service would refuse, before any network call.
pub fn check_post_length(text: &str) -> Result<(), PublishError> {
    let chars = text.chars().count();
    if chars > MAX_POST_CHARS {
        return Err(PublishError::PostTooLong {
            chars,
            limit: MAX_POST_CHARS,
        });
    }
    Ok(())
}

// ============================================================================
// Client
// ============================================================================

pub struct BlueskyPublisher {
    client: reqwest::blocking::Client,
    service: String,
    /// Read from the environment at publish time when `None`.
    credentials: Option<Credentials>,
}

impl BlueskyPublisher {
    pub fn new(config: &BlueskyConfig) -> Result<BlueskyPublisher, PublishError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(BlueskyPublisher {
            client,
            service: config.service.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service, method)
    }

    fn create_session(&self, credentials: &Credentials) -> Result<Session, PublishError> {
        let response = self
            .client
            .post(self.xrpc_url("com.atproto.server.createSession"))
            .json(&CreateSessionRequest {
                identifier: &credentials.handle,
                password: &credentials.password,
            })
            .send()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::BAD_REQUEST
        ) {
            let reason = response
                .json::<XrpcError>()
                .map(|e| e.describe())
                .unwrap_or_else(|_| status.to_string());
            return Err(PublishError::AuthError(reason));
        }
        if !status.is_success() {
            return Err(PublishError::HttpError(status.as_u16()));
        }

        response
            .json::<Session>()
            .map_err(|e| PublishError::ParseError(e.to_string()))
    }

    fn create_post(&self, session: &Session, text: &str) -> Result<PostRef, PublishError> {
        let request = CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: PostRecord {
                record_type: POST_COLLECTION,
                text,
                langs: ["de"],
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };

        let response = self
            .client
            .post(self.xrpc_url("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&request)
            .send()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::HttpError(response.status().as_u16()));
        }

        response
            .json::<PostRef>()
            .map_err(|e| PublishError::ParseError(e.to_string()))
    }
}

impl Publisher for BlueskyPublisher {
    fn publish(&self, text: &str) -> Result<PostRef, PublishError> {
        check_post_length(text)?;

        let credentials = match &self.credentials {
            Some(c) => c.clone(),
            None => Credentials::from_env()?,
        };

        let session = self.create_session(&credentials)?;
        logging::debug(
            DataSource::Bluesky,
            None,
            &format!("Session opened for {}", credentials.handle),
        );

        let post = self.create_post(&session, text)?;
        logging::info(DataSource::Bluesky, None, &format!("Post created: {}", post.uri));
        Ok(post)
    }
}

// ============================================================================
// Tests
// ============================================================================
