//! HTTP client for the tagging endpoints.
//!
//! The server answers every tag mutation with a JSON envelope carrying a
//! `success` flag, also on non-2xx statuses (a permission failure is a 403
//! with a body). The client therefore decodes the body regardless of the
//! status code and turns `success: false` into [`ApiError::Rejected`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::session::SaveRequest;
use crate::tags::{PhotoId, TagId, UserId};

pub const CSRF_HEADER: &str = "X-CSRFToken";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("rejected by the server: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String> },
    #[error("malformed server response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Malformed(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct CreateTagBody<'a> {
    user_id: UserId,
    shape: &'a str,
    coords: &'a str,
}

#[derive(Deserialize)]
struct CreateTagResponse {
    success: bool,
    #[serde(default)]
    tag_id: Option<TagId>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct DeleteTagResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

pub struct TagApi {
    client: reqwest::blocking::Client,
    base_url: String,
    csrf_token: String,
}

impl TagApi {
    pub fn new(server: &str, csrf_token: &str) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ApiError::Network(format!("could not build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: server.trim_end_matches('/').to_owned(),
            csrf_token: csrf_token.to_owned(),
        })
    }

    /// `POST /photos/{photo_id}/tag`. Returns the id the server assigned.
    pub fn create_tag(&self, photo_id: PhotoId, request: &SaveRequest) -> Result<TagId, ApiError> {
        let url = format!("{}/photos/{}/tag", self.base_url, photo_id);
        debug!(%url, user_id = request.user_id, coords = %request.coords, "creating tag");
        let body = CreateTagBody {
            user_id: request.user_id,
            shape: &request.shape,
            coords: &request.coords,
        };
        let response = self
            .client
            .post(&url)
            .header(CSRF_HEADER, &self.csrf_token)
            .json(&body)
            .send()?;
        let parsed: CreateTagResponse = response.json()?;
        if !parsed.success {
            return Err(ApiError::Rejected {
                message: parsed.message,
            });
        }
        parsed
            .tag_id
            .ok_or_else(|| ApiError::Malformed("success reply without a tag_id".to_owned()))
    }

    /// `DELETE /photos/{photo_id}/tag/{tag_id}`.
    pub fn delete_tag(&self, photo_id: PhotoId, tag_id: TagId) -> Result<(), ApiError> {
        let url = format!("{}/photos/{}/tag/{}", self.base_url, photo_id, tag_id);
        debug!(%url, "deleting tag");
        let response = self
            .client
            .delete(&url)
            .header(CSRF_HEADER, &self.csrf_token)
            .send()?;
        let parsed: DeleteTagResponse = response.json()?;
        if !parsed.success {
            return Err(ApiError::Rejected {
                message: parsed.message,
            });
        }
        Ok(())
    }

    /// Downloads the photo bytes when the page context names an URL instead
    /// of a local file.
    pub fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        debug!(%url, "downloading photo");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Network(format!(
                "photo download failed with status {status}"
            )));
        }
        Ok(response.bytes()?.to_vec())
    }

    /// The profile page a tag marker links to.
    pub fn profile_url(&self, user_id: UserId) -> String {
        format!("{}/profile/{}", self.base_url, user_id)
    }
}
