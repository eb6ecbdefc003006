use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, Response};
use url::Url;

use crate::error::{ApiError, ConfigError};
use crate::models::{ActivitiesCollection, ApiReply};

/// The three calls the board makes against the activities server.
pub trait ActivityApi: Send + Sync + 'static {
    /// `GET /activities`
    fn fetch_activities(&self) -> impl Future<Output = Result<ActivitiesCollection, ApiError>> + Send;

    /// `POST /activities/{name}/signup?email=..`, resolves to the server message
    fn signup(&self, activity: &str, email: &str) -> impl Future<Output = Result<String, ApiError>> + Send;

    /// `DELETE /activities/{name}/unregister?email=..`, resolves to the server message
    fn unregister(&self, activity: &str, email: &str) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// reqwest-backed client for the activities server
#[derive(Debug, Clone)]
pub struct HttpActivityApi {
    client: Client,
    base: Url,
}

impl HttpActivityApi {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ConfigError> {
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                name: "ACTIVITIES_API_URL",
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base url
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn mutation_url(&self, activity: &str, action: &str, email: &str) -> Url {
        let mut url = self.endpoint(&["activities", activity, action]);
        url.query_pairs_mut().append_pair("email", email);
        url
    }

    async fn send_mutation(&self, method: Method, url: Url) -> Result<String, ApiError> {
        tracing::debug!(%method, %url, "sending mutation");
        let response = self.client.request(method, url).send().await?;
        read_reply(response).await
    }
}

/// Decodes a signup/unregister response.
/// The body is parsed before the status is looked at, so a non-JSON body
/// is a decode failure whatever the status.
async fn read_reply(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;
    let reply: ApiReply = serde_json::from_slice(&body)?;

    if status.is_success() {
        Ok(reply.message.unwrap_or_default())
    } else {
        Err(ApiError::Rejected {
            status: status.as_u16(),
            detail: reply.detail,
        })
    }
}

impl ActivityApi for HttpActivityApi {
    async fn fetch_activities(&self) -> Result<ActivitiesCollection, ApiError> {
        let url = self.endpoint(&["activities"]);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ApiReply>(&body)
                .ok()
                .and_then(|reply| reply.detail);
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        let url = self.mutation_url(activity, "signup", email);
        self.send_mutation(Method::POST, url).await
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        let url = self.mutation_url(activity, "unregister", email);
        self.send_mutation(Method::DELETE, url).await
    }
}
