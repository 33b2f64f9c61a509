//! REST binding of the job backend

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::retry::parse_retry_after;
use super::JobBackend;
use crate::chat::{Chat, CreateJobRequest, HistoryEntry, JobId, JobSnapshot};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

#[derive(Serialize)]
struct CreateChatBody<'a> {
    title: &'a str,
}

#[derive(Deserialize)]
struct JobCreated {
    job_id: JobId,
}

#[derive(Deserialize)]
struct ActiveJob {
    #[serde(default)]
    job_id: Option<JobId>,
}

/// HTTP client for the chat backend
pub struct HttpBackend {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    /// Create the HTTP client with the configured timeouts
    fn create_http_client(config: &ClientConfig) -> Client {
        Client::builder()
            .user_agent(crate::constants::http::USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client: {}. Using default client.", e);
                Client::new()
            })
    }

    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: Self::create_http_client(config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request with the bearer token when one is configured
    fn build_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Turn a non-success response into `ClientError::Api`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "API error response: {}", message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
            retry_after,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.build_request(Method::GET, path).send().await?;
        Self::decode(Self::check(response).await?).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.build_request(Method::POST, path).json(body).send().await?;
        Self::decode(Self::check(response).await?).await
    }
}

#[async_trait::async_trait]
impl JobBackend for HttpBackend {
    async fn create_chat(&self, title: &str) -> Result<Chat> {
        let chat: Chat = self.post("/v1/chats", &CreateChatBody { title }).await?;
        info!(chat_id = %chat.id, "Created chat");
        Ok(chat)
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.get("/v1/chats").await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobId> {
        let created: JobCreated = self.post("/v1/jobs", request).await?;
        info!(
            job_id = %created.job_id,
            chat_id = %request.conversation_id,
            agent_mode = request.agent_mode,
            "Created job"
        );
        Ok(created.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let snapshot: JobSnapshot = self.get(&format!("/v1/jobs/{job_id}/status")).await?;
        debug!(job_id, status = %snapshot.status, thoughts = snapshot.thoughts.len(), "Job status");
        Ok(snapshot)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        let response = self
            .build_request(Method::POST, &format!("/v1/jobs/{job_id}/cancel"))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
                info!(job_id, status = response.status().as_u16(), "Job already finished, nothing to cancel");
                Ok(())
            }
            _ => {
                Self::check(response).await?;
                info!(job_id, "Cancelled job");
                Ok(())
            }
        }
    }

    async fn active_job(&self, chat_id: &str) -> Result<Option<JobId>> {
        let active: ActiveJob = self.get(&format!("/v1/chats/{chat_id}/active_job")).await?;
        Ok(active.job_id.filter(|id| !id.is_empty()))
    }

    async fn chat_history(&self, chat_id: &str) -> Result<Vec<HistoryEntry>> {
        self.get(&format!("/v1/chats/{chat_id}")).await
    }
}
