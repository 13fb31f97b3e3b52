use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::citations::{CitationSet, ExternalMarkup};
use crate::controller::ExchangeRequest;
use crate::conversation::EmploymentType;
use crate::error::{AuthFailure, DispatchFailure};
use crate::session::SessionToken;

// ── Service contract ──────────────────────────────────────────────────────────

/// The remote answering service. Two calls: one token fetch at startup, one
/// chat exchange per dispatch.
#[async_trait]
pub trait AnsweringService: Send + Sync {
    async fn fetch_token(&self, key: &str) -> Result<SessionToken, AuthFailure>;

    async fn chat(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, DispatchFailure>;
}

/// A validated answer: text plus its (possibly empty) citation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse {
    pub text: String,
    pub citations: CitationSet,
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenReply {
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    session_id: &'a str,
    query: &'a str,
    park: &'a str,
    #[serde(rename = "employmentType", skip_serializing_if = "Option::is_none")]
    employment_type: Option<EmploymentType>,
}

impl<'a> From<&'a ExchangeRequest> for ChatBody<'a> {
    fn from(request: &'a ExchangeRequest) -> Self {
        Self {
            session_id: request.session_token.as_str(),
            query: &request.query_text,
            park: &request.park_label,
            employment_type: request.classification,
        }
    }
}

/// Anything beyond these fields (the backend also sends `fromBot`) is ignored.
#[derive(Debug, Deserialize)]
struct ChatReply {
    text: String,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    contents: Vec<String>,
}

impl ChatReply {
    /// The backend de-duplicates `sources` and `contents` independently, so
    /// two chunks of one document arrive as one label and two bodies. The
    /// answer is kept and only positionally paired citations survive.
    fn into_response(self) -> ExchangeResponse {
        if self.sources.len() != self.contents.len() {
            tracing::warn!(
                sources = self.sources.len(),
                contents = self.contents.len(),
                "citation lists differ in length; keeping paired entries only"
            );
        }
        let bodies = self.contents.into_iter().map(ExternalMarkup::new).collect();
        let citations = CitationSet::new(self.sources, bodies);
        ExchangeResponse { text: self.text, citations }
    }
}

// ── HTTP client ───────────────────────────────────────────────────────────────

pub struct HttpAnsweringService {
    http: reqwest::Client,
    endpoint: String,
    referer: Option<String>,
}

impl HttpAnsweringService {
    pub fn new(
        endpoint: impl Into<String>,
        referer: Option<String>,
        timeout: Option<std::time::Duration>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self::with_client(builder.build()?, endpoint, referer))
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>, referer: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            referer,
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Url, String> {
        let base = format!("{}/{}", self.endpoint.trim_end_matches('/'), path);
        reqwest::Url::parse_with_params(&base, params).map_err(|e| format!("invalid endpoint {base}: {e}"))
    }

    fn decorate(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.referer {
            Some(r) => req.header("Referer", r),
            None => req,
        }
    }
}

#[async_trait]
impl AnsweringService for HttpAnsweringService {
    async fn fetch_token(&self, key: &str) -> Result<SessionToken, AuthFailure> {
        let url = self.url("token", &[("key", key)]).map_err(AuthFailure::Transport)?;
        tracing::debug!(endpoint = %self.endpoint, "requesting session token");

        let resp = self
            .decorate(self.http.get(url))
            .send()
            .await
            .map_err(|e| AuthFailure::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthFailure::Status(resp.status().as_u16()));
        }

        let reply: TokenReply = resp
            .json()
            .await
            .map_err(|e| AuthFailure::MalformedBody(e.to_string()))?;

        match reply.token {
            Some(t) if !t.is_empty() => Ok(SessionToken::new(t)),
            _ => Err(AuthFailure::MalformedBody("missing token field".to_string())),
        }
    }

    async fn chat(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, DispatchFailure> {
        let url = self
            .url("chat", &[("token", request.session_token.as_str())])
            .map_err(DispatchFailure::Transport)?;
        tracing::debug!(seq = %request.seq, park = %request.park_label, "sending chat exchange");

        let resp = self
            .decorate(self.http.post(url))
            .json(&ChatBody::from(request))
            .send()
            .await
            .map_err(|e| DispatchFailure::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DispatchFailure::Status(resp.status().as_u16()));
        }

        let reply: ChatReply = resp
            .json()
            .await
            .map_err(|e| DispatchFailure::MalformedBody(e.to_string()))?;

        Ok(reply.into_response())
    }
}

// ── Scripted service for tests ────────────────────────────────────────────────
