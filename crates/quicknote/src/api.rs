use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use quicknote_core::wire::{
    CreateNoteRequest, CreateNoteResponse, ErrorResponse, NoteResponse, ViewResponse,
};
use reqwest::{Response, StatusCode};

/// Thin client over the note HTTP API. Only ciphertext and ids go over the
/// wire.
pub struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_owned(),
            client,
        })
    }

    pub async fn create_note(&self, req: &CreateNoteRequest) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/api/notes", self.base))
            .json(req)
            .send()
            .await
            .context("send create request")?;
        let resp = ensure_success(resp).await?;
        let body: CreateNoteResponse = resp.json().await.context("decode create response")?;
        Ok(body.id)
    }

    /// `None` when the note is unknown, expired or used up.
    pub async fn fetch_note(&self, id: &str) -> Result<Option<NoteResponse>> {
        let resp = self
            .client
            .get(format!("{}/api/notes/{id}", self.base))
            .send()
            .await
            .context("send fetch request")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        Ok(Some(resp.json().await.context("decode note")?))
    }

    /// Whether the server granted (and counted) this view.
    pub async fn confirm_view(&self, id: &str) -> Result<bool> {
        let resp = self
            .client
            .post(format!("{}/api/notes/{id}/views", self.base))
            .send()
            .await
            .context("send view confirmation")?;
        let resp = ensure_success(resp).await?;
        let body: ViewResponse = resp.json().await.context("decode view response")?;
        Ok(body.counted)
    }
}

async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<ErrorResponse>()
        .await
        .map(|e| e.error)
        .unwrap_or_else(|_| status.to_string());
    Err(anyhow!("server returned {status}: {message}"))
}
