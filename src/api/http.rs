//! Production [`GameBackend`] implementation over HTTP.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, header};
use serde::de::DeserializeOwned;

use crate::api::{
    GameBackend,
    error::{ApiError, ApiResult},
    models::{
        ErrorBody, HintEntry, PlayerStateResponse, RegisterRequest, RegisterResponse,
        ResultsResponse, ScanRequest, ScanResponse,
    },
};

/// HTTP client for the hunt backend.
///
/// The player identity travels as the `playerId` cookie the backend set at
/// registration; [`with_player`] attaches it to every subsequent request.
///
/// [`with_player`]: HttpGameBackend::with_player
#[derive(Clone)]
pub struct HttpGameBackend {
    client: Client,
    base_url: Arc<str>,
    player_id: Option<Arc<str>>,
}

impl HttpGameBackend {
    /// Build a client against the given base URL (no trailing slash needed).
    pub fn connect(base_url: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            player_id: None,
        })
    }

    /// Attach the player identity used for credentialed endpoints.
    pub fn with_player(mut self, player_id: &str) -> Self {
        self.player_id = Some(Arc::from(player_id));
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.player_id {
            Some(ref player_id) => {
                builder.header(header::COOKIE, format!("playerId={player_id}"))
            }
            None => builder,
        }
    }

    async fn execute<T>(&self, builder: reqwest::RequestBuilder, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            // Failure bodies are best-effort: a missing or malformed body
            // still classifies by status alone.
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            return Err(ApiError::Status {
                path: path.to_string(),
                status,
                detail: body.detail,
                error_kind: body.error_kind,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ApiError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }
}

impl GameBackend for HttpGameBackend {
    fn register(
        &self,
        request: RegisterRequest,
    ) -> BoxFuture<'static, ApiResult<RegisterResponse>> {
        let backend = self.clone();
        Box::pin(async move {
            const PATH: &str = "api/register";
            let builder = backend.request(Method::POST, PATH).json(&request);
            backend.execute(builder, PATH).await
        })
    }

    fn player_state(&self) -> BoxFuture<'static, ApiResult<PlayerStateResponse>> {
        let backend = self.clone();
        Box::pin(async move {
            const PATH: &str = "api/player-state";
            let builder = backend.request(Method::GET, PATH);
            backend.execute(builder, PATH).await
        })
    }

    fn hints(&self) -> BoxFuture<'static, ApiResult<Vec<HintEntry>>> {
        let backend = self.clone();
        Box::pin(async move {
            const PATH: &str = "api/hints";
            let builder = backend.request(Method::GET, PATH);
            backend.execute(builder, PATH).await
        })
    }

    fn submit_scan(&self, request: ScanRequest) -> BoxFuture<'static, ApiResult<ScanResponse>> {
        let backend = self.clone();
        Box::pin(async move {
            const PATH: &str = "api/scan";
            let builder = backend.request(Method::POST, PATH).json(&request);
            backend.execute(builder, PATH).await
        })
    }

    fn results(&self, player_id: &str) -> BoxFuture<'static, ApiResult<ResultsResponse>> {
        let backend = self.clone();
        let path = format!("api/results/{player_id}");
        Box::pin(async move {
            let builder = backend.request(Method::GET, &path);
            backend.execute(builder, &path).await
        })
    }
}
