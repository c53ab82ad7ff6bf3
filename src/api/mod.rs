//! Client for the hunt backend, consumed through a narrow trait so the
//! session controller can be tested against a scripted implementation.

pub mod error;
pub mod http;
pub mod models;

use futures::future::BoxFuture;

use crate::api::{
    error::ApiResult,
    models::{
        HintEntry, PlayerStateResponse, RegisterRequest, RegisterResponse, ResultsResponse,
        ScanRequest, ScanResponse,
    },
};

/// Abstraction over the backend RPC contract.
pub trait GameBackend: Send + Sync {
    /// Register a new player and obtain an identity.
    fn register(&self, request: RegisterRequest)
    -> BoxFuture<'static, ApiResult<RegisterResponse>>;
    /// Fetch the authoritative session snapshot for the credentialed player.
    fn player_state(&self) -> BoxFuture<'static, ApiResult<PlayerStateResponse>>;
    /// Fetch the ordered hints list, indexed by level.
    fn hints(&self) -> BoxFuture<'static, ApiResult<Vec<HintEntry>>>;
    /// Submit one scan attempt for validation.
    fn submit_scan(&self, request: ScanRequest) -> BoxFuture<'static, ApiResult<ScanResponse>>;
    /// Fetch the final leaderboard including the player's own standing.
    fn results(&self, player_id: &str) -> BoxFuture<'static, ApiResult<ResultsResponse>>;
}
