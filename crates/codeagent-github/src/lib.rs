//! GitHub REST client backing the bot's activity source, comment sink, and
//! pull request opener.

pub mod github_api_client;
pub mod github_models;
pub mod github_transport_helpers;

pub use github_api_client::{GithubApiClient, GithubApiClientConfig};
