//! Twitch Helix client.
//!
//! Two calls are needed: a client-credentials token exchange and the
//! most recent video of a broadcaster.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;

use vodwatch_common::config::AppConfig;
use vodwatch_common::error::AppError;
use vodwatch_common::types::Video;

/// Upstream video API used by the stream-end policy.
#[automock]
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// Exchange the application credentials for an app access token.
    async fn app_access_token(&self) -> Result<String, AppError>;

    /// Most recent video of `user_id`, if the broadcaster has any.
    async fn latest_video(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Video>, AppError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    data: Vec<Video>,
}

/// Helix implementation of [`TwitchApi`] backed by `reqwest`.
pub struct HelixClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    api_url: String,
}

impl HelixClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        auth_url: String,
        api_url: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::http)?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            auth_url,
            api_url,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.twitch_auth_url.clone(),
            config.twitch_api_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn videos_url(&self) -> String {
        format!("{}/videos", self.api_url)
    }
}

#[async_trait]
impl TwitchApi for HelixClient {
    async fn app_access_token(&self) -> Result<String, AppError> {
        let response = self
            .client
            .post(&self.auth_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(AppError::http)?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "token exchange returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("token response: {}", e.without_url())))?;

        tracing::debug!(expires_in = ?token.expires_in, "Obtained Twitch app access token");
        Ok(token.access_token)
    }

    async fn latest_video(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Video>, AppError> {
        let response = self
            .client
            .get(self.videos_url())
            .query(&[("user_id", user_id), ("first", "1"), ("sort", "time")])
            .header("Client-ID", &self.client_id)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(AppError::http)?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "video lookup returned {}",
                response.status()
            )));
        }

        let videos: VideosResponse = response
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("videos response: {}", e.without_url())))?;

        Ok(videos.data.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_videos_response_first_entry() {
        let body = serde_json::json!({
            "data": [{
                "id": "335921245",
                "stream_id": null,
                "user_id": "141981764",
                "user_login": "twitchdev",
                "user_name": "TwitchDev",
                "title": "Twitch Developers 101",
                "description": "",
                "created_at": "2018-11-14T21:30:18Z",
                "url": "https://www.twitch.tv/videos/335921245",
                "type": "upload",
                "duration": "3m21s"
            }],
            "pagination": {}
        });
        let videos: VideosResponse = serde_json::from_value(body).unwrap();
        let video = videos.data.into_iter().next().unwrap();
        assert_eq!(video.id, "335921245");
        assert_eq!(video.user_name, "TwitchDev");
        assert_eq!(video.game_name, None);
    }

    #[test]
    fn test_empty_videos_response() {
        let videos: VideosResponse =
            serde_json::from_value(serde_json::json!({"data": [], "pagination": {}})).unwrap();
        assert!(videos.data.is_empty());

        let videos: VideosResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(videos.data.is_empty());
    }

    #[test]
    fn test_token_response() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "jostpf5q0uzmxmkba9iyug38kjtgh",
            "expires_in": 5011271,
            "token_type": "bearer"
        }))
        .unwrap();
        assert_eq!(token.access_token, "jostpf5q0uzmxmkba9iyug38kjtgh");
        assert_eq!(token.expires_in, Some(5011271));
    }

    #[test]
    fn test_videos_url() {
        let client = HelixClient::new(
            "id".to_string(),
            "secret".to_string(),
            "https://id.twitch.tv/oauth2/token".to_string(),
            "https://api.twitch.tv/helix".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.videos_url(), "https://api.twitch.tv/helix/videos");
    }
}
