//! Stream-end policy: decides whether a finished broadcast deserves an alert.
//!
//! When a `stream.offline` event arrives:
//! 1. Obtain an app access token
//! 2. Fetch the broadcaster's most recent video
//! 3. Match its title against the configured keywords (any keyword, case-insensitive)
//! 4. Optionally require the video's game to equal the target game

use vodwatch_common::config::AppConfig;
use vodwatch_common::error::AppError;
use vodwatch_common::types::{NotificationDecision, Video, VodAlert};

use crate::twitch::TwitchApi;

/// Immutable policy built once from configuration.
#[derive(Debug, Clone)]
pub struct StreamEndPolicy {
    streamer_id: String,
    /// Already lower-cased
    keywords: Vec<String>,
    target_game: Option<String>,
    require_game_match: bool,
    vod_base_url: String,
}

impl StreamEndPolicy {
    pub fn new(
        streamer_id: String,
        keywords: Vec<String>,
        target_game: Option<String>,
        require_game_match: bool,
        vod_base_url: String,
    ) -> Self {
        Self {
            streamer_id,
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            target_game,
            require_game_match,
            vod_base_url: vod_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.streamer_id.clone(),
            config.keywords.clone(),
            config.target_game.clone(),
            config.require_game_match,
            config.vod_base_url.clone(),
        )
    }

    /// Look up the latest video and decide.
    ///
    /// Token and lookup failures are returned unchanged; there is no retry.
    pub async fn evaluate(&self, api: &dyn TwitchApi) -> Result<NotificationDecision, AppError> {
        let token = api.app_access_token().await?;
        let video = api.latest_video(&token, &self.streamer_id).await?;

        let decision = self.decide(video.as_ref());
        match (&video, &decision) {
            (None, _) => tracing::info!(
                streamer_id = %self.streamer_id,
                "No videos found for streamer"
            ),
            (Some(video), NotificationDecision::Skip) => tracing::info!(
                video_id = %video.id,
                title = %video.title,
                game = ?video.game_name,
                "Latest video does not match the policy"
            ),
            (Some(video), NotificationDecision::Notify(_)) => tracing::info!(
                video_id = %video.id,
                title = %video.title,
                "Latest video matches the policy"
            ),
        }

        Ok(decision)
    }

    /// Pure decision over an optional latest video.
    pub fn decide(&self, video: Option<&Video>) -> NotificationDecision {
        let Some(video) = video else {
            return NotificationDecision::Skip;
        };

        if !self.title_matches(&video.title) {
            return NotificationDecision::Skip;
        }
        if self.require_game_match && !self.game_matches(video.game_name.as_deref()) {
            return NotificationDecision::Skip;
        }

        NotificationDecision::Notify(VodAlert {
            title: video.title.clone(),
            streamer_name: video.user_name.clone(),
            vod_url: self.vod_url(&video.id),
        })
    }

    /// True if ANY keyword occurs in the title, ignoring case.
    pub fn title_matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| title.contains(keyword.as_str()))
    }

    fn game_matches(&self, game_name: Option<&str>) -> bool {
        match (self.target_game.as_deref(), game_name) {
            (Some(target), Some(game)) => target == game,
            _ => false,
        }
    }

    /// Canonical watch URL for a video id.
    pub fn vod_url(&self, video_id: &str) -> String {
        format!("{}/videos/{}", self.vod_base_url, video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitch::MockTwitchApi;

    fn policy(keywords: &[&str], target_game: Option<&str>, require_game_match: bool) -> StreamEndPolicy {
        StreamEndPolicy::new(
            "141981764".to_string(),
            keywords.iter().map(|k| k.to_string()).collect(),
            target_game.map(str::to_string),
            require_game_match,
            "https://twitch.tv".to_string(),
        )
    }

    fn video(id: &str, title: &str, game: Option<&str>) -> Video {
        Video {
            id: id.to_string(),
            title: title.to_string(),
            user_name: "TwitchDev".to_string(),
            game_name: game.map(str::to_string),
        }
    }

    #[test]
    fn test_keyword_match_case_insensitive() {
        let p = policy(&["giveaway"], None, false);
        let decision = p.decide(Some(&video("12345", "Big GIVEAWAY today", None)));
        assert_eq!(
            decision,
            NotificationDecision::Notify(VodAlert {
                title: "Big GIVEAWAY today".to_string(),
                streamer_name: "TwitchDev".to_string(),
                vod_url: "https://twitch.tv/videos/12345".to_string(),
            })
        );
    }

    #[test]
    fn test_no_keyword_match() {
        let p = policy(&["giveaway"], None, false);
        assert_eq!(
            p.decide(Some(&video("12345", "Just chatting", None))),
            NotificationDecision::Skip
        );
    }

    #[test]
    fn test_any_keyword_is_enough() {
        let p = policy(&["giveaway", "speedrun"], None, false);
        assert!(p.decide(Some(&video("1", "Any% SPEEDRUN attempts", None))).should_notify());
    }

    #[test]
    fn test_keywords_lowercased_on_construction() {
        let p = policy(&["GiveAway"], None, false);
        assert!(p.title_matches("giveaway night"));
    }

    #[test]
    fn test_no_video_skips() {
        let p = policy(&["giveaway"], None, false);
        assert_eq!(p.decide(None), NotificationDecision::Skip);
    }

    #[test]
    fn test_empty_keywords_never_match() {
        let p = policy(&[], None, false);
        assert_eq!(
            p.decide(Some(&video("1", "Big giveaway", None))),
            NotificationDecision::Skip
        );
    }

    #[test]
    fn test_game_ignored_without_flag() {
        let p = policy(&["giveaway"], Some("Minecraft"), false);
        assert!(p.decide(Some(&video("1", "giveaway", Some("Fortnite")))).should_notify());
    }

    #[test]
    fn test_game_required_with_flag() {
        let p = policy(&["giveaway"], Some("Minecraft"), true);
        assert!(p.decide(Some(&video("1", "giveaway", Some("Minecraft")))).should_notify());
        assert!(!p.decide(Some(&video("1", "giveaway", Some("Fortnite")))).should_notify());
        assert!(!p.decide(Some(&video("1", "giveaway", None))).should_notify());
    }

    #[test]
    fn test_game_match_still_needs_keyword() {
        let p = policy(&["giveaway"], Some("Minecraft"), true);
        assert!(!p.decide(Some(&video("1", "Just chatting", Some("Minecraft")))).should_notify());
    }

    #[test]
    fn test_vod_url_trailing_slash() {
        let p = StreamEndPolicy::new(
            "1".to_string(),
            vec![],
            None,
            false,
            "https://www.twitch.tv/".to_string(),
        );
        assert_eq!(p.vod_url("42"), "https://www.twitch.tv/videos/42");
    }

    // ============================================================
    // evaluate() against a mocked upstream
    // ============================================================

    #[tokio::test]
    async fn test_evaluate_queries_configured_streamer() {
        let mut api = MockTwitchApi::new();
        api.expect_app_access_token()
            .times(1)
            .returning(|| Ok("token-abc".to_string()));
        api.expect_latest_video()
            .withf(|token, user_id| token.to_string() == "token-abc" && user_id.to_string() == "141981764")
            .times(1)
            .returning(|_, _| Ok(Some(video("12345", "Big GIVEAWAY today", None))));

        let decision = policy(&["giveaway"], None, false)
            .evaluate(&api)
            .await
            .unwrap();
        assert_eq!(
            decision.alert().map(|a| a.vod_url.as_str()),
            Some("https://twitch.tv/videos/12345")
        );
    }

    #[tokio::test]
    async fn test_evaluate_token_failure_propagates() {
        let mut api = MockTwitchApi::new();
        api.expect_app_access_token()
            .returning(|| Err(AppError::Upstream("token exchange returned 401".to_string())));
        api.expect_latest_video().never();

        let result = policy(&["giveaway"], None, false).evaluate(&api).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_evaluate_lookup_failure_propagates() {
        let mut api = MockTwitchApi::new();
        api.expect_app_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_latest_video()
            .returning(|_, _| Err(AppError::Upstream("video lookup returned 500".to_string())));

        let result = policy(&["giveaway"], None, false).evaluate(&api).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_evaluate_no_videos() {
        let mut api = MockTwitchApi::new();
        api.expect_app_access_token()
            .returning(|| Ok("token".to_string()));
        api.expect_latest_video().returning(|_, _| Ok(None));

        let decision = policy(&["giveaway"], None, false)
            .evaluate(&api)
            .await
            .unwrap();
        assert_eq!(decision, NotificationDecision::Skip);
    }
}
