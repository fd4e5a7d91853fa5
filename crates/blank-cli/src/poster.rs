use async_trait::async_trait;

/// Outbound publication of finished posts. Returns the public URL when the
/// post went out.
#[async_trait]
pub trait SocialPoster: Send + Sync {
    async fn publish(&self, text: &str) -> Option<String>;
}

/// No external account is connected; posts are only marked locally.
pub struct LocalPoster;

#[async_trait]
impl SocialPoster for LocalPoster {
    async fn publish(&self, text: &str) -> Option<String> {
        tracing::info!(chars = text.chars().count(), "post recorded locally, no social account connected");
        None
    }
}
