use super::catalog::CatalogService;
use super::moderation::{active_suspension, ensure_not_suspended};
use super::session::Actor;
use crate::domain::ports::{ModerationStoreRef, PostStoreRef};
use crate::domain::post::{Post, PostStatus};
use crate::domain::{ActivityId, PostId, UserId};
use crate::error::{AppError, Result};
use chrono::Utc;
use std::collections::HashMap;
use tracing::info;

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 100;

/// Community progress posts.
#[derive(Clone)]
pub struct FeedService {
    posts: PostStoreRef,
    moderation: ModerationStoreRef,
    catalog: CatalogService,
}

impl FeedService {
    pub fn new(posts: PostStoreRef, moderation: ModerationStoreRef, catalog: CatalogService) -> Self {
        Self {
            posts,
            moderation,
            catalog,
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        activity_id: ActivityId,
        content: &str,
        progress: Option<u8>,
    ) -> Result<Post> {
        let user_id = actor.require_user()?;
        ensure_not_suspended(&self.moderation, user_id).await?;
        self.catalog.find_approved(activity_id).await?;

        let post = Post::new(user_id, activity_id, content, progress)?;
        self.posts.store(post.clone()).await?;
        info!(post_id = %post.id, user_id = %user_id, "progress post created");
        Ok(post)
    }

    /// Newest visible posts, skipping authors who are currently suspended.
    pub async fn feed(&self, limit: Option<usize>) -> Result<Vec<Post>> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
        let now = Utc::now();

        let mut posts: Vec<Post> = self
            .posts
            .get_all()
            .await?
            .into_iter()
            .filter(Post::is_visible)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut suspended: HashMap<UserId, bool> = HashMap::new();
        let mut feed = Vec::with_capacity(limit);
        for post in posts {
            if feed.len() == limit {
                break;
            }
            let is_suspended = match suspended.get(&post.user_id) {
                Some(flag) => *flag,
                None => {
                    let flag = active_suspension(&self.moderation, post.user_id, now)
                        .await?
                        .is_some();
                    suspended.insert(post.user_id, flag);
                    flag
                }
            };
            if !is_suspended {
                feed.push(post);
            }
        }
        Ok(feed)
    }

    pub async fn by_user(&self, user_id: UserId) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .get_all()
            .await?
            .into_iter()
            .filter(|p| p.user_id == user_id && p.is_visible())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    pub async fn get(&self, post_id: PostId) -> Result<Post> {
        self.posts
            .get(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))
    }

    pub async fn remove(&self, post_id: PostId) -> Result<Post> {
        self.set_status(post_id, PostStatus::Removed).await
    }

    pub async fn restore(&self, post_id: PostId) -> Result<Post> {
        self.set_status(post_id, PostStatus::Visible).await
    }

    async fn set_status(&self, post_id: PostId, status: PostStatus) -> Result<Post> {
        let mut post = self.get(post_id).await?;
        post.status = status;
        self.posts.store(post.clone()).await?;
        Ok(post)
    }
}
