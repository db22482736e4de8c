use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{
    CreateModerationLog, ModerationAction, ModerationLog, PostStatus, PostWithMedia, UpdatePost,
};
use crate::services::{EmailService, MediaService, ModerationLogService, PostService};

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub id: i64,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkOutcome {
    pub processed: Vec<i64>,
    pub failed: Vec<BulkFailure>,
}

/// Admin actions on posts. Each action is recorded in the moderation log.
pub struct ModerationService {
    posts: PostService,
    logs: ModerationLogService,
    email: EmailService,
    media: MediaService,
}

impl ModerationService {
    pub fn new(db: Database, email: EmailService, media: MediaService) -> Self {
        Self {
            posts: PostService::new(db.clone()),
            logs: ModerationLogService::new(db),
            email,
            media,
        }
    }

    /// Approve or deny a post and notify its author
    pub async fn decide(
        &self,
        admin: &CurrentUser,
        post_id: i64,
        decision: PostStatus,
        feedback: Option<String>,
    ) -> Result<PostWithMedia> {
        let action = match decision {
            PostStatus::Approved => ModerationAction::Approve,
            PostStatus::Denied => ModerationAction::Deny,
            PostStatus::Pending => {
                return Err(AppError::BadRequest(
                    "Action must be approve or deny".to_string(),
                ))
            }
        };
        let feedback = feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        let updated = self.posts.set_status(post_id, decision).await?;

        self.record(admin, post_id, action, feedback.clone()).await;

        match updated.post.author_email.as_deref() {
            Some(author_email) => {
                if let Err(e) = self
                    .email
                    .send_decision_email(
                        author_email,
                        decision,
                        Some(&updated.post.title),
                        feedback.as_deref(),
                    )
                    .await
                {
                    tracing::warn!(post_id, error = %e, "failed to send decision email");
                }
            }
            None => tracing::debug!(post_id, "post has no author email; skipping notification"),
        }

        Ok(updated)
    }

    pub async fn bulk_decide(
        &self,
        admin: &CurrentUser,
        ids: &[i64],
        decision: PostStatus,
        feedback: Option<String>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();

        for &id in ids {
            match self.decide(admin, id, decision, feedback.clone()).await {
                Ok(_) => outcome.processed.push(id),
                Err(e) => outcome.failed.push(BulkFailure {
                    id,
                    error: e.to_string(),
                }),
            }
        }

        tracing::info!(
            admin_id = admin.id,
            processed = outcome.processed.len(),
            failed = outcome.failed.len(),
            "bulk moderation finished"
        );

        outcome
    }

    pub async fn edit(
        &self,
        admin: &CurrentUser,
        post_id: i64,
        changes: UpdatePost,
    ) -> Result<PostWithMedia> {
        let updated = self.posts.update(post_id, changes).await?;
        self.record(admin, post_id, ModerationAction::Edit, None).await;
        Ok(updated)
    }

    pub async fn delete(&self, admin: &CurrentUser, post_id: i64) -> Result<()> {
        let keys = self.posts.delete(post_id).await?;
        self.media.discard(&keys).await;
        self.record(admin, post_id, ModerationAction::Delete, None).await;
        Ok(())
    }

    pub async fn history(&self, post_id: i64) -> Result<Vec<ModerationLog>> {
        self.posts.require(post_id).await?;
        self.logs.list_by_post(post_id).await
    }

    async fn record(
        &self,
        admin: &CurrentUser,
        post_id: i64,
        action: ModerationAction,
        feedback: Option<String>,
    ) {
        let entry = CreateModerationLog {
            admin_id: admin.id,
            post_id,
            action,
            feedback,
        };
        if let Err(e) = self.logs.log(entry).await {
            tracing::error!(post_id, action = action.as_str(), error = %e, "failed to record moderation action");
        }
    }
}
