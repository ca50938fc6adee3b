use crate::{CmsPublisher, CreatedPost, NewPost};
use autopost_core::clock::date_stamp;
use autopost_core::{ErrorExt, PermissionPolicy, PostStatus, PublishError, SLUG_MAX_LEN};
use chrono::NaiveDate;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub post: CreatedPost,
    /// Status the post was actually created with.
    pub status: PostStatus,
    pub downgraded: bool,
}

fn with_suffix(base: &str, suffix: &str) -> String {
    let budget = SLUG_MAX_LEN.saturating_sub(suffix.len());
    let mut head = base.to_string();
    if head.len() > budget {
        let mut cut = budget;
        while !head.is_char_boundary(cut) {
            cut -= 1;
        }
        head.truncate(cut);
        while head.ends_with('-') {
            head.pop();
        }
    }
    format!("{}{}", head, suffix)
}

/// Slugs tried in order: `base`, `base-YYYYMMDD`, `base-YYYYMMDD-2`, ...
pub fn slug_candidates(base: &str, date: NaiveDate, max_attempts: u32) -> Vec<String> {
    let stamp = date_stamp(date);
    (0..max_attempts)
        .map(|i| match i {
            0 => with_suffix(base, ""),
            1 => with_suffix(base, &format!("-{}", stamp)),
            n => with_suffix(base, &format!("-{}-{}", stamp, n)),
        })
        .collect()
}

/// First candidate slug not already used by a post.
pub async fn resolve_unique_slug<C: CmsPublisher + ?Sized>(
    cms: &C,
    base: &str,
    date: NaiveDate,
    max_attempts: u32,
) -> Result<String, PublishError> {
    for candidate in slug_candidates(base, date, max_attempts) {
        if !cms.slug_exists(&candidate).await? {
            if candidate != base {
                info!(base = %base, slug = %candidate, "Slug taken, using suffixed slug");
            }
            return Ok(candidate);
        }
    }
    Err(PublishError::SlugExhausted {
        slug: base.to_string(),
        attempts: max_attempts,
    })
}

/// Category ids for `names`. Names that are unknown, or whose lookup fails,
/// map to `default_id`.
pub async fn resolve_categories<C: CmsPublisher + ?Sized>(
    cms: &C,
    names: &[String],
    default_id: u64,
) -> Vec<u64> {
    let mut ids = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let id = match cms.find_category_id(name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(category = %name, default_id, "Category not found, using default");
                default_id
            }
            Err(e) => {
                e.log_warn();
                default_id
            }
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        ids.push(default_id);
    }
    ids
}

/// Create `post`. When the CMS refuses the requested status and the policy
/// allows it, the post is created once more as a draft.
pub async fn publish_with_policy<C: CmsPublisher + ?Sized>(
    cms: &C,
    mut post: NewPost,
    policy: PermissionPolicy,
) -> Result<PublishReceipt, PublishError> {
    match cms.create_post(&post).await {
        Ok(created) => Ok(PublishReceipt {
            post: created,
            status: post.status,
            downgraded: false,
        }),
        Err(PublishError::PermissionDenied { operation, status })
            if policy == PermissionPolicy::DowngradeToDraft && post.status != PostStatus::Draft =>
        {
            warn!(
                requested = %post.status,
                http_status = status,
                "CMS denied {}, retrying as draft",
                operation
            );
            post.status = PostStatus::Draft;
            let created = cms.create_post(&post).await?;
            Ok(PublishReceipt {
                post: created,
                status: PostStatus::Draft,
                downgraded: true,
            })
        }
        Err(e) => Err(e),
    }
}
