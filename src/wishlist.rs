use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{add_to_wishlist, get_wishlist, remove_from_wishlist};
use crate::error::AppError;
use crate::identity::resolve_learner;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistToggle {
    pub added: bool,
    pub wishlist: Vec<String>,
}

/// Removes the course from the wishlist if present, adds it otherwise. The
/// course is not looked up.
#[instrument(skip(pool))]
pub async fn toggle_wishlist(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
) -> Result<WishlistToggle, AppError> {
    if course_id.trim().is_empty() {
        return Err(AppError::Validation("Course id is required".to_string()));
    }

    resolve_learner(pool, learner_id).await?;

    let added = if remove_from_wishlist(pool, learner_id, course_id).await? {
        info!("Removed from wishlist");
        false
    } else {
        add_to_wishlist(pool, learner_id, course_id).await?;
        info!("Added to wishlist");
        true
    };

    Ok(WishlistToggle {
        added,
        wishlist: get_wishlist(pool, learner_id).await?,
    })
}
