use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::auth::Role;
use crate::db::{
    find_learner, find_learner_profile, get_learner, insert_learner_if_absent,
    set_role_if_pending, update_scratchpad,
};
use crate::error::AppError;
use crate::models::{Learner, NewLearner};

pub const PLACEHOLDER_NAME: &str = "EduStream Student";

/// Placeholder email for an auto-provisioned learner. Derived from the full
/// identity so two identities never share one.
pub fn placeholder_email(external_id: &str) -> String {
    format!("{}@placeholder.edustream.invalid", external_id)
}

fn require_identity(external_id: &str) -> Result<(), AppError> {
    if external_id.trim().is_empty() {
        return Err(AppError::Validation(
            "External identity must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Returns the learner for `external_id`, creating a placeholder record on
/// first contact. Create-or-fetch is one conditional insert followed by a
/// read, so concurrent first contacts collapse into a single record.
#[instrument(skip(pool))]
pub async fn resolve_learner(pool: &Pool<Sqlite>, external_id: &str) -> Result<Learner, AppError> {
    require_identity(external_id)?;

    let placeholder = NewLearner {
        id: external_id.to_string(),
        name: PLACEHOLDER_NAME.to_string(),
        email: placeholder_email(external_id),
        role: Role::Pending,
    };

    if insert_learner_if_absent(pool, &placeholder).await? {
        info!(learner_id = %external_id, "Auto-provisioned learner");
    }

    find_learner(pool, external_id).await?.ok_or_else(|| {
        AppError::DuplicateIdentity(format!(
            "Placeholder email '{}' is already taken",
            placeholder.email
        ))
    })
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Created,
    Updated,
    AlreadySynced,
}

impl RegistrationOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RegistrationOutcome::Created => "Welcome to EduStream! Role secured.",
            RegistrationOutcome::Updated => "Role updated successfully",
            RegistrationOutcome::AlreadySynced => "User already synced.",
        }
    }
}

#[instrument(skip(pool, registration), fields(external_id = %registration.external_id))]
pub async fn register_learner(
    pool: &Pool<Sqlite>,
    registration: &Registration,
) -> Result<(RegistrationOutcome, Learner), AppError> {
    require_identity(&registration.external_id)?;

    if registration.name.trim().is_empty() || registration.email.trim().is_empty() {
        return Err(AppError::Validation(
            "Name and email are required".to_string(),
        ));
    }

    let role = registration.role.unwrap_or(Role::Student);
    if role.is_pending() {
        return Err(AppError::Validation(
            "Registration must select a student or teacher role".to_string(),
        ));
    }

    let new_learner = NewLearner {
        id: registration.external_id.clone(),
        name: registration.name.clone(),
        email: registration.email.clone(),
        role,
    };

    if insert_learner_if_absent(pool, &new_learner).await? {
        info!(email = %registration.email, role = %role, "Registered new learner");
        let learner = get_learner(pool, &registration.external_id).await?;
        return Ok((RegistrationOutcome::Created, learner));
    }

    if find_learner_profile(pool, &registration.external_id)
        .await?
        .is_none()
    {
        return Err(AppError::DuplicateIdentity(format!(
            "Email '{}' is already registered",
            registration.email
        )));
    }

    // Record already exists: the role may be picked only once.
    let outcome = if set_role_if_pending(pool, &registration.external_id, role).await? {
        info!(role = %role, "Role selected for existing learner");
        RegistrationOutcome::Updated
    } else {
        RegistrationOutcome::AlreadySynced
    };

    let learner = get_learner(pool, &registration.external_id).await?;
    if outcome == RegistrationOutcome::AlreadySynced && learner.role != role {
        warn!(
            current = %learner.role,
            requested = %role,
            "Rejected role change for synced learner"
        );
    }

    Ok((outcome, learner))
}

/// Saves scratchpad notes, auto-provisioning the learner if needed.
#[instrument(skip(pool, notes))]
pub async fn save_scratchpad(
    pool: &Pool<Sqlite>,
    external_id: &str,
    notes: &str,
) -> Result<String, AppError> {
    let learner = resolve_learner(pool, external_id).await?;
    update_scratchpad(pool, &learner.id, notes).await?;

    Ok(notes.to_string())
}
