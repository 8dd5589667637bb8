use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::identity::resolve_learner;
use crate::models::Learner;

use super::Permission;

/// Header carrying the external identity, set by the upstream layer that
/// verified the caller's token.
pub const IDENTITY_HEADER: &str = "X-Verified-Identity";

/// The caller's external identity as vouched for by the identity provider.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity(pub String);

impl VerifiedIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VerifiedIdentity {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.headers().get_one(IDENTITY_HEADER) {
            Some(id) if !id.trim().is_empty() => {
                Outcome::Success(VerifiedIdentity(id.trim().to_string()))
            }
            _ => {
                tracing::warn!(uri = %request.uri(), "Request without verified identity");
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Learner {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("learner_guard");
        let _guard = auth_span.enter();

        let identity = match request.guard::<VerifiedIdentity>().await {
            Outcome::Success(identity) => identity,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        let db = match request.rocket().state::<SqlitePool>() {
            Some(pool) => pool,
            _ => {
                tracing::error!("Database pool not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        match resolve_learner(db, identity.as_str()).await {
            Ok(learner) => {
                tracing::info!(learner_id = %learner.id, role = %learner.role, "Learner resolved");
                Outcome::Success(learner)
            }
            Err(err) => {
                let status = err.to_status_with_log("Learner guard");
                Outcome::Error((status, ()))
            }
        }
    }
}

impl Learner {
    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                learner_id = %self.id,
                role = %self.role,
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Unauthorized",
        "message": "Verified identity required"
    });

    Custom(Status::Unauthorized, Json(error_json))
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Forbidden",
        "message": "You don't have permission to perform this action"
    });

    Custom(Status::Forbidden, Json(error_json))
}
