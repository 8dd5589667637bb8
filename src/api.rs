use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, Role, VerifiedIdentity};
use crate::enrollment::{
    EnrolledStudent, EnrollmentResult, TeacherStats, enroll, get_enrolled_students,
    get_teacher_stats,
};
use crate::db::get_course;
use crate::identity::{
    Registration, RegistrationOutcome, register_learner, resolve_learner, save_scratchpad,
};
use crate::models::{CourseProgress, Learner};
use crate::progress::{find_course_lesson, mark_lesson_complete};
use crate::validation::{AppErrorExt, JsonValidateExt, ValidationResponse};
use crate::wishlist::{WishlistToggle, toggle_wishlist};

type ApiResult<T> = Result<T, Custom<Json<ValidationResponse>>>;

/// Resolves the caller and checks the permission. Routes that target a course
/// call this only after the course lookup, so a request for a missing course
/// leaves no learner record behind.
async fn resolve_with_permission(
    db: &Pool<Sqlite>,
    identity: &VerifiedIdentity,
    permission: Permission,
) -> ApiResult<Learner> {
    let learner = resolve_learner(db, identity.as_str())
        .await
        .validate_custom()?;
    learner.require_permission(permission).validate_custom()?;

    Ok(learner)
}

#[derive(Deserialize, Validate, Clone)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub role: Option<Role>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RegistrationResponse {
    pub outcome: RegistrationOutcome,
    pub message: String,
    pub learner: Learner,
}

#[post("/auth/register", data = "<registration>")]
pub async fn api_register(
    registration: Json<RegistrationRequest>,
    identity: VerifiedIdentity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<RegistrationResponse>>> {
    let validated = registration.validate_custom()?;

    let (outcome, learner) = register_learner(
        db,
        &Registration {
            external_id: identity.0,
            name: validated.name,
            email: validated.email,
            role: validated.role,
        },
    )
    .await
    .validate_custom()?;

    let status = match outcome {
        RegistrationOutcome::Created => Status::Created,
        _ => Status::Ok,
    };

    Ok(Custom(
        status,
        Json(RegistrationResponse {
            outcome,
            message: outcome.message().to_string(),
            learner,
        }),
    ))
}

#[get("/me")]
pub async fn api_me(learner: Learner) -> ApiResult<Json<Learner>> {
    learner
        .require_permission(Permission::ViewOwnProfile)
        .validate_custom()?;

    Ok(Json(learner))
}

#[derive(Deserialize, Validate)]
pub struct ScratchpadRequest {
    #[validate(length(max = 20000, message = "Notes are too long"))]
    pub notes: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ScratchpadResponse {
    pub scratchpad: String,
}

#[put("/me/scratchpad", data = "<request>")]
pub async fn api_save_scratchpad(
    request: Json<ScratchpadRequest>,
    learner: Learner,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<ScratchpadResponse>> {
    learner
        .require_permission(Permission::EditScratchpad)
        .validate_custom()?;
    let validated = request.validate_custom()?;

    let scratchpad = save_scratchpad(db, &learner.id, &validated.notes)
        .await
        .validate_custom()?;

    Ok(Json(ScratchpadResponse { scratchpad }))
}

#[post("/courses/<course_id>/enroll")]
pub async fn api_enroll(
    course_id: &str,
    identity: VerifiedIdentity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<EnrollmentResult>> {
    get_course(db, course_id).await.validate_custom()?;
    let learner = resolve_with_permission(db, &identity, Permission::EnrollInCourses).await?;

    let result = enroll(db, &learner.id, course_id)
        .await
        .validate_custom()?;

    Ok(Json(result))
}

#[post("/courses/<course_id>/wishlist")]
pub async fn api_toggle_wishlist(
    course_id: &str,
    learner: Learner,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<WishlistToggle>> {
    learner
        .require_permission(Permission::ManageWishlist)
        .validate_custom()?;

    let toggle = toggle_wishlist(db, &learner.id, course_id)
        .await
        .validate_custom()?;

    Ok(Json(toggle))
}

#[derive(Deserialize, Validate)]
pub struct ProgressRequest {
    #[validate(length(min = 1, message = "Course id is required"))]
    pub course_id: String,
    #[validate(length(min = 1, message = "Lesson id is required"))]
    pub lesson_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProgressResponse {
    pub message: String,
    pub current_progress: Vec<CourseProgress>,
}

#[post("/progress", data = "<request>")]
pub async fn api_mark_lesson_complete(
    request: Json<ProgressRequest>,
    identity: VerifiedIdentity,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<ProgressResponse>> {
    let validated = request.validate_custom()?;

    find_course_lesson(db, &validated.course_id, &validated.lesson_id)
        .await
        .validate_custom()?;
    let learner = resolve_with_permission(db, &identity, Permission::TrackProgress).await?;

    let current_progress = mark_lesson_complete(
        db,
        &learner.id,
        &validated.course_id,
        &validated.lesson_id,
    )
    .await
    .validate_custom()?;

    Ok(Json(ProgressResponse {
        message: "Lesson marked as complete!".to_string(),
        current_progress,
    }))
}

#[get("/teacher/enrolled-students")]
pub async fn api_enrolled_students(
    learner: Learner,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<EnrolledStudent>>> {
    learner
        .require_permission(Permission::ViewRoster)
        .validate_custom()?;

    let students = get_enrolled_students(db, &learner.id)
        .await
        .validate_custom()?;

    Ok(Json(students))
}

#[get("/teacher/stats")]
pub async fn api_teacher_stats(
    learner: Learner,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<TeacherStats>> {
    learner
        .require_permission(Permission::ViewTeachingStats)
        .validate_custom()?;

    let stats = get_teacher_stats(db, &learner.id).await.validate_custom()?;

    Ok(Json(stats))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
