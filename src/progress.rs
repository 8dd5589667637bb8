use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use crate::db::{add_completed_lesson, get_course, get_progress};
use crate::error::AppError;
use crate::identity::resolve_learner;
use crate::models::{Course, CourseProgress};

/// Looks up the course and checks that `lesson_id` is one of its lessons.
#[instrument(skip(pool))]
pub async fn find_course_lesson(
    pool: &Pool<Sqlite>,
    course_id: &str,
    lesson_id: &str,
) -> Result<Course, AppError> {
    if lesson_id.trim().is_empty() {
        return Err(AppError::Validation("Lesson id is required".to_string()));
    }

    let course = get_course(pool, course_id).await?;
    if !course.has_lesson(lesson_id) {
        return Err(AppError::Validation(format!(
            "Lesson {} is not part of course {}",
            lesson_id, course_id
        )));
    }

    Ok(course)
}

/// Marks a lesson complete and returns the learner's whole progress mapping.
/// Marking an already completed lesson is a no-op.
#[instrument(skip(pool))]
pub async fn mark_lesson_complete(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
    lesson_id: &str,
) -> Result<Vec<CourseProgress>, AppError> {
    find_course_lesson(pool, course_id, lesson_id).await?;
    resolve_learner(pool, learner_id).await?;

    if add_completed_lesson(pool, learner_id, course_id, lesson_id).await? {
        info!("Lesson marked as complete");
    } else {
        debug!("Lesson was already complete");
    }

    get_progress(pool, learner_id).await
}
