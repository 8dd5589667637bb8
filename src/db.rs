use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{
    Course, CourseProgress, DbCourse, DbLearner, DbLesson, DbRosterEntry, Learner, LearnerProfile,
    Lesson, NewCourse, NewLearner, RosterEntry, from_minor_units, to_minor_units,
};

const LEARNER_COLUMNS: &str = "id, name, email, role, scratchpad, created_at";
const COURSE_COLUMNS: &str =
    "id, teacher, title, description, price_cents, category, thumbnail, is_published, created_at";

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---- learners ----

#[instrument(skip(pool))]
pub async fn find_learner_profile(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<Option<LearnerProfile>, AppError> {
    let row = sqlx::query_as::<_, DbLearner>(&format!(
        "SELECT {} FROM learners WHERE id = ?",
        LEARNER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(LearnerProfile::try_from).transpose()
}

#[instrument(skip(pool))]
pub async fn find_learner(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Learner>, AppError> {
    info!("Fetching learner by id");
    let Some(profile) = find_learner_profile(pool, id).await? else {
        return Ok(None);
    };

    let enrolled = get_enrolled_courses(pool, id).await?;
    let wishlist = get_wishlist(pool, id).await?;
    let progress = get_progress(pool, id).await?;

    Ok(Some(profile.with_collections(enrolled, wishlist, progress)))
}

pub async fn get_learner(pool: &Pool<Sqlite>, id: &str) -> Result<Learner, AppError> {
    find_learner(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Learner {} not found in database", id)))
}

/// Inserts the learner unless it would collide with an existing id or email.
/// Returns whether this call created the record; callers tell the two
/// collisions apart by looking the id up afterwards.
#[instrument(skip(pool, learner), fields(learner_id = %learner.id, role = %learner.role))]
pub async fn insert_learner_if_absent(
    pool: &Pool<Sqlite>,
    learner: &NewLearner,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO learners (id, name, email, role, scratchpad, created_at)
         VALUES (?, ?, ?, ?, '', ?)
         ON CONFLICT DO NOTHING",
    )
    .bind(&learner.id)
    .bind(&learner.name)
    .bind(&learner.email)
    .bind(learner.role.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Sets the role only while the stored one is still pending, so a role is
/// picked at most once even under concurrent registrations.
#[instrument(skip(pool))]
pub async fn set_role_if_pending(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    role: Role,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE learners SET role = ? WHERE id = ? AND role = ?")
        .bind(role.as_str())
        .bind(learner_id)
        .bind(Role::Pending.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[instrument(skip(pool, notes))]
pub async fn update_scratchpad(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    notes: &str,
) -> Result<(), AppError> {
    info!("Updating scratchpad");
    let result = sqlx::query("UPDATE learners SET scratchpad = ? WHERE id = ?")
        .bind(notes)
        .bind(learner_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Learner {} not found in database",
            learner_id
        )));
    }

    Ok(())
}

// ---- learner collections ----

#[instrument(skip(pool))]
pub async fn get_enrolled_courses(
    pool: &Pool<Sqlite>,
    learner_id: &str,
) -> Result<Vec<String>, AppError> {
    let rows = sqlx::query("SELECT course_id FROM learner_enrollments WHERE learner_id = ? ORDER BY id")
        .bind(learner_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("course_id")).collect())
}

/// Add-to-set on the learner's enrollment list.
#[instrument(skip(pool))]
pub async fn add_enrolled_course(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
    enrolled_at: DateTime<Utc>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO learner_enrollments (learner_id, course_id, enrolled_at)
         VALUES (?, ?, ?)
         ON CONFLICT (learner_id, course_id) DO NOTHING",
    )
    .bind(learner_id)
    .bind(course_id)
    .bind(enrolled_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[instrument(skip(pool))]
pub async fn get_wishlist(pool: &Pool<Sqlite>, learner_id: &str) -> Result<Vec<String>, AppError> {
    let rows = sqlx::query(
        "SELECT course_id FROM learner_wishlist WHERE learner_id = ? ORDER BY rowid",
    )
    .bind(learner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get("course_id")).collect())
}

#[instrument(skip(pool))]
pub async fn add_to_wishlist(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO learner_wishlist (learner_id, course_id) VALUES (?, ?)
         ON CONFLICT (learner_id, course_id) DO NOTHING",
    )
    .bind(learner_id)
    .bind(course_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[instrument(skip(pool))]
pub async fn remove_from_wishlist(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
) -> Result<bool, AppError> {
    let result =
        sqlx::query("DELETE FROM learner_wishlist WHERE learner_id = ? AND course_id = ?")
            .bind(learner_id)
            .bind(course_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() == 1)
}

/// Progress grouped per course, courses in the order progress was first
/// recorded and lessons in completion order.
#[instrument(skip(pool))]
pub async fn get_progress(
    pool: &Pool<Sqlite>,
    learner_id: &str,
) -> Result<Vec<CourseProgress>, AppError> {
    let rows = sqlx::query(
        "SELECT course_id, lesson_id FROM learner_progress WHERE learner_id = ? ORDER BY id",
    )
    .bind(learner_id)
    .fetch_all(pool)
    .await?;

    let mut progress: Vec<CourseProgress> = Vec::new();
    for row in rows {
        let course_id: String = row.get("course_id");
        let lesson_id: String = row.get("lesson_id");

        match progress.iter_mut().find(|p| p.course_id == course_id) {
            Some(entry) => entry.completed_lessons.push(lesson_id),
            None => progress.push(CourseProgress {
                course_id,
                completed_lessons: vec![lesson_id],
            }),
        }
    }

    Ok(progress)
}

#[instrument(skip(pool))]
pub async fn add_completed_lesson(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
    lesson_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO learner_progress (learner_id, course_id, lesson_id, completed_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (learner_id, course_id, lesson_id) DO NOTHING",
    )
    .bind(learner_id)
    .bind(course_id)
    .bind(lesson_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---- courses ----

#[instrument(skip(pool, course), fields(title = %course.title))]
pub async fn create_course(
    pool: &Pool<Sqlite>,
    teacher: &str,
    course: &NewCourse,
) -> Result<Course, AppError> {
    info!("Creating course");

    if course.title.trim().is_empty() {
        return Err(AppError::Validation("Course title is required".to_string()));
    }
    if !course.price.is_finite() || course.price < 0.0 {
        return Err(AppError::Validation(format!(
            "Course price must be a non-negative amount, got {}",
            course.price
        )));
    }

    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO courses (id, teacher, title, description, price_cents, category, thumbnail, is_published, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, FALSE, ?)",
    )
    .bind(&id)
    .bind(teacher)
    .bind(&course.title)
    .bind(&course.description)
    .bind(to_minor_units(course.price))
    .bind(course.category.as_deref().unwrap_or("Development"))
    .bind(course.thumbnail.as_deref().unwrap_or(""))
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    for (position, lesson) in course.lessons.iter().enumerate() {
        let lesson_id = lesson
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            "INSERT INTO lessons (course_id, id, position, title, video_url, duration, is_free)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&lesson_id)
        .bind(position as i64)
        .bind(&lesson.title)
        .bind(&lesson.video_url)
        .bind(&lesson.duration)
        .bind(lesson.is_free)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Validation(format!("Duplicate lesson id '{}'", lesson_id))
            }
            _ => AppError::Database(e),
        })?;
    }

    tx.commit().await?;

    get_course(pool, &id).await
}

#[instrument(skip(pool))]
pub async fn find_course(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Course>, AppError> {
    info!("Fetching course by id");
    let row = sqlx::query_as::<_, DbCourse>(&format!(
        "SELECT {} FROM courses WHERE id = ?",
        COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(course) => {
            let lessons = get_lessons(pool, id).await?;
            let roster = get_roster(pool, id).await?;
            Ok(Some(course.into_course(lessons, roster)))
        }
        None => Ok(None),
    }
}

pub async fn get_course(pool: &Pool<Sqlite>, id: &str) -> Result<Course, AppError> {
    find_course(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Course {} not found", id)))
}

#[instrument(skip(pool))]
pub async fn get_courses_by_teacher(
    pool: &Pool<Sqlite>,
    teacher: &str,
) -> Result<Vec<Course>, AppError> {
    info!("Getting courses by teacher");
    let rows = sqlx::query_as::<_, DbCourse>(&format!(
        "SELECT {} FROM courses WHERE teacher = ? ORDER BY created_at, id",
        COURSE_COLUMNS
    ))
    .bind(teacher)
    .fetch_all(pool)
    .await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone().unwrap_or_default();
        let lessons = get_lessons(pool, &id).await?;
        let roster = get_roster(pool, &id).await?;
        courses.push(row.into_course(lessons, roster));
    }

    Ok(courses)
}

#[instrument(skip(pool))]
pub async fn get_lessons(pool: &Pool<Sqlite>, course_id: &str) -> Result<Vec<Lesson>, AppError> {
    let rows = sqlx::query_as::<_, DbLesson>(
        "SELECT id, title, video_url, duration, is_free FROM lessons
         WHERE course_id = ? ORDER BY position",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Lesson::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_roster(
    pool: &Pool<Sqlite>,
    course_id: &str,
) -> Result<Vec<RosterEntry>, AppError> {
    let rows = sqlx::query_as::<_, DbRosterEntry>(
        "SELECT student_id, amount_paid_cents, enrollment_date FROM course_roster
         WHERE course_id = ? ORDER BY id",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RosterEntry::from).collect())
}

/// Add-if-absent on the course roster, keyed by student id.
#[instrument(skip(pool, entry), fields(student_id = %entry.student_id))]
pub async fn add_roster_entry(
    pool: &Pool<Sqlite>,
    course_id: &str,
    entry: &RosterEntry,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO course_roster (course_id, student_id, amount_paid_cents, enrollment_date)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (course_id, student_id) DO NOTHING",
    )
    .bind(course_id)
    .bind(&entry.student_id)
    .bind(to_minor_units(entry.amount_paid))
    .bind(entry.enrollment_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---- one-sided enrollments ----

/// A learner-side enrollment with no roster entry behind it.
#[derive(Debug, Clone)]
pub struct UnrosteredEnrollment {
    pub learner_id: String,
    pub course_id: String,
    pub price: f64,
    pub enrolled_at: DateTime<Utc>,
}

/// A roster entry whose learner does not list the course.
#[derive(Debug, Clone)]
pub struct UnlistedRosterEntry {
    pub student_id: String,
    pub course_id: String,
    pub enrollment_date: DateTime<Utc>,
}

#[instrument(skip(pool))]
pub async fn find_unrostered_enrollments(
    pool: &Pool<Sqlite>,
) -> Result<Vec<UnrosteredEnrollment>, AppError> {
    let rows = sqlx::query(
        "SELECT le.learner_id, le.course_id, c.price_cents, le.enrolled_at
         FROM learner_enrollments le
         JOIN courses c ON c.id = le.course_id
         WHERE NOT EXISTS (
             SELECT 1 FROM course_roster r
             WHERE r.course_id = le.course_id AND r.student_id = le.learner_id
         )
         ORDER BY le.id",
    )
    .fetch_all(pool)
    .await?;

    debug!(count = rows.len(), "Found learner-side only enrollments");

    rows.iter()
        .map(|row| -> Result<UnrosteredEnrollment, AppError> {
            Ok(UnrosteredEnrollment {
                learner_id: row.try_get("learner_id")?,
                course_id: row.try_get("course_id")?,
                price: from_minor_units(row.try_get("price_cents")?),
                enrolled_at: row.try_get("enrolled_at")?,
            })
        })
        .collect()
}

#[instrument(skip(pool))]
pub async fn find_unlisted_roster_entries(
    pool: &Pool<Sqlite>,
) -> Result<Vec<UnlistedRosterEntry>, AppError> {
    let rows = sqlx::query(
        "SELECT r.student_id, r.course_id, r.enrollment_date
         FROM course_roster r
         WHERE NOT EXISTS (
             SELECT 1 FROM learner_enrollments le
             WHERE le.course_id = r.course_id AND le.learner_id = r.student_id
         )
         ORDER BY r.id",
    )
    .fetch_all(pool)
    .await?;

    debug!(count = rows.len(), "Found roster-side only enrollments");

    rows.iter()
        .map(|row| -> Result<UnlistedRosterEntry, AppError> {
            Ok(UnlistedRosterEntry {
                student_id: row.try_get("student_id")?,
                course_id: row.try_get("course_id")?,
                enrollment_date: row.try_get("enrollment_date")?,
            })
        })
        .collect()
}
