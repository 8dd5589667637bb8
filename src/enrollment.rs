//! Enrollment is recorded twice: in the learner's enrollment list and in the
//! course roster. The two writes are independent conditional inserts with no
//! transaction around them, so a crash between them leaves a one-sided pair.
//! A retried `enroll` completes the missing side, and
//! [`reconcile_enrollments`] repairs every one-sided pair in bulk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::db::{
    add_enrolled_course, add_roster_entry, find_learner_profile, find_unlisted_roster_entries,
    find_unrostered_enrollments, get_course, get_courses_by_teacher, get_enrolled_courses,
};
use crate::error::AppError;
use crate::identity::resolve_learner;
use crate::models::{RosterEntry, from_minor_units, to_minor_units};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Neither side was recorded when the call started.
    Enrolled,
    /// One side was already recorded and this call completed the other.
    Repaired,
}

/// Decides whether this call is the one that enrolled the learner, given what
/// it saw before writing (`listed`, `rostered`) and which of its conditional
/// writes took effect.
///
/// The learner-side write always happens before the roster write, so a roster
/// insert that takes effect completes the pair. A learner-side insert completes
/// it only when the roster entry was already there. Exactly one caller per
/// pair gets `Some`.
pub(crate) fn enrollment_outcome(
    listed: bool,
    rostered: bool,
    list_written: bool,
    roster_written: bool,
) -> Option<EnrollmentStatus> {
    let completed_pair = roster_written || (list_written && rostered);
    if !completed_pair {
        return None;
    }

    if listed || rostered {
        Some(EnrollmentStatus::Repaired)
    } else {
        Some(EnrollmentStatus::Enrolled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResult {
    pub status: EnrollmentStatus,
    pub course_id: String,
    pub amount_paid: f64,
    pub enrolled_courses: Vec<String>,
}

#[instrument(skip(pool))]
pub async fn enroll(
    pool: &Pool<Sqlite>,
    learner_id: &str,
    course_id: &str,
) -> Result<EnrollmentResult, AppError> {
    info!("Enrolling learner in course");

    let course = get_course(pool, course_id).await?;
    let learner = resolve_learner(pool, learner_id).await?;

    let listed = learner.is_enrolled_in(course_id);
    let existing_entry = course.roster_entry(learner_id).cloned();
    let rostered = existing_entry.is_some();

    if listed && rostered {
        return Err(AppError::AlreadyEnrolled(format!(
            "Learner {} is already enrolled in course {}",
            learner_id, course_id
        )));
    }

    if listed || rostered {
        warn!(listed, rostered, "Completing one-sided enrollment");
    }

    let now = Utc::now();
    let entry = existing_entry.unwrap_or_else(|| RosterEntry {
        student_id: learner_id.to_string(),
        amount_paid: course.price,
        enrollment_date: now,
    });

    let list_written = add_enrolled_course(pool, learner_id, course_id, now).await?;
    let roster_written = add_roster_entry(pool, course_id, &entry).await?;

    let Some(status) = enrollment_outcome(listed, rostered, list_written, roster_written) else {
        // A concurrent call for the same pair completed it.
        return Err(AppError::AlreadyEnrolled(format!(
            "Learner {} is already enrolled in course {}",
            learner_id, course_id
        )));
    };

    info!(?status, amount_paid = entry.amount_paid, "Enrollment recorded");

    Ok(EnrollmentResult {
        status,
        course_id: course_id.to_string(),
        amount_paid: entry.amount_paid,
        enrolled_courses: get_enrolled_courses(pool, learner_id).await?,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledStudent {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub course_id: String,
    pub course_title: String,
    pub amount_paid: f64,
    pub enrollment_date: DateTime<Utc>,
}

/// Roster entries of every course the teacher owns, joined against learner
/// profiles. Entries whose learner record is missing keep empty name/email.
#[instrument(skip(pool))]
pub async fn get_enrolled_students(
    pool: &Pool<Sqlite>,
    teacher_id: &str,
) -> Result<Vec<EnrolledStudent>, AppError> {
    let courses = get_courses_by_teacher(pool, teacher_id).await?;

    let mut students = Vec::new();
    for course in courses {
        for entry in &course.enrolled_students {
            let profile = find_learner_profile(pool, &entry.student_id).await?;
            let (name, email) = profile
                .map(|p| (p.name, p.email))
                .unwrap_or_default();

            students.push(EnrolledStudent {
                student_id: entry.student_id.clone(),
                name,
                email,
                course_id: course.id.clone(),
                course_title: course.title.clone(),
                amount_paid: entry.amount_paid,
                enrollment_date: entry.enrollment_date,
            });
        }
    }

    Ok(students)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherStats {
    pub total_courses: usize,
    pub total_students: usize,
    pub total_revenue: f64,
}

#[instrument(skip(pool))]
pub async fn get_teacher_stats(
    pool: &Pool<Sqlite>,
    teacher_id: &str,
) -> Result<TeacherStats, AppError> {
    let courses = get_courses_by_teacher(pool, teacher_id).await?;

    // Summed in minor units so the total does not drift.
    let revenue_cents: i64 = courses
        .iter()
        .flat_map(|course| &course.enrolled_students)
        .map(|entry| to_minor_units(entry.amount_paid))
        .sum();

    let stats = TeacherStats {
        total_courses: courses.len(),
        total_students: courses.iter().map(|c| c.enrolled_students.len()).sum(),
        total_revenue: from_minor_units(revenue_cents),
    };

    Ok(stats)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub roster_entries_added: usize,
    pub enrollments_added: usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.roster_entries_added + self.enrollments_added
    }
}

/// Completes the missing side of every one-sided enrollment. Meant for an
/// operator run, not for the request path.
#[instrument(skip(pool))]
pub async fn reconcile_enrollments(pool: &Pool<Sqlite>) -> Result<ReconcileReport, AppError> {
    let mut report = ReconcileReport::default();

    for pending in find_unrostered_enrollments(pool).await? {
        let entry = RosterEntry {
            student_id: pending.learner_id.clone(),
            amount_paid: pending.price,
            enrollment_date: pending.enrolled_at,
        };

        if add_roster_entry(pool, &pending.course_id, &entry).await? {
            info!(
                learner_id = %pending.learner_id,
                course_id = %pending.course_id,
                "Added missing roster entry"
            );
            report.roster_entries_added += 1;
        }
    }

    for pending in find_unlisted_roster_entries(pool).await? {
        resolve_learner(pool, &pending.student_id).await?;

        if add_enrolled_course(
            pool,
            &pending.student_id,
            &pending.course_id,
            pending.enrollment_date,
        )
        .await?
        {
            info!(
                learner_id = %pending.student_id,
                course_id = %pending.course_id,
                "Added missing enrollment"
            );
            report.enrollments_added += 1;
        }
    }

    Ok(report)
}
