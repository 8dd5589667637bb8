use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::error::AppError;

/// Money is stored as integer minor units and exposed as a decimal amount.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CourseProgress {
    pub course_id: String,
    pub completed_lessons: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Learner {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub scratchpad: String,
    pub enrolled_courses: Vec<String>,
    pub wishlist: Vec<String>,
    pub progress: Vec<CourseProgress>,
    pub created_at: DateTime<Utc>,
}

impl Learner {
    pub fn is_enrolled_in(&self, course_id: &str) -> bool {
        self.enrolled_courses.iter().any(|c| c == course_id)
    }
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbLearner {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub scratchpad: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Scalar learner fields, without the list-valued ones.
#[derive(Debug, Serialize, Clone)]
pub struct LearnerProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub scratchpad: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbLearner> for LearnerProfile {
    type Error = AppError;

    fn try_from(db: DbLearner) -> Result<Self, Self::Error> {
        let role = db.role.unwrap_or_default();
        Ok(Self {
            id: db.id.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            role: role
                .parse()
                .map_err(|e| AppError::Internal(format!("Corrupt learner role: {}", e)))?,
            scratchpad: db.scratchpad.unwrap_or_default(),
            created_at: db.created_at.unwrap_or_else(Utc::now),
        })
    }
}

impl LearnerProfile {
    pub fn with_collections(
        self,
        enrolled_courses: Vec<String>,
        wishlist: Vec<String>,
        progress: Vec<CourseProgress>,
    ) -> Learner {
        Learner {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            scratchpad: self.scratchpad,
            enrolled_courses,
            wishlist,
            progress,
            created_at: self.created_at,
        }
    }
}

/// Insert payload for a learner record.
#[derive(Debug, Clone)]
pub struct NewLearner {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub video_url: String,
    pub duration: Option<String>,
    pub is_free: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbLesson {
    pub id: Option<String>,
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<String>,
    pub is_free: Option<bool>,
}

impl From<DbLesson> for Lesson {
    fn from(db: DbLesson) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            video_url: db.video_url.unwrap_or_default(),
            duration: db.duration,
            is_free: db.is_free.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RosterEntry {
    pub student_id: String,
    pub amount_paid: f64,
    pub enrollment_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbRosterEntry {
    pub student_id: Option<String>,
    pub amount_paid_cents: Option<i64>,
    pub enrollment_date: Option<DateTime<Utc>>,
}

impl From<DbRosterEntry> for RosterEntry {
    fn from(db: DbRosterEntry) -> Self {
        Self {
            student_id: db.student_id.unwrap_or_default(),
            amount_paid: from_minor_units(db.amount_paid_cents.unwrap_or_default()),
            enrollment_date: db.enrollment_date.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Course {
    pub id: String,
    pub teacher: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub thumbnail: String,
    pub is_published: bool,
    pub lessons: Vec<Lesson>,
    pub enrolled_students: Vec<RosterEntry>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn has_lesson(&self, lesson_id: &str) -> bool {
        self.lessons.iter().any(|l| l.id == lesson_id)
    }

    pub fn roster_entry(&self, student_id: &str) -> Option<&RosterEntry> {
        self.enrolled_students
            .iter()
            .find(|e| e.student_id == student_id)
    }
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbCourse {
    pub id: Option<String>,
    pub teacher: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub is_published: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DbCourse {
    pub fn into_course(self, lessons: Vec<Lesson>, enrolled_students: Vec<RosterEntry>) -> Course {
        Course {
            id: self.id.unwrap_or_default(),
            teacher: self.teacher.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price: from_minor_units(self.price_cents.unwrap_or_default()),
            category: self.category.unwrap_or_default(),
            thumbnail: self.thumbnail.unwrap_or_default(),
            is_published: self.is_published.unwrap_or_default(),
            lessons,
            enrolled_students,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NewLesson {
    pub id: Option<String>,
    pub title: String,
    pub video_url: String,
    pub duration: Option<String>,
    #[serde(default)]
    pub is_free: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub lessons: Vec<NewLesson>,
}
