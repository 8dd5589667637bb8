#[cfg(test)]
pub mod test_utils {
    use crate::auth::{IDENTITY_HEADER, Role};
    use crate::db::{create_course, insert_learner_if_absent, run_migrations};
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::{Learner, NewCourse, NewLearner, NewLesson};
    use rocket::http::Header;
    use rocket::local::asynchronous::Client;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();

    #[derive(Default)]
    pub struct TestDbBuilder {
        learners: Vec<TestLearner>,
        courses: Vec<TestCourse>,
    }

    pub struct TestLearner {
        pub id: String,
        pub name: String,
        pub email: String,
        pub role: Role,
    }

    pub struct TestCourse {
        pub key: String,
        pub teacher: String,
        pub title: String,
        pub price: f64,
        pub lesson_ids: Vec<String>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn learner(mut self, id: &str, name: &str, role: Role) -> Self {
            self.learners.push(TestLearner {
                id: id.to_string(),
                name: name.to_string(),
                email: format!("{}@example.com", id),
                role,
            });
            self
        }

        pub fn student(self, id: &str, name: &str) -> Self {
            self.learner(id, name, Role::Student)
        }

        pub fn teacher(self, id: &str, name: &str) -> Self {
            self.learner(id, name, Role::Teacher)
        }

        /// A course looked up later by `key`. Lesson ids are used verbatim.
        pub fn course(mut self, key: &str, teacher: &str, price: f64, lesson_ids: &[&str]) -> Self {
            self.courses.push(TestCourse {
                key: key.to_string(),
                teacher: teacher.to_string(),
                title: format!("{} course", key),
                price,
                lesson_ids: lesson_ids.iter().map(|id| id.to_string()).collect(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter("debug")
                    .with_test_writer()
                    .try_init();
            });

            // A single connection keeps every query on the same in-memory
            // database; concurrent callers still interleave between queries.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;

            run_migrations(&pool).await?;

            for learner in &self.learners {
                insert_learner_if_absent(
                    &pool,
                    &NewLearner {
                        id: learner.id.clone(),
                        name: learner.name.clone(),
                        email: learner.email.clone(),
                        role: learner.role,
                    },
                )
                .await?;
            }

            let mut course_id_map = HashMap::new();
            for course in &self.courses {
                let lessons = course
                    .lesson_ids
                    .iter()
                    .map(|id| NewLesson {
                        id: Some(id.clone()),
                        title: format!("Lesson {}", id),
                        video_url: format!("https://videos.example.com/{}", id),
                        duration: Some("10:00".to_string()),
                        is_free: false,
                    })
                    .collect();

                let created = create_course(
                    &pool,
                    &course.teacher,
                    &NewCourse {
                        title: course.title.clone(),
                        description: format!("All about {}", course.key),
                        price: course.price,
                        lessons,
                        ..NewCourse::default()
                    },
                )
                .await?;

                course_id_map.insert(course.key.clone(), created.id);
            }

            Ok(TestDb {
                pool,
                course_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub course_id_map: HashMap<String, String>,
    }

    impl TestDb {
        pub fn course_id(&self, key: &str) -> String {
            self.course_id_map
                .get(key)
                .cloned()
                .unwrap_or_else(|| panic!("Course {} not in test database", key))
        }

        pub async fn roster_count(&self, course_id: &str, student_id: &str) -> i64 {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM course_roster WHERE course_id = ? AND student_id = ?",
            )
            .bind(course_id)
            .bind(student_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count roster entries")
        }

        pub async fn enrollment_count(&self, learner_id: &str, course_id: &str) -> i64 {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM learner_enrollments WHERE learner_id = ? AND course_id = ?",
            )
            .bind(learner_id)
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count enrollments")
        }

        pub async fn learner_count(&self, learner_id: &str) -> i64 {
            sqlx::query_scalar("SELECT COUNT(*) FROM learners WHERE id = ?")
                .bind(learner_id)
                .fetch_one(&self.pool)
                .await
                .expect("Failed to count learners")
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .teacher("teacher_1", "Tessa Teacher")
            .student("student_1", "Sam Student")
            .course("C1", "teacher_1", 50.0, &["L1", "L2", "L3"])
            .course("C2", "teacher_1", 20.0, &["intro"])
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone()).await;
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create test client");

        (client, test_db)
    }

    pub fn completed_lessons<'a>(learner: &'a Learner, course_id: &str) -> Option<&'a [String]> {
        learner
            .progress
            .iter()
            .find(|p| p.course_id == course_id)
            .map(|p| p.completed_lessons.as_slice())
    }

    pub fn identity(id: &str) -> Header<'static> {
        Header::new(IDENTITY_HEADER, id.to_string())
    }
}
