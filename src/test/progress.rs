#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::identity::resolve_learner;
    use crate::progress::mark_lesson_complete;
    use crate::test::test_utils::{completed_lessons, create_standard_test_db};

    #[rocket::async_test]
    async fn test_marking_lesson_twice_records_it_once() {
        let test_db = create_standard_test_db().await;
        let c1 = test_db.course_id("C1");

        let first = mark_lesson_complete(&test_db.pool, "student_1", &c1, "L1")
            .await
            .expect("Failed to mark lesson");
        let second = mark_lesson_complete(&test_db.pool, "student_1", &c1, "L1")
            .await
            .expect("Failed to mark lesson again");

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].course_id, c1);
        assert_eq!(second[0].completed_lessons, vec!["L1".to_string()]);
    }

    #[rocket::async_test]
    async fn test_progress_keeps_completion_order_per_course() {
        let test_db = create_standard_test_db().await;
        let c1 = test_db.course_id("C1");
        let c2 = test_db.course_id("C2");

        for (course, lesson) in [(&c1, "L3"), (&c2, "intro"), (&c1, "L1")] {
            mark_lesson_complete(&test_db.pool, "student_1", course, lesson)
                .await
                .expect("Failed to mark lesson");
        }

        let learner = resolve_learner(&test_db.pool, "student_1")
            .await
            .expect("Failed to resolve learner");

        assert_eq!(learner.progress.len(), 2);
        assert_eq!(learner.progress[0].course_id, c1);
        assert_eq!(
            completed_lessons(&learner, &c1),
            Some(&["L3".to_string(), "L1".to_string()][..])
        );
        assert_eq!(
            completed_lessons(&learner, &c2),
            Some(&["intro".to_string()][..])
        );
    }

    #[rocket::async_test]
    async fn test_progress_auto_provisions_learner() {
        let test_db = create_standard_test_db().await;
        let c1 = test_db.course_id("C1");

        let progress = mark_lesson_complete(&test_db.pool, "ext_new", &c1, "L2")
            .await
            .expect("Failed to mark lesson");

        assert_eq!(progress[0].completed_lessons, vec!["L2".to_string()]);
        assert_eq!(test_db.learner_count("ext_new").await, 1);
    }

    #[rocket::async_test]
    async fn test_unknown_lesson_is_rejected() {
        let test_db = create_standard_test_db().await;
        let c1 = test_db.course_id("C1");

        let result = mark_lesson_complete(&test_db.pool, "student_1", &c1, "intro").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = mark_lesson_complete(&test_db.pool, "student_1", &c1, "").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let learner = resolve_learner(&test_db.pool, "student_1")
            .await
            .expect("Failed to resolve learner");
        assert!(learner.progress.is_empty());
    }

    #[rocket::async_test]
    async fn test_unknown_course_is_not_found() {
        let test_db = create_standard_test_db().await;

        let result = mark_lesson_complete(&test_db.pool, "student_1", "missing", "L1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
