#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::identity::resolve_learner;
    use crate::test::test_utils::create_standard_test_db;
    use crate::wishlist::toggle_wishlist;

    #[rocket::async_test]
    async fn test_toggle_adds_then_removes() {
        let test_db = create_standard_test_db().await;
        let c2 = test_db.course_id("C2");

        let added = toggle_wishlist(&test_db.pool, "student_1", &c2)
            .await
            .expect("Failed to add to wishlist");
        assert!(added.added);
        assert_eq!(added.wishlist, vec![c2.clone()]);

        let removed = toggle_wishlist(&test_db.pool, "student_1", &c2)
            .await
            .expect("Failed to remove from wishlist");
        assert!(!removed.added);
        assert!(!removed.wishlist.contains(&c2));

        let learner = resolve_learner(&test_db.pool, "student_1")
            .await
            .expect("Failed to resolve learner");
        assert!(learner.wishlist.is_empty());
    }

    #[rocket::async_test]
    async fn test_toggle_leaves_other_courses_alone() {
        let test_db = create_standard_test_db().await;
        let c1 = test_db.course_id("C1");
        let c2 = test_db.course_id("C2");

        toggle_wishlist(&test_db.pool, "ext_9", &c1)
            .await
            .expect("Failed to add C1");
        toggle_wishlist(&test_db.pool, "ext_9", &c2)
            .await
            .expect("Failed to add C2");
        let toggle = toggle_wishlist(&test_db.pool, "ext_9", &c1)
            .await
            .expect("Failed to remove C1");

        assert!(!toggle.added);
        assert_eq!(toggle.wishlist, vec![c2]);
    }

    #[rocket::async_test]
    async fn test_toggle_accepts_unknown_course_ids() {
        let test_db = create_standard_test_db().await;

        let toggle = toggle_wishlist(&test_db.pool, "student_1", "not-a-course")
            .await
            .expect("Failed to toggle");

        assert!(toggle.added);
        assert_eq!(toggle.wishlist, vec!["not-a-course".to_string()]);
    }

    #[rocket::async_test]
    async fn test_toggle_rejects_empty_course_id() {
        let test_db = create_standard_test_db().await;

        let result = toggle_wishlist(&test_db.pool, "student_1", " ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
