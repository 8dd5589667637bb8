#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::validation::ToValidationResponse;
    use rocket::http::Status;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::Authentication("x".into()), Status::Unauthorized),
            (AppError::Authorization("x".into()), Status::Forbidden),
            (AppError::NotFound("x".into()), Status::NotFound),
            (AppError::Validation("x".into()), Status::BadRequest),
            (AppError::AlreadyEnrolled("x".into()), Status::BadRequest),
            (AppError::DuplicateIdentity("x".into()), Status::BadRequest),
            (AppError::Internal("x".into()), Status::InternalServerError),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                Status::InternalServerError,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "Wrong status for {}", err);
        }
    }

    #[test]
    fn test_conflicts_are_client_errors() {
        for err in [
            AppError::AlreadyEnrolled("x".into()),
            AppError::DuplicateIdentity("x".into()),
        ] {
            assert_eq!(err.status_code(), Status::BadRequest);
            assert!(!err.is_server_fault());
        }
    }

    #[test]
    fn test_server_faults() {
        assert!(AppError::Internal("x".into()).is_server_fault());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_server_fault());
        assert!(!AppError::Validation("x".into()).is_server_fault());
    }

    #[test]
    fn test_server_fault_details_are_not_exposed() {
        let response = AppError::Internal("disk on fire".into()).to_validation_response();

        assert_eq!(response.0, Status::InternalServerError);
        let body = &response.1.0;
        let messages = body.errors.get("server").expect("server error entry");
        assert_eq!(messages, &vec!["Internal server error".to_string()]);
    }

    #[test]
    fn test_conflict_message_is_kept() {
        let response = AppError::AlreadyEnrolled("Learner a is already enrolled".into())
            .to_validation_response();

        assert_eq!(response.0, Status::BadRequest);
        assert_eq!(
            response.1.0.errors.get("enrollment"),
            Some(&vec!["Learner a is already enrolled".to_string()])
        );
    }
}
