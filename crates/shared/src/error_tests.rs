use super::*;

#[test]
fn test_app_error_status_codes() {
    assert_eq!(AppError::Validation("test".into()).status_code(), 400);
    assert_eq!(AppError::NotFound("test".into()).status_code(), 404);
    assert_eq!(AppError::Unauthorized("test".into()).status_code(), 401);
    assert_eq!(AppError::Forbidden("test".into()).status_code(), 403);
    assert_eq!(AppError::Conflict("test".into()).status_code(), 409);
    assert_eq!(
        AppError::OutOfOrderApproval {
            blocking_sequence: 1
        }
        .status_code(),
        400
    );
    assert_eq!(AppError::CommentRequired.status_code(), 400);
    assert_eq!(
        AppError::CurrencyUnsupported("XXX".into()).status_code(),
        400
    );
    assert_eq!(
        AppError::CurrencyUnavailable("down".into()).status_code(),
        503
    );
    assert_eq!(
        AppError::PendingWorkBlocksRemoval("test".into()).status_code(),
        400
    );
    assert_eq!(AppError::Database("test".into()).status_code(), 500);
    assert_eq!(AppError::Internal("test".into()).status_code(), 500);
}

#[test]
fn test_app_error_error_codes() {
    assert_eq!(
        AppError::Validation("test".into()).error_code(),
        "VALIDATION_FAILED"
    );
    assert_eq!(AppError::NotFound("test".into()).error_code(), "NOT_FOUND");
    assert_eq!(
        AppError::Unauthorized("test".into()).error_code(),
        "UNAUTHORIZED"
    );
    assert_eq!(
        AppError::OutOfOrderApproval {
            blocking_sequence: 2
        }
        .error_code(),
        "OUT_OF_ORDER_APPROVAL"
    );
    assert_eq!(AppError::CommentRequired.error_code(), "COMMENT_REQUIRED");
    assert_eq!(
        AppError::CurrencyUnavailable("down".into()).error_code(),
        "CURRENCY_UNAVAILABLE"
    );
    assert_eq!(
        AppError::PendingWorkBlocksRemoval("x".into()).error_code(),
        "PENDING_WORK_BLOCKS_REMOVAL"
    );
}

#[test]
fn test_out_of_order_message_names_sequence() {
    let err = AppError::OutOfOrderApproval {
        blocking_sequence: 3,
    };
    assert!(err.to_string().contains('3'));
}
