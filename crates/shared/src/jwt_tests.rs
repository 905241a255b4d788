use super::*;

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        access_token_expires_minutes: 60,
    })
}

#[test]
fn test_generate_and_validate_token() {
    let service = create_test_service();
    let user_id = Uuid::new_v4();
    let company_id = Uuid::new_v4();

    let token = service
        .generate_token(user_id, company_id, "manager")
        .expect("token generation should succeed");

    let claims = service
        .validate_token(&token)
        .expect("token validation should succeed");

    assert_eq!(claims.user_id(), user_id);
    assert_eq!(claims.company_id(), company_id);
    assert_eq!(claims.role, "manager");
}

#[test]
fn test_validate_malformed_token() {
    let service = create_test_service();

    let result = service.validate_token("not.a.token");
    assert!(matches!(result, Err(JwtError::DecodingError(_))));
}

#[test]
fn test_validate_token_wrong_secret() {
    let service = create_test_service();
    let other = JwtService::new(JwtConfig {
        secret: "a-different-secret".to_string(),
        access_token_expires_minutes: 60,
    });

    let token = other
        .generate_token(Uuid::new_v4(), Uuid::new_v4(), "admin")
        .expect("token generation should succeed");

    assert!(service.validate_token(&token).is_err());
}
