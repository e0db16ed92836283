// Unit tests for the configuration module
use super::*;
use figment::Jail;

#[test]
fn test_settings_default() {
    let settings = Settings::default();

    assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.data_dir, PathBuf::from("data"));
    assert_eq!(settings.store, StoreKind::Memory);
    assert_eq!(settings.password_algorithm, PasswordAlgorithm::BcryptPlus);
    assert_eq!(settings.cookie_ttl_secs, 60 * 60 * 24);
    assert_eq!(settings.min_confirmation_code_length, 20);
    assert!(settings.cookie_secret.is_none());
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_validation() {
    let settings = Settings::default();

    let mut invalid = settings.clone();
    invalid.log_level = "invalid".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.min_confirmation_code_length = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = settings.clone();
    invalid.min_confirmation_code_length = 101;
    assert!(invalid.validate().is_err());

    let mut invalid = settings;
    invalid.cookie_secret = Some(String::new());
    assert!(matches!(invalid.validate(), Err(AppError::Config(_))));
}

#[test]
fn test_load_settings_from_file_and_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "permgate.toml",
            r#"
            bind_addr = "0.0.0.0:8080"
            log_level = "debug"
            store = "file"
            password_algorithm = "sha256"
            cookie_ttl_secs = 0

            [permissions]
            admin_paths = ["/root"]
            root_is_public = false
            "#,
        )?;
        jail.set_env("PERMGATE_LOG_LEVEL", "warn");
        jail.set_env("PERMGATE_PERMISSIONS__USER_PATHS", "[\"/me\"]");

        let settings = Settings::load().expect("settings load");
        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8080");
        // Environment variable takes precedence
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.store, StoreKind::File);
        assert_eq!(settings.password_algorithm, PasswordAlgorithm::Sha256);
        assert_eq!(settings.cookie_ttl_secs, 0);
        assert_eq!(settings.permissions.admin_paths, vec!["/root".to_string()]);
        assert_eq!(settings.permissions.user_paths, vec!["/me".to_string()]);
        assert!(!settings.permissions.root_is_public);
        // untouched sections keep their defaults
        assert_eq!(settings.min_confirmation_code_length, 20);
        Ok(())
    });
}

#[test]
fn test_load_rejects_unknown_algorithm() {
    Jail::expect_with(|jail| {
        jail.create_file("permgate.toml", r#"password_algorithm = "md5""#)?;
        assert!(matches!(Settings::load(), Err(AppError::Config(_))));
        Ok(())
    });
}

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|_jail| {
        let settings = Settings::load_from("does-not-exist.toml").expect("defaults");
        assert_eq!(settings.log_level, "info");
        Ok(())
    });
}

#[test]
fn test_auth_config_from_settings() {
    let mut settings = Settings::default();
    settings.cookie_secret = Some("abracadabra".to_string());
    settings.min_confirmation_code_length = 30;

    let config = AuthConfig::from_settings(&settings);
    assert_eq!(config.secret(), "abracadabra");
    assert_eq!(config.algorithm(), PasswordAlgorithm::BcryptPlus);
    assert_eq!(config.codes.min_length(), 30);
    assert!(!format!("{config:?}").contains("abracadabra"));
}

#[test]
fn test_generated_secret_is_fresh() {
    let settings = Settings::default();
    let a = AuthConfig::from_settings(&settings);
    let b = AuthConfig::from_settings(&settings);

    assert_eq!(a.secret().len(), 32);
    assert_ne!(a.secret(), b.secret());
}
