// Shared fixtures for in-crate tests

use crate::core::config::{
    AccountsConfig, AdminConfig, Config, LoggingConfig, MailBackendKind, MailConfig, ServerConfig,
    StorageConfig,
};
use crate::core::state::AppState;
use crate::mail::templates::EmailTemplates;
use crate::mail::MemoryMailer;
use crate::models::user::{Role, User};
use crate::wal::wal::Wal;
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_API_KEY: &str = "test-api-key";

pub struct TestContext {
    pub state: Arc<AppState>,
    pub mailer: Arc<MemoryMailer>,
    pub _dir: TempDir,
}

pub fn create_test_config(dir: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            port: Some(8080),
            unix_socket: None,
            num_threads: 2,
        },
        accounts: AccountsConfig {
            base_url: "https://accounts.test".to_string(),
            ..AccountsConfig::default()
        },
        mail: MailConfig {
            from_email: "noreply@dabuch.com".to_string(),
            backend: MailBackendKind::Console,
            smtp: None,
        },
        storage: StorageConfig {
            wal_path: dir.path().join("test.wal"),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            console: true,
        },
        admin: AdminConfig {
            api_key: TEST_API_KEY.to_string(),
        },
    }
}

pub fn test_context() -> TestContext {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    test_context_with(dir, config)
}

pub fn test_context_with(dir: TempDir, config: Config) -> TestContext {
    let wal = Wal::new(config.storage.wal_path.clone()).unwrap();
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(
        config,
        wal,
        mailer.clone(),
        EmailTemplates::new().unwrap(),
    );

    TestContext {
        state: Arc::new(state),
        mailer,
        _dir: dir,
    }
}

/// Put a user straight into the store, skipping the creation hook
pub fn stored_user(state: &AppState, email: &str, company_name: &str) -> Arc<User> {
    state
        .users
        .insert(User {
            id: 0,
            email: email.to_string(),
            company_name: company_name.to_string(),
            password_hash: String::new(),
            active: false,
            role: Role::Client,
            timestamp: Utc::now(),
        })
        .unwrap()
}
