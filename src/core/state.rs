// Application state (AppState)

use crate::core::config::Config;
use crate::core::error::AccountError;
use crate::mail::templates::EmailTemplates;
use crate::mail::Mailer;
use crate::stores::{activation_store::ActivationStore, session_store::SessionStore, user_store::UserStore};
use crate::wal::wal::Wal;
use anyhow::anyhow;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared application state
///
/// Everything request handlers and the account operations touch.
/// All fields are wrapped in Arc for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Users with unique email and company name
    pub users: Arc<UserStore>,

    /// Email activation records
    pub activations: Arc<ActivationStore>,

    /// Login sessions
    pub sessions: Arc<SessionStore>,

    /// Outbound mail transport
    pub mailer: Arc<dyn Mailer>,

    /// Verification email templates
    pub templates: Arc<EmailTemplates>,

    /// Write-Ahead Log for persistence
    pub wal: Arc<Wal>,

    /// Serializes account writes: activation, record creation, detail updates and removal
    pub activation_lock: Arc<Mutex<()>>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, wal: Wal, mailer: Arc<dyn Mailer>, templates: EmailTemplates) -> Self {
        let config = Arc::new(config);

        Self {
            users: Arc::new(UserStore::new()),
            activations: Arc::new(ActivationStore::new()),
            sessions: Arc::new(SessionStore::new(config.accounts.session_ttl)),
            mailer,
            templates: Arc::new(templates),
            wal: Arc::new(wal),
            activation_lock: Arc::new(Mutex::new(())),
            config,
        }
    }

    pub fn activation_days(&self) -> u32 {
        self.config.accounts.activation_days
    }

    /// Take the account write lock. Not reentrant.
    pub fn lock_accounts(&self) -> Result<MutexGuard<'_, ()>, AccountError> {
        self.activation_lock
            .lock()
            .map_err(|_| AccountError::InternalError(anyhow!("activation lock poisoned")))
    }
}
