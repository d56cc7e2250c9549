pub mod core {
    pub mod config;
    pub mod error;
    pub mod routes;
    pub mod startup;
    pub mod state;
    pub mod tracing_init;
}

pub mod models {
    pub mod activation;
    pub mod forms;
    pub mod user;
}

pub mod stores {
    pub mod activation_store;
    pub mod session_store;
    pub mod user_store;
}

pub mod accounts {
    pub mod activation;
    pub mod hooks;
    pub mod manager;
}

pub mod handlers {
    pub mod account;
    pub mod activation;
    pub mod admin;
    pub mod auth;
    pub mod fallback;
    pub mod health;
}

pub mod mail;

pub mod wal {
    #[allow(clippy::module_inception)]
    pub mod wal;
}

pub mod utils {
    pub mod auth;
    pub mod form;
    pub mod keys;
    pub mod password;
}

#[cfg(test)]
mod testing;
