/// Scrapp Service Library
///
/// Backend for the Scrapp recycling assistant: photo classification into
/// trash categories with disposal instructions, an LLM-backed disposal chat,
/// user accounts with token authentication, and community posts.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `services`: classifier, chat proxy and account logic
/// - `db`: store traits and PostgreSQL repositories
/// - `middleware`: Host allow-list and token authentication
/// - `security`: password hashing and token keys
/// - `models`: posts, categories and users
/// - `error`: error types and handling
/// - `config`: configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

use db::{PostStore, UserStore};
use services::{
    AccountService, ChatProvider, ClassificationService, DisposalChatService, TrashModel,
};
use std::sync::Arc;

/// Request-time limits shared by the handlers
#[derive(Debug, Clone, Copy)]
pub struct ApiSettings {
    pub page_size: i64,
    pub max_upload_bytes: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl From<&Config> for ApiSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.posts.page_size,
            max_upload_bytes: config.classifier.max_upload_bytes,
        }
    }
}

/// Shared application state, registered once as `web::Data<AppState>`
pub struct AppState {
    pub classifier: Arc<ClassificationService>,
    pub chat: Arc<DisposalChatService>,
    pub accounts: Arc<AccountService>,
    pub posts: Arc<dyn PostStore>,
    pub settings: ApiSettings,
}

impl AppState {
    pub fn new(
        model: Arc<dyn TrashModel>,
        chat: Arc<dyn ChatProvider>,
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            classifier: Arc::new(ClassificationService::new(model)),
            chat: Arc::new(DisposalChatService::new(chat)),
            accounts: Arc::new(AccountService::new(users)),
            posts,
            settings,
        }
    }
}
