#![allow(dead_code)]

use actix_web::web;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use scrapp_service::db::{PostStore, UserStore};
use scrapp_service::models::{NewPost, Post, PostChanges, PostPage, User, UserCredentials};
use scrapp_service::services::chat::{ChatError, ChatMessage, ChatProvider};
use scrapp_service::services::preprocess::ImageTensor;
use scrapp_service::services::trash_model::{ModelResult, TrashModel};
use scrapp_service::{ApiSettings, AppError, AppState};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const LABELS: [&str; 6] = ["cardboard", "glass", "metal", "paper", "plastic", "trash"];

/// Build the full app around a state, accepting any Host
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .wrap(scrapp_service::middleware::AllowedHosts::new(vec!["*".to_string()]))
                .configure(scrapp_service::handlers::configure),
        )
        .await
    };
}

/// Model that always scores `plastic` highest
pub struct StubModel {
    names: Vec<String>,
}

impl StubModel {
    pub fn new() -> Self {
        Self {
            names: LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TrashModel for StubModel {
    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn infer(&self, _input: ImageTensor) -> ModelResult<Vec<f32>> {
        Ok(vec![0.5, 0.1, 0.2, 0.3, 3.0, -1.0])
    }
}

/// Chat provider for tests that never reach the chat endpoint
pub struct UnusedChat;

#[async_trait]
impl ChatProvider for UnusedChat {
    async fn generate(&self, _history: Vec<ChatMessage>, _prompt: String) -> Result<String, ChatError> {
        Err(ChatError::EmptyReply)
    }
}

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: Mutex<Vec<Post>>,
    unavailable: AtomicBool,
}

impl InMemoryPostStore {
    /// Seed a post with an explicit age, bypassing the HTTP layer
    pub fn seed(&self, author: i64, title: &str, category: &str, minutes_ago: i64) -> Post {
        let mut posts = self.posts.lock().unwrap();
        let category: scrapp_service::models::Category = category.parse().unwrap();
        let post = Post {
            id: posts.len() as i64 + 1,
            title: title.to_string(),
            content: format!("{} content", title),
            category,
            category_label: category.label().to_string(),
            author,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        };
        posts.push(post.clone());
        post
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn create(&self, author_id: i64, post: NewPost) -> scrapp_service::Result<Post> {
        let mut posts = self.posts.lock().unwrap();
        let created = Post {
            id: posts.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            title: post.title,
            content: post.content,
            category: post.category,
            category_label: post.category.label().to_string(),
            author: author_id,
            created_at: Utc::now(),
        };
        posts.push(created.clone());
        Ok(created)
    }

    async fn list(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> scrapp_service::Result<PostPage> {
        let mut matching: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| category.map_or(true, |c| p.category.as_str() == c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let posts = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(PostPage { posts, total })
    }

    async fn get(&self, id: i64) -> scrapp_service::Result<Option<Post>> {
        Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, id: i64, changes: PostChanges) -> scrapp_service::Result<Option<Post>> {
        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(category) = changes.category {
            post.category = category;
            post.category_label = category.label().to_string();
        }
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: i64) -> scrapp_service::Result<bool> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() < before)
    }

    async fn ping(&self) -> scrapp_service::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<UserCredentials>>,
    tokens: Mutex<HashMap<i64, String>>,
}

impl InMemoryUserStore {
    /// Insert a user with a known token; the password hash is not usable for login
    pub fn seed_with_token(&self, username: &str, token: &str) -> User {
        let mut users = self.users.lock().unwrap();
        let creds = UserCredentials {
            id: users.len() as i64 + 1,
            username: username.to_string(),
            email: String::new(),
            password_hash: "!".to_string(),
        };
        users.push(creds.clone());
        self.tokens
            .lock()
            .unwrap()
            .insert(creds.id, token.to_string());
        creds.user()
    }

    pub fn token_for(&self, user_id: i64) -> Option<String> {
        self.tokens.lock().unwrap().get(&user_id).cloned()
    }

    pub fn password_hash_for(&self, username: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.password_hash.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> scrapp_service::Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }
        let creds = UserCredentials {
            id: users.len() as i64 + 1,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.push(creds.clone());
        Ok(creds.user())
    }

    async fn find_by_username(&self, username: &str) -> scrapp_service::Result<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_or_create_token(&self, user_id: i64, candidate_key: &str) -> scrapp_service::Result<String> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| candidate_key.to_string())
            .clone())
    }

    async fn user_for_token(&self, key: &str) -> scrapp_service::Result<Option<User>> {
        let user_id = self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(id, _)| *id);

        Ok(user_id.and_then(|id| {
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == id)
                .map(UserCredentials::user)
        }))
    }
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub posts: Arc<InMemoryPostStore>,
    pub users: Arc<InMemoryUserStore>,
}

pub fn context_with(chat: Arc<dyn ChatProvider>, settings: ApiSettings) -> TestContext {
    let posts = Arc::new(InMemoryPostStore::default());
    let users = Arc::new(InMemoryUserStore::default());
    let state = web::Data::new(AppState::new(
        Arc::new(StubModel::new()),
        chat,
        posts.clone(),
        users.clone(),
        settings,
    ));
    TestContext { state, posts, users }
}

pub fn context() -> TestContext {
    context_with(Arc::new(UnusedChat), ApiSettings::default())
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub const BOUNDARY: &str = "scrapp-test-boundary";

/// Single-part multipart body; `filename: None` makes it a plain text field
pub fn multipart_body(field: &str, filename: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(filename) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n",
            field, filename
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n{}\r\n", BOUNDARY, disposition).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
