/// Account registration, login and token resolution
use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::security::{check_password_rules, generate_token_key, hash_password, verify_password};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::{Validate, ValidateEmail, ValidationError};

pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

// Letters, digits and @ . + - _
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+-]+$").expect("hardcoded username regex is invalid - fix source code")
});

fn validate_username_shape(username: &str) -> std::result::Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_username");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

/// Email is optional; when given it must look like an address
fn validate_optional_email(email: &str) -> std::result::Result<(), ValidationError> {
    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("Enter a valid email address.".into());
        Err(err)
    }
}

/// Lowercase the domain part, leaving the local part as typed
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has between 1 and 150 characters."),
        custom(function = "validate_username_shape")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(
        length(max = 254, message = "Ensure this field has no more than 254 characters."),
        custom(function = "validate_optional_email")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub token: String,
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create the account and issue its token
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse> {
        req.validate()?;
        check_password_rules(&req.password, &req.username)
            .map_err(|msg| AppError::Validation(format!("password: {}", msg)))?;

        let email = normalize_email(&req.email);
        let password_hash = hash_password(&req.password)?;
        let user = self
            .users
            .create_user(&req.username, &email, &password_hash)
            .await?;

        let token = self
            .users
            .get_or_create_token(user.id, &generate_token_key())
            .await?;

        info!(user_id = user.id, "User registered");
        Ok(RegisterResponse { token, user })
    }

    /// Exchange credentials for the user's token, creating one on first login
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse> {
        req.validate()?;

        let credentials = self
            .users
            .find_by_username(&req.username)
            .await?
            .ok_or_else(|| AppError::BadRequest(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&req.password, &credentials.password_hash)? {
            return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
        }

        let token = self
            .users
            .get_or_create_token(credentials.id, &generate_token_key())
            .await?;

        Ok(TokenResponse { token })
    }

    /// Resolve a token key to its owner
    pub async fn authenticate(&self, key: &str) -> Result<Option<User>> {
        self.users.user_for_token(key).await
    }
}
