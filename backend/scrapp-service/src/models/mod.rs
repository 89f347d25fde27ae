/// Data models for community posts and user accounts
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Community post topic. Independent from the classifier's trash classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    WasteRecycling,
    UpcyclingDiy,
    SustainableLiving,
    FoodComposting,
    GreenTech,
    CommunityEvents,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::WasteRecycling,
        Category::UpcyclingDiy,
        Category::SustainableLiving,
        Category::FoodComposting,
        Category::GreenTech,
        Category::CommunityEvents,
    ];

    /// Slug stored in the database and used in `?category=` filters
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::WasteRecycling => "waste_recycling",
            Category::UpcyclingDiy => "upcycling_diy",
            Category::SustainableLiving => "sustainable_living",
            Category::FoodComposting => "food_composting",
            Category::GreenTech => "green_tech",
            Category::CommunityEvents => "community_events",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::WasteRecycling => "Waste & Recycling",
            Category::UpcyclingDiy => "Upcycling & DIY",
            Category::SustainableLiving => "Sustainable Living Tips",
            Category::FoodComposting => "Food & Composting",
            Category::GreenTech => "Green Tech & Innovation",
            Category::CommunityEvents => "Community & Events",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("\"{}\" is not a valid choice.", s))
    }
}

/// Post as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub category_label: String,
    /// Author's user id
    pub author: i64,
    pub created_at: DateTime<Utc>,
}

/// Raw `posts` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = String;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let category: Category = row.category.parse()?;
        Ok(Post {
            id: row.id,
            title: row.title,
            content: row.content,
            category,
            category_label: category.label().to_string(),
            author: row.author_id,
            created_at: row.created_at,
        })
    }
}

/// Validated input for a new post
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: Category,
}

/// Field changes for an update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Category>,
}

/// One page of posts plus the total number of matching rows
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: i64,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Account together with its stored password hash
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl UserCredentials {
    pub fn user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}
