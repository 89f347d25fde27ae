use super::PostStore;
use crate::error::{AppError, Result};
use crate::models::{NewPost, Post, PostChanges, PostPage, PostRow};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

const POST_COLUMNS: &str = "id, author_id, title, content, category, created_at";

/// PostgreSQL-backed post repository
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_post(row: PostRow) -> Result<Post> {
    Post::try_from(row).map_err(AppError::Internal)
}

#[async_trait]
impl PostStore for PgPostRepository {
    async fn create(&self, author_id: i64, post: NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (author_id, title, content, category)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(author_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.category.as_str())
        .fetch_one(&self.pool)
        .await?;

        into_post(row)
    }

    async fn list(&self, category: Option<&str>, limit: i64, offset: i64) -> Result<PostPage> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM posts WHERE ($1::text IS NULL OR category = $1)",
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let posts = rows.into_iter().map(into_post).collect::<Result<Vec<_>>>()?;

        Ok(PostPage { posts, total })
    }

    async fn get(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_post).transpose()
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                category = COALESCE($4, category)
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.category.map(|c| c.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_post).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
