/// Post handlers - HTTP endpoints for community posts
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Category, NewPost, Post, PostChanges};
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

const INVALID_PAGE: &str = "Invalid page.";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Post>,
}

/// Writable post fields; `id`, `author` and `created_at` are ignored if sent
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostPayload {
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub category: Option<String>,
}

fn field_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

impl PostPayload {
    fn trimmed(self) -> Self {
        Self {
            title: self.title.map(|t| t.trim().to_string()),
            content: self.content.map(|c| c.trim().to_string()),
            category: self.category,
        }
    }

    /// Validate into field changes. Unless `partial`, title and content must be present.
    pub fn into_changes(self, partial: bool) -> Result<PostChanges> {
        let payload = self.trimmed();
        let mut errors = match payload.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        for (field, value) in [("title", &payload.title), ("content", &payload.content)] {
            match value {
                None if !partial => {
                    errors.add(field, field_error("required", "This field is required.".into()))
                }
                Some(v) if v.is_empty() => errors.add(
                    field,
                    field_error("blank", "This field may not be blank.".into()),
                ),
                _ => {}
            }
        }

        let category = match payload.category.as_deref().map(str::parse::<Category>) {
            Some(Ok(category)) => Some(category),
            Some(Err(msg)) => {
                errors.add("category", field_error("invalid_choice", msg));
                None
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(PostChanges {
            title: payload.title,
            content: payload.content,
            category,
        })
    }

    pub fn into_new_post(self) -> Result<NewPost> {
        let changes = self.into_changes(false)?;
        Ok(NewPost {
            title: changes.title.unwrap_or_default(),
            content: changes.content.unwrap_or_default(),
            category: changes.category.unwrap_or_default(),
        })
    }
}

/// Page number from `?page=`; absent means the first page
fn parse_page(raw: Option<&str>) -> Result<i64> {
    match raw {
        None => Ok(1),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| AppError::NotFound(INVALID_PAGE.to_string())),
    }
}

/// Link to `page` keeping every other query parameter; page 1 drops the parameter
fn page_link(req: &HttpRequest, page: i64) -> String {
    let mut pairs: Vec<(String, String)> =
        web::Query::<Vec<(String, String)>>::from_query(req.query_string())
            .map(|q| q.into_inner())
            .unwrap_or_default()
            .into_iter()
            .filter(|(k, _)| k != "page")
            .collect();

    if page > 1 {
        pairs.push(("page".to_string(), page.to_string()));
    }

    if pairs.is_empty() {
        return req.path().to_string();
    }

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", req.path(), query)
}

/// List posts, newest first
///
/// GET /api/posts/?category=<slug>&page=<n>
pub async fn list_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let page = parse_page(query.page.as_deref())?;
    let page_size = state.settings.page_size;
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    // A page this far out cannot exist
    let offset = (page - 1)
        .checked_mul(page_size)
        .ok_or_else(|| AppError::NotFound(INVALID_PAGE.to_string()))?;

    let result = state.posts.list(category, page_size, offset).await?;

    let num_pages = ((result.total + page_size - 1) / page_size).max(1);
    if page > num_pages {
        return Err(AppError::NotFound(INVALID_PAGE.to_string()));
    }

    Ok(HttpResponse::Ok().json(PostListResponse {
        count: result.total,
        next: (page < num_pages).then(|| page_link(&req, page + 1)),
        previous: (page > 1).then(|| page_link(&req, page - 1)),
        results: result.posts,
    }))
}

/// Create a post authored by the caller
///
/// POST /api/posts/
pub async fn create_post(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: web::Json<PostPayload>,
) -> Result<HttpResponse> {
    let new_post = req.into_inner().into_new_post()?;
    let post = state.posts.create(user.0.id, new_post).await?;

    tracing::info!(post_id = post.id, author = user.0.id, "Post created");
    Ok(HttpResponse::Created().json(post))
}

/// GET /api/posts/{id}/
pub async fn get_post(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    let post = state
        .posts
        .get(path.into_inner())
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(HttpResponse::Ok().json(post))
}

async fn apply_update(
    state: &AppState,
    id: i64,
    payload: PostPayload,
    partial: bool,
) -> Result<HttpResponse> {
    if state.posts.get(id).await?.is_none() {
        return Err(AppError::not_found());
    }

    let changes = payload.into_changes(partial)?;
    let post = state
        .posts
        .update(id, changes)
        .await?
        .ok_or_else(AppError::not_found)?;

    Ok(HttpResponse::Ok().json(post))
}

/// Full update
///
/// PUT /api/posts/{id}/
pub async fn replace_post(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<i64>,
    req: web::Json<PostPayload>,
) -> Result<HttpResponse> {
    apply_update(&state, path.into_inner(), req.into_inner(), false).await
}

/// Partial update
///
/// PATCH /api/posts/{id}/
pub async fn patch_post(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<i64>,
    req: web::Json<PostPayload>,
) -> Result<HttpResponse> {
    apply_update(&state, path.into_inner(), req.into_inner(), true).await
}

/// DELETE /api/posts/{id}/
pub async fn delete_post(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    if !state.posts.delete(id).await? {
        return Err(AppError::not_found());
    }

    tracing::info!(post_id = id, user_id = user.0.id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn payload(title: Option<&str>, content: Option<&str>, category: Option<&str>) -> PostPayload {
        PostPayload {
            title: title.map(str::to_string),
            content: content.map(str::to_string),
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_new_post_defaults_category_and_trims() {
        let post = payload(Some("  Jar lids  "), Some("Steel, recyclable"), None)
            .into_new_post()
            .unwrap();
        assert_eq!(post.title, "Jar lids");
        assert_eq!(post.category, Category::WasteRecycling);
    }

    #[test]
    fn test_new_post_requires_title_and_content() {
        let err = payload(None, Some("   "), None).into_new_post().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("title: This field is required."));
        assert!(msg.contains("content: This field may not be blank."));
    }

    #[test]
    fn test_title_length_and_category_choice() {
        let long = "t".repeat(256);
        assert!(payload(Some(&long), Some("c"), None).into_new_post().is_err());

        let err = payload(Some("t"), Some("c"), Some("plastic"))
            .into_new_post()
            .unwrap_err();
        assert_eq!(err.to_string(), "category: \"plastic\" is not a valid choice.");
    }

    #[test]
    fn test_partial_changes_allow_missing_fields() {
        let changes = payload(None, None, Some("green_tech"))
            .into_changes(true)
            .unwrap();
        assert_eq!(
            changes,
            PostChanges {
                title: None,
                content: None,
                category: Some(Category::GreenTech),
            }
        );
        assert!(payload(Some(""), None, None).into_changes(true).is_err());
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert!(parse_page(Some("0")).is_err());
        assert!(parse_page(Some("abc")).is_err());
    }

    #[test]
    fn test_page_links_preserve_filter() {
        let req = TestRequest::get()
            .uri("/api/posts/?category=green_tech&page=2")
            .to_http_request();
        assert_eq!(page_link(&req, 3), "/api/posts/?category=green_tech&page=3");
        assert_eq!(page_link(&req, 1), "/api/posts/?category=green_tech");

        let req = TestRequest::get().uri("/api/posts/?page=2").to_http_request();
        assert_eq!(page_link(&req, 1), "/api/posts/");
    }
}
