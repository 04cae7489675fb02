//! Read-only JSON API over the pipeline output

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::commands::generate;
use crate::generator::{Paginator, SiteData};
use crate::Site;

/// Last pipeline result; the error string is reported as a 500
type Snapshot = Result<SiteData, String>;

/// Server state
pub struct ServerState {
    data: RwLock<Snapshot>,
    per_page: usize,
}

impl ServerState {
    pub fn new(data: Snapshot, per_page: usize) -> Self {
        Self {
            data: RwLock::new(data),
            per_page: per_page.max(1),
        }
    }

    /// Install a fresh pipeline result.
    ///
    /// A failed rebuild keeps serving the previous good data when there is any.
    pub async fn replace(&self, next: Snapshot) {
        let mut data = self.data.write().await;
        store(&mut data, next);
    }

    fn replace_blocking(&self, next: Snapshot) {
        let mut data = self.data.blocking_write();
        store(&mut data, next);
    }
}

fn store(current: &mut Snapshot, next: Snapshot) {
    match next {
        Ok(data) => *current = Ok(data),
        Err(e) if current.is_err() => *current = Err(e),
        Err(_) => tracing::warn!("Keeping previous content after a failed rebuild"),
    }
}

/// JSON error body: `{"success": false, "error": ..., "message": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: Option<String>,
}

impl ApiError {
    fn bad_request(error: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
            message: None,
        }
    }

    fn not_found(error: &'static str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error,
            message: None,
        }
    }

    fn internal(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
            message: Some(message.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal("Failed to encode response", e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.error,
            message: self.message.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;
type Params = Query<HashMap<String, String>>;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/post", get(post_by_query))
        .route("/api/post/:slug", get(post_by_path))
        .route("/api/categories", get(list_categories))
        .route("/api/tags", get(list_tags))
        .route("/api/authors", get(list_authors))
        .route("/api/movies", get(list_movies))
        .route("/api/movie", get(movie_by_query))
        .fallback(fallback_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool) -> Result<()> {
    let initial = generate::run(site).map_err(|e| {
        tracing::error!("Generation failed: {:#}", e);
        format!("{:#}", e)
    });
    let state = Arc::new(ServerState::new(initial, site.config.per_page));

    let app = router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("API running at http://{}:{}/api/posts", ip, port);
    println!("Press Ctrl+C to stop.");

    if watch {
        let site = site.clone();
        tokio::task::spawn_blocking(move || {
            let result = generate::watch_content(&site, |site| {
                let next = generate::run(site).map_err(|e| {
                    tracing::error!("Generation failed: {:#}", e);
                    format!("{:#}", e)
                });
                state.replace_blocking(next);
            });
            if let Err(e) = result {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Positive integer query parameter, `None` when absent or unusable
fn positive_param(params: &HashMap<String, String>, key: &str) -> Option<usize> {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

fn slug_param(params: &HashMap<String, String>) -> Option<&str> {
    params
        .get("slug")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// `GET /api/posts?page=&limit=`
async fn list_posts(State(state): State<Arc<ServerState>>, Query(params): Params) -> ApiResult {
    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to fetch posts", e.as_str()))?;

    let page = positive_param(&params, "page").unwrap_or(1);
    let limit = positive_param(&params, "limit").unwrap_or(state.per_page);

    let page = Paginator::new(&data.posts, limit).page(page);
    Ok(Json(serde_json::to_value(page)?))
}

/// `GET /api/post?slug=`
async fn post_by_query(State(state): State<Arc<ServerState>>, Query(params): Params) -> ApiResult {
    let slug = slug_param(&params).ok_or(ApiError::bad_request("Missing slug parameter"))?;
    find_post(&state, slug).await
}

/// `GET /api/post/:slug`
async fn post_by_path(State(state): State<Arc<ServerState>>, Path(slug): Path<String>) -> ApiResult {
    find_post(&state, &slug).await
}

async fn find_post(state: &ServerState, slug: &str) -> ApiResult {
    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to fetch post", e.as_str()))?;

    let post = data
        .post(slug)
        .ok_or(ApiError::not_found("Post not found"))?;
    Ok(Json(serde_json::to_value(post)?))
}

async fn list_categories(State(state): State<Arc<ServerState>>) -> ApiResult {
    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to fetch categories", e.as_str()))?;
    Ok(Json(json!({ "categories": &data.categories })))
}

async fn list_tags(State(state): State<Arc<ServerState>>) -> ApiResult {
    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to fetch tags", e.as_str()))?;
    Ok(Json(json!({ "tags": &data.tags })))
}

async fn list_authors(State(state): State<Arc<ServerState>>) -> ApiResult {
    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to fetch authors", e.as_str()))?;
    Ok(Json(json!({ "authors": &data.authors })))
}

/// `GET /api/movies`
async fn list_movies(State(state): State<Arc<ServerState>>) -> ApiResult {
    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to load movies", e.as_str()))?;

    let movies = data
        .movies
        .as_ref()
        .ok_or(ApiError::not_found("Movies collection is not enabled"))?;
    Ok(Json(json!({ "movies": movies })))
}

/// `GET /api/movie?slug=`
async fn movie_by_query(State(state): State<Arc<ServerState>>, Query(params): Params) -> ApiResult {
    let slug = slug_param(&params).ok_or(ApiError::bad_request("Missing slug"))?;

    let snapshot = state.data.read().await;
    let data = snapshot
        .as_ref()
        .map_err(|e| ApiError::internal("Failed to load movie", e.as_str()))?;

    let movie = data
        .movie(slug)
        .ok_or(ApiError::not_found("Movie not found"))?;
    Ok(Json(serde_json::to_value(movie)?))
}

async fn fallback_handler() -> ApiError {
    ApiError::not_found("Not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Movie, Post, Tag};
    use crate::helpers::sort_key;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request};
    use serde_json::Map;
    use tower::ServiceExt;

    fn post(slug: &str) -> Post {
        Post {
            slug: slug.to_string(),
            title: slug.to_string(),
            ..Default::default()
        }
    }

    fn state(per_page: usize) -> Arc<ServerState> {
        let data = SiteData {
            posts: vec![post("c"), post("b"), post("a")],
            tags: vec![Tag {
                slug: "rust".to_string(),
                name: "Rust".to_string(),
            }],
            ..Default::default()
        };
        Arc::new(ServerState::new(Ok(data), per_page))
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        Query(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_list_posts_paginates() {
        let Json(body) = list_posts(State(state(2)), params(&[])).await.unwrap();
        assert_eq!(body["posts"].as_array().unwrap().len(), 2);
        assert_eq!(body["pagination"]["currentPage"], 1);
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["pagination"]["hasNextPage"], true);

        let Json(body) = list_posts(State(state(2)), params(&[("page", "2"), ("limit", "2")]))
            .await
            .unwrap();
        assert_eq!(body["posts"][0]["slug"], "a");
        assert_eq!(body["pagination"]["hasPrevPage"], true);
    }

    #[tokio::test]
    async fn test_bad_page_params_fall_back() {
        let Json(body) = list_posts(State(state(10)), params(&[("page", "x"), ("limit", "0")]))
            .await
            .unwrap();
        assert_eq!(body["pagination"]["currentPage"], 1);
        assert_eq!(body["pagination"]["postsPerPage"], 10);
        assert_eq!(body["posts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_post_lookup() {
        let Json(body) = post_by_query(State(state(10)), params(&[("slug", "b")]))
            .await
            .unwrap();
        assert_eq!(body["slug"], "b");

        let Json(body) = post_by_path(State(state(10)), Path("a".to_string()))
            .await
            .unwrap();
        assert_eq!(body["title"], "a");

        let err = post_by_query(State(state(10)), params(&[])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = post_by_path(State(state(10)), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_aggregates() {
        let Json(body) = list_tags(State(state(10))).await.unwrap();
        assert_eq!(body, json!({ "tags": [{ "slug": "rust", "name": "Rust" }] }));

        let Json(body) = list_categories(State(state(10))).await.unwrap();
        assert_eq!(body, json!({ "categories": [] }));
    }

    #[tokio::test]
    async fn test_movies_disabled_and_enabled() {
        let err = list_movies(State(state(10))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::from("Heat"));
        let data = SiteData {
            movies: Some(vec![Movie {
                slug: "heat".to_string(),
                sort_date: sort_key(Some("1995-12-15")),
                fields,
            }]),
            ..Default::default()
        };
        let state = Arc::new(ServerState::new(Ok(data), 10));

        let Json(body) = movie_by_query(State(state.clone()), params(&[("slug", "heat")]))
            .await
            .unwrap();
        assert_eq!(body, json!({ "slug": "heat", "title": "Heat" }));

        let err = movie_by_query(State(state), params(&[("slug", "nope")]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500() {
        let state = Arc::new(ServerState::new(Err("disk full".to_string()), 10));
        let err = list_posts(State(state.clone()), params(&[])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "success": false, "error": "Failed to fetch posts", "message": "disk full" })
        );

        // A successful rebuild recovers
        state.replace(Ok(SiteData::default())).await;
        assert!(list_posts(State(state), params(&[])).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_data() {
        let state = state(10);
        state.replace(Err("broken".to_string())).await;
        let Json(body) = list_posts(State(state), params(&[])).await.unwrap();
        assert_eq!(body["pagination"]["totalPosts"], 3);
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ORIGIN, "https://front.test")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_router_routes_and_cors() {
        let (status, headers, body) = send(router(state(2)), get_request("/api/posts?page=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body["posts"][0]["slug"], "a");

        let (status, _, body) = send(router(state(2)), get_request("/api/post/b")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], "b");

        let (status, _, body) = send(router(state(2)), get_request("/api/post?slug=c")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], "c");

        let (status, _, body) = send(router(state(2)), get_request("/api/tags")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tags"][0]["name"], "Rust");
    }

    #[tokio::test]
    async fn test_router_error_bodies() {
        let (status, headers, body) = send(router(state(2)), get_request("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body, json!({ "success": false, "error": "Not found" }));

        let (status, _, body) = send(router(state(2)), get_request("/api/post/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "Post not found" }));

        let (status, _, body) = send(router(state(2)), get_request("/api/post")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing slug parameter");
    }

    #[tokio::test]
    async fn test_router_preflight() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/posts")
            .header(header::ORIGIN, "https://front.test")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let (status, headers, _) = send(router(state(2)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("GET"));
        assert!(methods.contains("OPTIONS"));
    }
}
