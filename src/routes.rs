use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::card::{card_views, CardView};
use crate::feed::{FeedView, HeadlineRecord, LoadStatus, VoteDirection};
use crate::notifications::{blocked_banner, NotificationBootstrap};
use crate::prefs::{Preferences, Theme};
use crate::weather::WeatherSnapshot;

pub struct AppState {
    pub view: RwLock<FeedView>,
    pub weather: RwLock<Option<WeatherSnapshot>>,
    pub theme: RwLock<Theme>,
    pub prefs: Arc<Preferences>,
    pub notifications: Arc<NotificationBootstrap>,
}

impl AppState {
    pub fn new(
        prefs: Arc<Preferences>,
        notifications: Arc<NotificationBootstrap>,
        theme: Theme,
    ) -> Self {
        Self {
            view: RwLock::new(FeedView::new()),
            weather: RwLock::new(None),
            theme: RwLock::new(theme),
            prefs,
            notifications,
        }
    }
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub dark: bool,
    pub weather: Option<String>,
    pub banner: Option<&'static str>,
    pub categories: Vec<CategoryButton>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_headlines: bool,
    pub cards: Vec<CardView>,
}

pub struct CategoryButton {
    pub name: String,
    pub active: bool,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

/// Derived feed as served to the mobile client.
#[derive(Debug, Serialize)]
pub struct FeedSnapshot {
    pub status: &'static str,
    pub error: Option<String>,
    pub selected_category: String,
    pub categories: Vec<String>,
    pub headlines: Vec<HeadlineRecord>,
    pub weather: Option<WeatherSnapshot>,
    pub theme: &'static str,
    pub notifications_blocked: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/category", post(select_category))
        .route("/vote/:index/:direction", post(vote))
        .route("/theme", post(toggle_theme))
        .route("/api/feed", get(feed_json))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn banner(state: &AppState) -> Option<&'static str> {
    state.notifications.permission().and_then(blocked_banner)
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let dark = state.theme.read().await.is_dark();
    let weather = state.weather.read().await.as_ref().map(|w| w.to_string());

    let view = state.view.read().await;
    let feed = view.feed();
    let selected = feed.selected_category();

    let categories = feed
        .categories()
        .into_iter()
        .map(|name| CategoryButton {
            active: name == selected,
            name: name.to_string(),
        })
        .collect();

    let page = IndexTemplate {
        dark,
        weather,
        banner: banner(&state),
        categories,
        loading: *view.status() == LoadStatus::Loading,
        error: view.status().error_message().map(str::to_string),
        has_headlines: !feed.records().is_empty(),
        cards: card_views(&feed.visible(), Utc::now()),
    };
    HtmlTemplate(page)
}

#[derive(Deserialize)]
pub struct CategoryForm {
    pub category: String,
}

pub async fn select_category(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CategoryForm>,
) -> Redirect {
    info!(category = %form.category, "Category selected");
    state.view.write().await.feed_mut().select_category(form.category);
    Redirect::to("/")
}

pub async fn vote(
    State(state): State<Arc<AppState>>,
    Path((index, direction)): Path<(usize, VoteDirection)>,
) -> Redirect {
    let mut view = state.view.write().await;
    // A stale index after a re-filter is dropped rather than surfaced.
    if let Err(e) = view.feed_mut().vote(index, direction) {
        warn!("Ignoring vote: {}", e);
    }
    Redirect::to("/")
}

pub async fn toggle_theme(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    let theme = state.prefs.toggle_theme().await?;
    *state.theme.write().await = theme;
    info!(%theme, "Theme toggled");
    Ok(Redirect::to("/"))
}

pub async fn feed_json(State(state): State<Arc<AppState>>) -> Json<FeedSnapshot> {
    let theme = *state.theme.read().await;
    let weather = state.weather.read().await.clone();

    let view = state.view.read().await;
    let feed = view.feed();

    Json(FeedSnapshot {
        status: view.status().as_str(),
        error: view.status().error_message().map(str::to_string),
        selected_category: feed.selected_category().to_string(),
        categories: feed.categories().into_iter().map(str::to_string).collect(),
        headlines: feed.visible().into_iter().cloned().collect(),
        weather,
        theme: theme.as_str(),
        notifications_blocked: banner(&state).is_some(),
    })
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{ConfiguredPushSdk, PermissionState};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn create_test_state() -> Arc<AppState> {
        let prefs = Preferences::new("sqlite::memory:").await.unwrap();
        prefs.initialize().await.unwrap();

        Arc::new(AppState::new(
            Arc::new(prefs),
            Arc::new(NotificationBootstrap::new()),
            Theme::Light,
        ))
    }

    async fn create_loaded_state() -> Arc<AppState> {
        let state = create_test_state().await;
        state.view.write().await.complete(Ok(json!([
            {"title": "Alpha story", "link": "https://a.example.com", "source": "Reddit"},
            {"title": "Beta story", "link": "https://b.example.com", "category": "Tech"}
        ])));
        state
    }

    async fn body_string(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    async fn get_page(state: Arc<AppState>, uri: &str) -> Response {
        router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_to(state: Arc<AppState>, uri: &str, form: Option<&str>) -> Response {
        let builder = Request::builder().method("POST").uri(uri);
        let request = match form {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        router(state).oneshot(request).await.unwrap()
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let response = get_page(create_test_state().await, "/health").await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_string(response).await, "OK");
        }
    }

    mod index_tests {
        use super::*;

        #[tokio::test]
        async fn test_index_while_loading() {
            let response = get_page(create_test_state().await, "/").await;

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_string(response).await;
            assert!(body.contains("Loading headlines"));
        }

        #[tokio::test]
        async fn test_index_shows_cards_and_categories() {
            let body = body_string(get_page(create_loaded_state().await, "/").await).await;

            assert!(body.contains("Alpha story"));
            assert!(body.contains("Beta story"));
            assert!(body.contains("General"));
            assert!(body.contains("Tech"));
            assert!(body.contains("just now"));
            assert!(body.contains("👽"));
        }

        #[tokio::test]
        async fn test_index_failed_fetch() {
            let state = create_test_state().await;
            state.view.write().await.complete(Ok(json!({"not": "a list"})));

            let body = body_string(get_page(state, "/").await).await;
            assert!(body.contains("Failed to load trending news."));
        }

        #[tokio::test]
        async fn test_index_empty_feed() {
            let state = create_test_state().await;
            state.view.write().await.complete(Ok(json!([])));

            let body = body_string(get_page(state, "/").await).await;
            assert!(body.contains("No headlines available."));
        }

        #[tokio::test]
        async fn test_index_banner_when_denied() {
            let state = create_loaded_state().await;
            state
                .notifications
                .ensure_initialized(&ConfiguredPushSdk::new(PermissionState::Denied), "app");

            let body = body_string(get_page(state, "/").await).await;
            assert!(body.contains("Notifications are blocked"));
        }

        #[tokio::test]
        async fn test_index_without_banner_by_default() {
            let body = body_string(get_page(create_loaded_state().await, "/").await).await;
            assert!(!body.contains("Notifications are blocked"));
        }

        #[tokio::test]
        async fn test_index_weather_line() {
            let state = create_loaded_state().await;
            *state.weather.write().await = Some(WeatherSnapshot {
                location: "Berlin".into(),
                temperature: "18".into(),
                condition: "Sunny".into(),
                local_time: "09:00:00".into(),
            });

            let body = body_string(get_page(state, "/").await).await;
            assert!(body.contains("Berlin"));
            assert!(body.contains("18°C, Sunny"));
        }
    }

    mod category_tests {
        use super::*;

        #[tokio::test]
        async fn test_select_category_redirects_and_filters() {
            let state = create_loaded_state().await;

            let response = post_to(state.clone(), "/category", Some("category=Tech")).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], "/");

            let body = body_string(get_page(state, "/").await).await;
            assert!(body.contains("Beta story"));
            assert!(!body.contains("Alpha story"));
        }

        #[tokio::test]
        async fn test_select_unknown_category_shows_nothing() {
            let state = create_loaded_state().await;
            post_to(state.clone(), "/category", Some("category=Sports")).await;

            let view = state.view.read().await;
            assert_eq!(view.feed().selected_category(), "Sports");
            assert!(view.feed().visible().is_empty());
        }
    }

    mod vote_tests {
        use super::*;

        #[tokio::test]
        async fn test_vote_up_on_filtered_list() {
            let state = create_loaded_state().await;
            post_to(state.clone(), "/category", Some("category=Tech")).await;

            let response = post_to(state.clone(), "/vote/0/up", None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);

            let view = state.view.read().await;
            assert_eq!(view.feed().records()[1].upvotes, 1);
            assert_eq!(view.feed().records()[0].upvotes, 0);
        }

        #[tokio::test]
        async fn test_vote_down() {
            let state = create_loaded_state().await;
            post_to(state.clone(), "/vote/0/down", None).await;

            let view = state.view.read().await;
            assert_eq!(view.feed().records()[0].downvotes, 1);
        }

        #[tokio::test]
        async fn test_stale_vote_index_is_ignored() {
            let state = create_loaded_state().await;
            let before = state.view.read().await.feed().clone();

            let response = post_to(state.clone(), "/vote/7/up", None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(state.view.read().await.feed(), &before);
        }

        #[tokio::test]
        async fn test_unknown_direction_rejected() {
            let state = create_loaded_state().await;
            let response = post_to(state, "/vote/0/sideways", None).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    mod theme_tests {
        use super::*;

        #[tokio::test]
        async fn test_toggle_theme_persists() {
            let state = create_loaded_state().await;

            let response = post_to(state.clone(), "/theme", None).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(*state.theme.read().await, Theme::Dark);
            assert_eq!(state.prefs.theme().await.unwrap(), Theme::Dark);

            let body = body_string(get_page(state.clone(), "/").await).await;
            assert!(body.contains(r#"<html lang="en" class="dark">"#));

            post_to(state.clone(), "/theme", None).await;
            assert_eq!(state.prefs.theme().await.unwrap(), Theme::Light);
        }
    }

    mod api_tests {
        use super::*;

        #[tokio::test]
        async fn test_feed_json() {
            let response = get_page(create_loaded_state().await, "/api/feed").await;
            assert_eq!(response.status(), StatusCode::OK);

            let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
            assert_eq!(json["status"], "ready");
            assert_eq!(json["selected_category"], "All");
            assert_eq!(json["categories"], json!(["All", "General", "Tech"]));
            assert_eq!(json["headlines"].as_array().unwrap().len(), 2);
            assert_eq!(json["headlines"][0]["source"], "Reddit");
            assert_eq!(json["headlines"][1]["source"], "Unknown");
            assert_eq!(json["headlines"][0]["upvotes"], 0);
            assert_eq!(json["theme"], "light");
            assert_eq!(json["notifications_blocked"], false);
        }

        #[tokio::test]
        async fn test_feed_json_failed() {
            let state = create_test_state().await;
            state.view.write().await.complete(Ok(json!("nope")));

            let json: Value =
                serde_json::from_str(&body_string(get_page(state, "/api/feed").await).await)
                    .unwrap();
            assert_eq!(json["status"], "failed");
            assert_eq!(json["error"], "Failed to load trending news.");
            assert_eq!(json["headlines"], json!([]));
        }

        #[test]
        fn test_category_form_parsing() {
            let form: CategoryForm = serde_urlencoded::from_str("category=Hacker+News").unwrap();
            assert_eq!(form.category, "Hacker News");
        }
    }
}
