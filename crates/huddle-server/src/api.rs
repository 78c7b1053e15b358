//! The JSON REST surface.
//!
//! Every handler does the same three things: resolve the acting user from
//! the bearer session token, take the database lock, and invoke exactly one
//! domain operation.  Serializing mutations behind the single [`Database`]
//! lock is what makes each request an atomic load-mutate-save cycle; no
//! business rule lives in this layer.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use huddle_core::content::{NewPost, PostDetail, PostPage};
use huddle_core::membership::{GroupView, NewGroup};
use huddle_core::pool::{PoolSetup, PoolView};
use huddle_core::{accounts, content, membership, pool};
use huddle_shared::{GroupId, UserId};
use huddle_store::{Comment, Contribution, Database, Group, Pool, Post, User};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::sessions::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub sessions: SessionRegistry,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/me/profile", post(update_profile))
        .route("/me/rename", post(rename))
        .route("/groups", get(my_groups))
        .route("/groups", post(create_group))
        .route("/groups/{group_id}", get(group_view))
        .route("/groups/{group_id}", delete(delete_group))
        .route("/groups/{group_id}/invites", post(generate_invite))
        .route("/join", post(request_join))
        .route(
            "/groups/{group_id}/requests/{user_id}/approve",
            post(approve_request),
        )
        .route(
            "/groups/{group_id}/requests/{user_id}/deny",
            post(deny_request),
        )
        .route("/groups/{group_id}/leave", post(leave_group))
        .route("/groups/{group_id}/kick", post(kick_member))
        .route("/groups/{group_id}/posts", get(list_posts))
        .route("/groups/{group_id}/posts", post(create_post))
        .route("/groups/{group_id}/posts/{index}", get(get_post))
        .route("/groups/{group_id}/posts/{index}", delete(delete_post))
        .route("/groups/{group_id}/posts/{index}/comments", post(add_comment))
        .route("/groups/{group_id}/pool", get(pool_view))
        .route("/groups/{group_id}/pool", post(setup_pool))
        .route("/groups/{group_id}/pool/contributions", post(contribute))
        .route(
            "/groups/{group_id}/pool/contributions/{index}/approve",
            post(approve_contribution),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    registration_open: bool,
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    #[serde(default)]
    display_name: String,
    credential: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    credential: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct ProfileRequest {
    display_name: Option<String>,
    avatar_ref: Option<String>,
    new_credential: Option<String>,
}

#[derive(Deserialize)]
struct RenameRequest {
    new_username: String,
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_ref: String,
}

#[derive(Serialize)]
struct CreateGroupResponse {
    group: Group,
    invite_code: String,
}

#[derive(Serialize)]
struct InviteResponse {
    invite_code: String,
}

#[derive(Deserialize)]
struct JoinRequest {
    invite_code: String,
}

#[derive(Serialize)]
struct JoinResponse {
    group: Group,
    status: &'static str,
}

#[derive(Deserialize)]
struct DeleteGroupRequest {
    confirm_credential: String,
}

#[derive(Deserialize)]
struct KickRequest {
    user_id: Uuid,
}

#[derive(Serialize)]
struct GroupViewResponse {
    group: Group,
    members: Vec<UserId>,
    requests: Vec<UserId>,
    invite_codes: Vec<String>,
}

#[derive(Deserialize)]
struct PageParams {
    #[serde(default = "default_page")]
    page: u64,
}

fn default_page() -> u64 {
    1
}

#[derive(Serialize)]
struct PostPageResponse {
    posts: Vec<Post>,
    total: u64,
    page: u64,
    page_size: u64,
}

#[derive(Deserialize)]
struct CreatePostRequest {
    title: String,
    description: String,
    #[serde(default)]
    image_refs: Vec<String>,
}

#[derive(Serialize)]
struct PostDetailResponse {
    post: Post,
    comments: Vec<Comment>,
}

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Deserialize)]
struct SetupPoolRequest {
    name: String,
    target: f64,
}

#[derive(Serialize)]
struct SetupPoolResponse {
    pool: &'static str,
}

#[derive(Deserialize)]
struct ContributeRequest {
    amount: f64,
}

#[derive(Deserialize)]
struct ApproveContributionRequest {
    corrected_amount: Option<f64>,
}

#[derive(Serialize)]
struct PoolViewResponse {
    pool: Pool,
    contributions: Vec<Contribution>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        registration_open: state.config.registration_open,
    })
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<User>, ApiError> {
    if !state.config.registration_open {
        return Err(ApiError::RegistrationClosed);
    }
    let mut db = state.db.lock().await;
    let user = accounts::register(&mut db, &req.username, &req.display_name, &req.credential)?;
    Ok(Json(user))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = {
        let db = state.db.lock().await;
        accounts::authenticate(&db, &req.username, &req.credential)?
    };
    let token = state.sessions.issue(user.id).await;

    info!(user_id = %user.id, "session issued");
    Ok(Json(LoginResponse { token, user }))
}

async fn logout(headers: HeaderMap, State(state): State<AppState>) -> Json<serde_json::Value> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    Json(serde_json::json!({ "logged_out": true }))
}

async fn me(headers: HeaderMap, State(state): State<AppState>) -> Result<Json<User>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let db = state.db.lock().await;
    let user = db.get_user(actor).map_err(huddle_core::DomainError::from)?;
    Ok(Json(user))
}

async fn update_profile(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let user = accounts::update_profile(
        &mut db,
        actor,
        accounts::ProfileUpdate {
            display_name: req.display_name,
            avatar_ref: req.avatar_ref,
            new_credential: req.new_credential,
        },
    )?;
    Ok(Json(user))
}

async fn rename(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<User>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let user = accounts::rename(&mut db, actor, &req.new_username)?;
    Ok(Json(user))
}

async fn my_groups(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let db = state.db.lock().await;
    Ok(Json(membership::my_groups(&db, actor)?))
}

async fn create_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<CreateGroupResponse>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let (group, code) = membership::create_group(
        &mut db,
        actor,
        NewGroup {
            name: req.name,
            description: req.description,
            image_ref: req.image_ref,
        },
    )?;
    Ok(Json(CreateGroupResponse {
        group,
        invite_code: code.to_string(),
    }))
}

async fn group_view(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupViewResponse>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let db = state.db.lock().await;
    let GroupView {
        group,
        members,
        requests,
        invite_codes,
    } = membership::group_view(&db, GroupId(group_id), actor)?;
    Ok(Json(GroupViewResponse {
        group,
        members,
        requests,
        invite_codes,
    }))
}

async fn delete_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<DeleteGroupRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    membership::delete_group(&mut db, GroupId(group_id), actor, &req.confirm_credential)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn generate_invite(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<InviteResponse>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let code = membership::generate_invite(&mut db, GroupId(group_id), actor)?;
    Ok(Json(InviteResponse {
        invite_code: code.to_string(),
    }))
}

async fn request_join(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let group = membership::request_join(&mut db, &req.invite_code, actor)?;
    Ok(Json(JoinResponse {
        group,
        status: "pending",
    }))
}

async fn approve_request(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    membership::approve_request(&mut db, GroupId(group_id), actor, UserId(user_id))?;
    Ok(Json(serde_json::json!({ "approved": true })))
}

async fn deny_request(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    membership::deny_request(&mut db, GroupId(group_id), actor, UserId(user_id))?;
    Ok(Json(serde_json::json!({ "denied": true })))
}

async fn leave_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    membership::leave_group(&mut db, GroupId(group_id), actor)?;
    Ok(Json(serde_json::json!({ "left": true })))
}

async fn kick_member(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<KickRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    membership::kick_member(&mut db, GroupId(group_id), actor, UserId(req.user_id))?;
    Ok(Json(serde_json::json!({ "kicked": true })))
}

async fn list_posts(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<PostPageResponse>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let page_size = state.config.page_size;
    let db = state.db.lock().await;

    // The feed is members-only, same as the group screen.
    membership::group_view(&db, GroupId(group_id), actor)?;

    let PostPage { posts, total } =
        content::list_posts(&db, GroupId(group_id), params.page, page_size)?;
    Ok(Json(PostPageResponse {
        posts,
        total,
        page: params.page.max(1),
        page_size,
    }))
}

async fn create_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let post = content::create_post(
        &mut db,
        GroupId(group_id),
        actor,
        NewPost {
            title: req.title,
            description: req.description,
            image_refs: req.image_refs,
        },
    )?;
    Ok(Json(post))
}

async fn get_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((group_id, index)): Path<(Uuid, u64)>,
) -> Result<Json<PostDetailResponse>, ApiError> {
    authed(&headers, &state).await?;
    let db = state.db.lock().await;
    let PostDetail { post, comments } = content::get_post(&db, GroupId(group_id), index)?;
    Ok(Json(PostDetailResponse { post, comments }))
}

async fn delete_post(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((group_id, index)): Path<(Uuid, u64)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    content::delete_post(&mut db, GroupId(group_id), actor, index)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn add_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((group_id, index)): Path<(Uuid, u64)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let comment = content::add_comment(
        &mut db,
        GroupId(group_id),
        index,
        actor,
        &req.content,
        req.anonymous,
    )?;
    Ok(Json(comment))
}

async fn pool_view(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Option<PoolViewResponse>>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let db = state.db.lock().await;

    membership::group_view(&db, GroupId(group_id), actor)?;

    let view = pool::pool_view(&db, GroupId(group_id))?;
    Ok(Json(view.map(|PoolView { pool, contributions }| {
        PoolViewResponse {
            pool,
            contributions,
        }
    })))
}

async fn setup_pool(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<SetupPoolRequest>,
) -> Result<Json<SetupPoolResponse>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let outcome = pool::setup_pool(&mut db, GroupId(group_id), actor, &req.name, req.target)?;
    Ok(Json(SetupPoolResponse {
        pool: match outcome {
            PoolSetup::Created => "created",
            PoolSetup::Replaced => "replaced",
        },
    }))
}

async fn contribute(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<ContributeRequest>,
) -> Result<Json<Contribution>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let entry = pool::contribute(&mut db, GroupId(group_id), actor, req.amount)?;
    Ok(Json(entry))
}

async fn approve_contribution(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((group_id, index)): Path<(Uuid, u64)>,
    Json(req): Json<ApproveContributionRequest>,
) -> Result<Json<Contribution>, ApiError> {
    let actor = authed(&headers, &state).await?;
    let mut db = state.db.lock().await;
    let entry = pool::approve_contribution(
        &mut db,
        GroupId(group_id),
        actor,
        index,
        req.corrected_amount,
    )?;
    Ok(Json(entry))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    Some(auth.strip_prefix("Bearer ").unwrap_or(auth))
}

/// Resolve the acting user from the request's bearer session token.
async fn authed(headers: &HeaderMap, state: &AppState) -> Result<UserId, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::NotLoggedIn)?;
    state
        .sessions
        .resolve(token)
        .await
        .ok_or(ApiError::NotLoggedIn)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
