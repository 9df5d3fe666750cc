use super::SharedState;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::webhook::payment_webhook;
use crate::application::booking::PaymentSession;
use crate::application::catalog::ActivityFilter;
use crate::application::moderation::{ActionRequest, ReportSubject};
use crate::application::session::Actor;
use crate::domain::activity::{Activity, ActivityDraft, Dashboard, Progress, ProgressStatus};
use crate::domain::ad::{AdDraft, AdPerformance, SupplierAd};
use crate::domain::booking::{Booking, BookingRequest, Payment};
use crate::domain::message::Message;
use crate::domain::moderation::{
    Appeal, AppealStatus, ModerationAction, Report, ReportReason, ReportStatus, Suspension,
};
use crate::domain::post::Post;
use crate::domain::{ActionId, ActivityId, AdId, BookingId, UserId};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

type ApiResult<T> = Result<T, ApiError>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub score: u8,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Deserialize)]
pub struct ProgressRequest {
    pub status: ProgressStatus,
    #[serde(default)]
    pub percent: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub activity_id: ActivityId,
    pub content: String,
    #[serde(default)]
    pub progress: Option<u8>,
}

#[derive(Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub target: ReportSubject,
    pub reason: ReportReason,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub status: Option<ReportStatus>,
}

#[derive(Deserialize)]
pub struct CreateAppealRequest {
    pub action_id: ActionId,
    pub message: String,
}

#[derive(Deserialize)]
pub struct AppealQuery {
    pub status: Option<AppealStatus>,
}

#[derive(Deserialize)]
pub struct AppealDecisionRequest {
    pub approve: bool,
    #[serde(default)]
    pub response: Option<String>,
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/me", get(me))
        .route("/api/me/progress", get(my_progress))
        .route("/api/me/dashboard", get(my_dashboard))
        .route("/api/activities", get(list_activities).post(submit_activity))
        .route("/api/activities/{id}", get(get_activity))
        .route("/api/activities/{id}/review", post(review_activity))
        .route("/api/activities/{id}/ratings", post(rate_activity))
        .route("/api/activities/{id}/progress", put(set_progress))
        .route("/api/activities/{id}/ads", get(ads_for_activity))
        .route("/api/posts", get(feed).post(create_post))
        .route("/api/users/{id}/posts", get(user_posts))
        .route("/api/users/{id}/suspension", get(user_suspension))
        .route("/api/ads", post(create_ad))
        .route("/api/ads/performance", get(ad_performance))
        .route("/api/ads/{id}", get(get_ad))
        .route("/api/ads/{id}/click", post(click_ad))
        .route("/api/ads/{id}/active", put(set_ad_active))
        .route("/api/bookings", get(my_bookings).post(create_booking))
        .route("/api/bookings/{id}", get(get_booking))
        .route("/api/bookings/{id}/pay", post(start_payment))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
        .route("/api/bookings/{id}/payments", get(booking_payments))
        .route("/api/webhooks/payments", post(payment_webhook))
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/moderation/actions", post(take_action))
        .route("/api/appeals", get(list_appeals).post(create_appeal))
        .route("/api/appeals/{id}/review", post(review_appeal))
        .route("/api/messages", get(inbox))
        .route("/api/messages/{id}/read", post(mark_read))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn me(actor: Actor) -> Json<Actor> {
    Json(actor)
}

// ── Activities ────────────────────────────────────────────────────────

async fn list_activities(
    State(state): State<SharedState>,
    ApiQuery(filter): ApiQuery<ActivityFilter>,
) -> ApiResult<Json<Vec<Activity>>> {
    Ok(Json(state.services.catalog.list(&filter).await?))
}

async fn submit_activity(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(draft): ApiJson<ActivityDraft>,
) -> ApiResult<impl IntoResponse> {
    let activity = state.services.catalog.submit(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn get_activity(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<ActivityId>,
) -> ApiResult<Json<Activity>> {
    Ok(Json(state.services.catalog.get(&actor, id).await?))
}

async fn review_activity(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<ActivityId>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> ApiResult<Json<Activity>> {
    Ok(Json(state.services.catalog.review(&actor, id, req.approve).await?))
}

async fn rate_activity(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<ActivityId>,
    ApiJson(req): ApiJson<RateRequest>,
) -> ApiResult<Json<Activity>> {
    Ok(Json(state.services.catalog.rate(&actor, id, req.score, req.review).await?))
}

async fn set_progress(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<ActivityId>,
    ApiJson(req): ApiJson<ProgressRequest>,
) -> ApiResult<Json<Progress>> {
    let progress = state
        .services
        .catalog
        .set_progress(&actor, id, req.status, req.percent, req.notes)
        .await?;
    Ok(Json(progress))
}

async fn my_progress(State(state): State<SharedState>, actor: Actor) -> Json<Vec<Progress>> {
    Json(state.services.catalog.progress_for(actor.user_id).await)
}

async fn my_dashboard(State(state): State<SharedState>, actor: Actor) -> Json<Dashboard> {
    Json(state.services.catalog.dashboard(actor.user_id).await)
}

// ── Feed ──────────────────────────────────────────────────────────────

async fn feed(State(state): State<SharedState>, ApiQuery(query): ApiQuery<LimitQuery>) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(state.services.feed.feed(query.limit).await?))
}

async fn create_post(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .services
        .feed
        .create(&actor, req.activity_id, &req.content, req.progress)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn user_posts(State(state): State<SharedState>, ApiPath(id): ApiPath<UserId>) -> ApiResult<Json<Vec<Post>>> {
    Ok(Json(state.services.feed.by_user(id).await?))
}

// ── Ads ───────────────────────────────────────────────────────────────

async fn create_ad(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(draft): ApiJson<AdDraft>,
) -> ApiResult<impl IntoResponse> {
    let ad = state.services.ads.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(ad)))
}

async fn ads_for_activity(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<ActivityId>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Vec<SupplierAd>>> {
    Ok(Json(state.services.ads.serve_for_activity(id, query.limit).await?))
}

async fn get_ad(State(state): State<SharedState>, ApiPath(id): ApiPath<AdId>) -> ApiResult<Json<SupplierAd>> {
    Ok(Json(state.services.ads.get(id).await?))
}

async fn click_ad(State(state): State<SharedState>, ApiPath(id): ApiPath<AdId>) -> ApiResult<Json<SupplierAd>> {
    Ok(Json(state.services.ads.record_click(id).await?))
}

async fn set_ad_active(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<AdId>,
    ApiJson(req): ApiJson<ActiveRequest>,
) -> ApiResult<Json<SupplierAd>> {
    Ok(Json(state.services.ads.set_active(&actor, id, req.active).await?))
}

async fn ad_performance(State(state): State<SharedState>, actor: Actor) -> ApiResult<Json<Vec<AdPerformance>>> {
    actor.require_admin()?;
    Ok(Json(state.services.ads.performance().await?))
}

// ── Bookings ──────────────────────────────────────────────────────────

async fn create_booking(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(req): ApiJson<BookingRequest>,
) -> ApiResult<impl IntoResponse> {
    let booking = state.services.bookings.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn my_bookings(State(state): State<SharedState>, actor: Actor) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(state.services.bookings.for_user(&actor).await?))
}

async fn get_booking(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<BookingId>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.services.bookings.get(&actor, id).await?))
}

async fn start_payment(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<BookingId>,
) -> ApiResult<Json<PaymentSession>> {
    Ok(Json(state.services.bookings.start_payment(&actor, id).await?))
}

async fn cancel_booking(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<BookingId>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.services.bookings.cancel(&actor, id).await?))
}

async fn booking_payments(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<BookingId>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.services.bookings.payments(&actor, id).await?))
}

// ── Moderation ────────────────────────────────────────────────────────

async fn create_report(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let report = state
        .services
        .moderation
        .report(&actor, req.target, req.reason, req.details)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn list_reports(
    State(state): State<SharedState>,
    actor: Actor,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<Report>>> {
    Ok(Json(state.services.moderation.reports(&actor, query.status).await?))
}

async fn take_action(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(req): ApiJson<ActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let action: ModerationAction = state.services.moderation.act(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn create_appeal(
    State(state): State<SharedState>,
    actor: Actor,
    ApiJson(req): ApiJson<CreateAppealRequest>,
) -> ApiResult<impl IntoResponse> {
    let appeal = state
        .services
        .moderation
        .appeal(&actor, req.action_id, &req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(appeal)))
}

async fn list_appeals(
    State(state): State<SharedState>,
    actor: Actor,
    ApiQuery(query): ApiQuery<AppealQuery>,
) -> ApiResult<Json<Vec<Appeal>>> {
    Ok(Json(state.services.moderation.appeals(&actor, query.status).await?))
}

async fn review_appeal(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AppealDecisionRequest>,
) -> ApiResult<Json<Appeal>> {
    let appeal = state
        .services
        .moderation
        .review_appeal(&actor, id, req.approve, req.response)
        .await?;
    Ok(Json(appeal))
}

async fn user_suspension(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<Json<Option<Suspension>>> {
    if actor.user_id != Some(id) {
        actor.require_moderator()?;
    }
    Ok(Json(state.services.moderation.active_suspension(id).await?))
}

// ── Messages ──────────────────────────────────────────────────────────

async fn inbox(State(state): State<SharedState>, actor: Actor) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(state.services.messages.inbox(&actor).await?))
}

async fn mark_read(
    State(state): State<SharedState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Message>> {
    Ok(Json(state.services.messages.mark_read(&actor, id).await?))
}
