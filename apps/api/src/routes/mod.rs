pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::admin::handlers as admin;
use crate::analytics::handlers as analytics;
use crate::applications::handlers as applications;
use crate::auth::handlers as auth;
use crate::challenges::handlers as challenges;
use crate::documents::handlers as documents;
use crate::execution::handlers as execution;
use crate::portfolio::handlers as portfolio;
use crate::projects::handlers as projects;
use crate::scout::handlers as scout;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + UPLOAD_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/v1/auth/register", post(auth::handle_register_student))
        .route("/api/v1/auth/login", post(auth::handle_login_student))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .route("/api/v1/auth/profile", put(auth::handle_update_profile))
        .route("/api/v1/auth/badges", get(auth::handle_my_badges))
        .route("/api/v1/recruiters/register", post(auth::handle_register_recruiter))
        .route("/api/v1/recruiters/login", post(auth::handle_login_recruiter))
        .route("/api/v1/recruiters/me", get(auth::handle_recruiter_me))
        // Documents
        .route(
            "/api/v1/documents",
            post(documents::handle_upload_document)
                .get(documents::handle_list_documents)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/documents/:id",
            patch(documents::handle_update_document)
                .delete(documents::handle_delete_document),
        )
        .route("/api/v1/documents/:id/url", get(documents::handle_document_url))
        // Portfolio
        .route("/api/v1/portfolio/share", post(portfolio::handle_create_share_link))
        .route(
            "/api/v1/portfolio/shared/:token",
            get(portfolio::handle_get_shared_portfolio),
        )
        .route("/api/v1/portfolio/:username", get(portfolio::handle_get_portfolio))
        // Job applications
        .route(
            "/api/v1/applications",
            post(applications::handle_create_application)
                .get(applications::handle_list_applications),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application)
                .patch(applications::handle_update_application)
                .delete(applications::handle_delete_application),
        )
        // Recruiters
        .route("/api/v1/scout/search", get(scout::handle_search))
        .route("/api/v1/recruiters/bookmarks", get(scout::handle_list_bookmarks))
        .route(
            "/api/v1/recruiters/bookmarks/:user_id",
            post(scout::handle_add_bookmark).delete(scout::handle_remove_bookmark),
        )
        // Analytics
        .route("/api/v1/analytics/summary", get(analytics::handle_summary))
        // Projects
        .route(
            "/api/v1/projects",
            post(projects::handle_create_project).get(projects::handle_list_projects),
        )
        .route("/api/v1/projects/:id", delete(projects::handle_delete_project))
        // Challenges
        .route("/api/v1/challenges", get(challenges::handle_list_challenges))
        .route("/api/v1/challenges/submit", post(challenges::handle_submit))
        .route(
            "/api/v1/challenges/submissions/mine",
            get(challenges::handle_list_my_submissions),
        )
        .route(
            "/api/v1/challenges/submissions/:id",
            get(challenges::handle_get_submission),
        )
        .route("/api/v1/challenges/:key", get(challenges::handle_get_challenge))
        // Server-side execution
        .route("/api/v1/execute/run", post(execution::handle_run))
        .route("/api/v1/execute/submit", post(execution::handle_verified_submit))
        // Admin
        .route("/api/v1/admin/challenges", post(admin::handle_create_challenge))
        .route("/api/v1/admin/challenges/seed", post(admin::handle_seed_challenges))
        .route("/api/v1/admin/stats", get(admin::handle_platform_stats))
        .with_state(state)
}
