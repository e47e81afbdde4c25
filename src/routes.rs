// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam, result, student},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exams, students, results, leaderboard, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam))
        .layer(auth_layer.clone());

    // Attempt lifecycle
    let student_routes = Router::new()
        .route("/start-exam", post(student::start_exam))
        .route("/submit-exam", post(student::submit_exam))
        .route("/my-attempts", get(student::my_attempts))
        .route("/attempts/{id}", get(student::get_attempt))
        .route("/attempts/{id}/answers", put(student::save_answers))
        .route("/analytics", get(result::student_analytics))
        .layer(auth_layer.clone());

    let result_routes = Router::new()
        .route("/attempt/{id}", get(result::result_by_attempt))
        .route("/attempt/{id}/detailed", get(result::detailed_result))
        .merge(
            Router::new()
                .route("/exam/{id}", get(result::results_by_exam))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(auth_layer.clone());

    let leaderboard_routes = Router::new()
        .route("/", get(result::global_leaderboard))
        .route("/exam/{id}", get(result::exam_leaderboard))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/exams", post(admin::create_exam))
        .route(
            "/exams/{id}",
            put(admin::update_exam).delete(admin::deactivate_exam),
        )
        .route(
            "/exams/{id}/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        // auth_layer is outermost, so Claims exist when admin_middleware runs
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/students", student_routes)
        .nest("/api/results", result_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
