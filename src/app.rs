#![cfg(not(tarpaulin_include))]

use axum::{
    Extension, Form, Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;

use crate::catalog::{Answer, Catalog, Problem};
use crate::config::Config;
use crate::error::{AppError, AuthError};
use crate::login::{self, SignupForm, UserCredentials, UserDirectory};
use crate::parser;
use crate::progress::{ProblemId, ProgressRecord, ProgressStore};
use crate::recorder::AttemptReport;
use crate::stats::UserStats;
use crate::storage::{FileStore, KeyValueStore};
use crate::upload::{self, ProblemDraft};

const SESSION_COOKIE: &str = "session";
const STYLESHEET: &str = include_str!("./static/layout.css");

pub type SharedState = Arc<AppState>;

/// Everything the request handlers share
pub struct AppState {
    pub config: Config,
    pub users: UserDirectory,
    pub progress: ProgressStore<Arc<dyn KeyValueStore>>,
    pub catalog: RwLock<Catalog>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: UserDirectory,
        storage: Arc<dyn KeyValueStore>,
        catalog: Catalog,
    ) -> Self {
        Self {
            config,
            users,
            progress: ProgressStore::new(storage),
            catalog: RwLock::new(catalog),
        }
    }

    /// Open the on-disk users file and progress store named by `config`, and
    /// seed the catalog from its problem sheet if one is configured
    pub fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let users = UserDirectory::open(config.users_file())?;
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.progress_dir())?);

        let catalog = match &config.seed_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let catalog: Catalog = parser::parse_problems(&text).into_iter().collect();
                info!("Loaded {} problems from {}", catalog.len(), path.display());
                catalog
            }
            None => Catalog::new(),
        };

        Ok(Self::new(config, users, storage, catalog))
    }
}

/// Id of the user behind an authenticated request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[derive(Deserialize)]
struct AnswerForm {
    answer: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerResponse {
    correct: bool,
    report: AttemptReport,
    stats: UserStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest {
    file_name: String,
    contents: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProblemSummary<'a> {
    id: ProblemId,
    title: &'a str,
    description: &'a str,
    subject: &'a str,
    difficulty: &'static str,
    difficulty_text: &'static str,
    solved: bool,
    correct: bool,
}

/// A problem as shown to the solver, without its answer
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProblemView<'a> {
    id: ProblemId,
    title: &'a str,
    description: &'a str,
    content: &'a str,
    options: &'a [String],
    subject: &'a str,
    difficulty: &'static str,
    difficulty_text: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardData {
    email: String,
    stats: UserStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    email: String,
    stats: UserStats,
    total_problems: usize,
    completion: u32,
    last_updated: DateTime<Utc>,
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/dashboard", get(serve_dashboard))
        .route("/profile", get(serve_profile))
        .route("/problems", get(serve_problems))
        .route("/problems/upload", get(serve_upload_page).post(handle_upload))
        .route("/problems/import", post(handle_import))
        .route("/problems/:id", get(serve_problem).post(handle_answer))
        .route("/api/progress", get(get_progress))
        .route("/api/stats", get(get_stats))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/", get(serve_landing))
        .route("/login", get(serve_login_page).post(handle_login))
        .route("/signup", get(serve_signup_page).post(handle_signup))
        .route("/logout", get(handle_logout).post(handle_logout))
        .merge(protected)
        .with_state(state)
}

/// Start the web server
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::from_config(config)?);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Authentication middleware
///
/// Lets the request through with a [`CurrentUser`] extension if the session
/// cookie is valid, otherwise redirects to the login page.
pub async fn require_auth(jar: CookieJar, mut request: Request, next: Next) -> Response {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        if let Some(user_id) = login::validate_session(session_cookie.value()) {
            request.extensions_mut().insert(CurrentUser(user_id));
            return next.run(request).await;
        }
    }

    Redirect::to("/login").into_response()
}

/// Fill a page template with the shared stylesheet and, if given, the data
/// its script renders from
fn render_page<T: Serialize>(template: &str, data: Option<&T>) -> Result<Html<String>, AppError> {
    let page = template.replace("/*CSS*/", STYLESHEET);

    let Some(data) = data else {
        return Ok(Html(page));
    };

    let json = serde_json::to_string(data)
        .map_err(|e| AppError::Internal(Box::new(e)))?
        .replace("</", "<\\/");
    let script = format!("<script>const PAGE_DATA = {};</script>\n</head>", json);

    Ok(Html(page.replacen("</head>", &script, 1)))
}

fn static_page(template: &str) -> Result<Html<String>, AppError> {
    render_page::<()>(template, None)
}

fn read_catalog(state: &AppState) -> Result<std::sync::RwLockReadGuard<'_, Catalog>, AppError> {
    state
        .catalog
        .read()
        .map_err(|_| AppError::Internal("problem catalog lock poisoned".into()))
}

fn user_email(state: &AppState, user_id: &str) -> Result<String, AppError> {
    Ok(state
        .users
        .find_by_id(user_id)?
        .map(|user| user.email)
        .unwrap_or_default())
}

async fn serve_landing() -> Result<Html<String>, AppError> {
    static_page(include_str!("./static/landing.html"))
}

async fn serve_login_page() -> Result<Html<String>, AppError> {
    static_page(include_str!("./static/login.html"))
}

async fn serve_signup_page() -> Result<Html<String>, AppError> {
    static_page(include_str!("./static/signup.html"))
}

async fn handle_login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Result<Response, AppError> {
    match state
        .users
        .verify_user(&credentials.email, &credentials.password)
    {
        Ok(user) => {
            let session_id = login::create_session(&user.id, state.config.session_lifetime());
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true);
            info!("User {} logged in", user.id);

            Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            let message = AuthError::InvalidCredentials.to_string();
            Ok(Redirect::to(&format!("/login?error={}", urlencoding::encode(&message))).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_signup(
    State(state): State<SharedState>,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, AppError> {
    match state.users.register_user(&form) {
        Ok(_) => Ok(Redirect::to("/login?registered=true")),
        Err(AuthError::Database(message)) => Err(AuthError::Database(message).into()),
        Err(e) => Ok(Redirect::to(&format!(
            "/signup?error={}",
            urlencoding::encode(&e.to_string())
        ))),
    }
}

/// End the session and purge the user's local progress
async fn handle_logout(State(state): State<SharedState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        login::logout(session_cookie.value(), &state.progress);
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    )
}

async fn serve_dashboard(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let data = DashboardData {
        email: user_email(&state, &user_id)?,
        stats: state.progress.stats(&user_id),
    };
    render_page(include_str!("./static/dashboard.html"), Some(&data))
}

async fn serve_profile(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let record = state.progress.load(&user_id);
    let stats = UserStats::from_record(&record);
    let total_problems = read_catalog(&state)?.len();

    let data = ProfileData {
        email: user_email(&state, &user_id)?,
        completion: stats.completion_percent(total_problems),
        stats,
        total_problems,
        last_updated: record.last_updated(),
    };
    render_page(include_str!("./static/profile.html"), Some(&data))
}

async fn serve_problems(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Html<String>, AppError> {
    let record = state.progress.load(&user_id);
    let catalog = read_catalog(&state)?;

    let summaries: Vec<ProblemSummary> = catalog
        .list()
        .map(|problem| ProblemSummary {
            id: problem.id,
            title: &problem.title,
            description: &problem.description,
            subject: &problem.subject,
            difficulty: problem.difficulty.as_str(),
            difficulty_text: problem.difficulty.display_name(),
            solved: record.has_solved(problem.id),
            correct: record.has_correct(problem.id),
        })
        .collect();

    render_page(include_str!("./static/problems.html"), Some(&summaries))
}

async fn serve_problem(
    State(state): State<SharedState>,
    Path(id): Path<ProblemId>,
) -> Result<Html<String>, AppError> {
    let catalog = read_catalog(&state)?;
    let problem = catalog.get(id).ok_or(AppError::ProblemNotFound(id))?;

    let view = ProblemView {
        id: problem.id,
        title: &problem.title,
        description: &problem.description,
        content: &problem.content,
        options: &problem.options,
        subject: &problem.subject,
        difficulty: problem.difficulty.as_str(),
        difficulty_text: problem.difficulty.display_name(),
    };
    render_page(include_str!("./static/problem.html"), Some(&view))
}

/// Grade a submitted answer and record the attempt
///
/// The solution is only revealed once the answer is correct.
async fn handle_answer(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<ProblemId>,
    Form(form): Form<AnswerForm>,
) -> Result<Json<AnswerResponse>, AppError> {
    let (correct, difficulty, solution) = {
        let catalog = read_catalog(&state)?;
        let problem = catalog.get(id).ok_or(AppError::ProblemNotFound(id))?;
        let correct = problem.check(&Answer::from_input(&form.answer));
        (correct, problem.difficulty, problem.solution.clone())
    };

    let (record, report) =
        state
            .progress
            .record_attempt_with_report(&user_id, id, correct, difficulty.as_str());

    Ok(Json(AnswerResponse {
        correct,
        report,
        stats: UserStats::from_record(&record),
        solution: solution.filter(|_| correct),
    }))
}

async fn serve_upload_page() -> Result<Html<String>, AppError> {
    render_page(
        include_str!("./static/upload.html"),
        Some(&ProblemDraft::default()),
    )
}

/// Turn an uploaded file into a draft for the upload form to show
async fn handle_import(Json(request): Json<ImportRequest>) -> Result<Json<ProblemDraft>, AppError> {
    Ok(Json(upload::import_file(&request.file_name, &request.contents)?))
}

/// Validate a draft and add it to the catalog under the next free id
async fn handle_upload(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(draft): Json<ProblemDraft>,
) -> Result<(StatusCode, Json<Problem>), AppError> {
    let mut catalog = state.catalog.write().map_err(|_| {
        error!("Problem catalog lock poisoned");
        AppError::Internal("problem catalog lock poisoned".into())
    })?;

    let problem = draft.into_problem(catalog.next_id()).inspect_err(|e| {
        warn!("Rejected upload from {}: {}", user_id, e);
    })?;
    catalog.insert(problem.clone());
    info!("User {} uploaded problem {}", user_id, problem.id);

    Ok((StatusCode::CREATED, Json(problem)))
}

async fn get_progress(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Json<ProgressRecord> {
    Json(state.progress.load(&user_id))
}

async fn get_stats(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Json<UserStats> {
    Json(state.progress.stats(&user_id))
}
