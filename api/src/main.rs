// ./api/src/main.rs
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::{get, post},
};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Import application layer contracts and DTOs
use application::{
    ApplicationError, CourseIdsRequest, CourseRepository, HealthResponse, Insertion, Repository,
    StudentQuery, StudentRepository,
};
// Import domain types used directly in API
use domain::{Course, CourseFilter, Student, StudentFilter};
// Import infrastructure layer implementations
use infrastructure::seed::{sample_courses, sample_students};
use infrastructure::singleton;

/// Repositories shared by every request handler.
#[derive(Clone)]
struct AppState {
    students: Arc<dyn StudentRepository>,
    courses: Arc<dyn CourseRepository>,
}

const DEFAULT_PORT: u16 = 3000;

// Application entry point
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    // --- Configuration ---
    let port = parse_port(env::var("PORT").ok().as_deref());
    let seed_sample_data = parse_seed_flag(env::var("SEED_SAMPLE_DATA").ok().as_deref());

    // --- Dependency Injection ---
    // The process-wide stores are created here, seeded on first access.
    let students = singleton::students(seed_sample_data.then(sample_students));
    let courses = singleton::courses(seed_sample_data.then(sample_courses));
    info!(seeded = seed_sample_data, "In-memory repositories initialized.");

    let app_state = AppState { students, courses };
    let app = build_router(app_state);
    info!("API routes configured.");

    // --- Server Startup ---
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server starting on {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        // Student Endpoints
        .route("/students", get(list_students_handler).post(create_student_handler))
        .route(
            "/students/:id",
            get(get_student_handler)
                .put(update_student_handler)
                .delete(delete_student_handler),
        )
        .route("/students/by-email/:email", get(get_student_by_email_handler))
        .route(
            "/students/:id/courses",
            post(register_courses_handler).delete(drop_courses_handler),
        )
        // Course Endpoints
        .route("/courses", get(list_courses_handler).post(create_course_handler))
        .route(
            "/courses/:id",
            get(get_course_handler)
                .put(update_course_handler)
                .delete(delete_course_handler),
        )
        .with_state(app_state)
}

// --- Configuration ---

fn parse_port(raw: Option<&str>) -> u16 {
    match raw {
        Some(port_str) => match u16::from_str(port_str) {
            Ok(port_num) => {
                info!("Using port {} from environment variable PORT.", port_num);
                port_num
            }
            Err(_) => {
                warn!(
                    "Invalid PORT value '{}' in environment variable. Using default port {}.",
                    port_str, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        },
        None => {
            info!(
                "PORT environment variable not set. Using default port {}.",
                DEFAULT_PORT
            );
            DEFAULT_PORT
        }
    }
}

/// Sample data is loaded unless SEED_SAMPLE_DATA says otherwise.
fn parse_seed_flag(raw: Option<&str>) -> bool {
    let Some(value) = raw else {
        return true;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            warn!("Invalid SEED_SAMPLE_DATA value '{}'. Seeding sample data.", other);
            true
        }
    }
}

// --- API Handlers ---

async fn root() -> &'static str {
    "Hello World!"
}

async fn health_check(State(state): State<AppState>) -> Response {
    info!("Health check endpoint called");
    let counts = tokio::join!(state.students.count(), state.courses.count());
    match counts {
        (Ok(students), Ok(courses)) => (
            StatusCode::OK,
            JsonResponse(HealthResponse {
                status: "OK",
                students,
                courses,
            }),
        )
            .into_response(),
        (Err(e), _) | (_, Err(e)) => {
            error!("Health check failed: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Maps the outcome of an add to 201 Created or 200 OK when the id already existed.
fn insertion_response<T: serde::Serialize>(outcome: Insertion<T>) -> Response {
    let status = if outcome.was_inserted() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, JsonResponse(outcome.into_inner())).into_response()
}

// --- Student Handlers ---

/// Handler for filtering students (GET /students?firstName=..&courses=a,b).
async fn list_students_handler(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Response {
    info!(?query, "Received request to list students");
    let filter: StudentFilter = query.into();
    match state.students.find(&filter).await {
        Ok(students) => (StatusCode::OK, JsonResponse(students)).into_response(),
        Err(e) => {
            error!("Failed to list students via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for adding a student (POST /students).
async fn create_student_handler(
    State(state): State<AppState>,
    Json(payload): Json<Student>,
) -> Response {
    info!(student_id = %payload.id, "Received request to add student");
    match state.students.add(payload).await {
        Ok(outcome) => {
            if !outcome.was_inserted() {
                warn!("Student id already present, nothing stored");
            }
            insertion_response(outcome)
        }
        Err(e) => {
            error!("Failed to add student via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for getting a student (GET /students/:id).
async fn get_student_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(student_id = %id, "Received request to get student");
    match state.students.get(&id).await {
        Ok(student) => (StatusCode::OK, JsonResponse(student)).into_response(),
        Err(e) => {
            warn!(student_id = %id, "Failed to get student via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for getting a student by email (GET /students/by-email/:email).
async fn get_student_by_email_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Response {
    info!(email = %email, "Received request to get student by email");
    match state.students.get_by_email(&email).await {
        Ok(student) => (StatusCode::OK, JsonResponse(student)).into_response(),
        Err(e) => {
            warn!(email = %email, "Failed to get student by email via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for replacing a student (PUT /students/:id).
async fn update_student_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Student>,
) -> Response {
    info!(student_id = %id, "Received request to update student");
    match state.students.update(&id, payload).await {
        Ok(student) => (StatusCode::OK, JsonResponse(student)).into_response(),
        Err(e) => {
            warn!(student_id = %id, "Failed to update student via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for removing a student (DELETE /students/:id). Returns the removed record.
async fn delete_student_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(student_id = %id, "Received request to remove student");
    match state.students.remove(&id).await {
        Ok(student) => (StatusCode::OK, JsonResponse(student)).into_response(),
        Err(e) => {
            warn!(student_id = %id, "Failed to remove student via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for registering a student in courses (POST /students/:id/courses).
async fn register_courses_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CourseIdsRequest>,
) -> Response {
    info!(student_id = %id, courses = ?payload.course_ids, "Received request to register courses");
    match state.students.register(&id, &payload.course_ids).await {
        Ok(student) => (StatusCode::OK, JsonResponse(student)).into_response(),
        Err(e) => {
            warn!(student_id = %id, "Failed to register courses via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Handler for dropping courses (DELETE /students/:id/courses).
async fn drop_courses_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CourseIdsRequest>,
) -> Response {
    info!(student_id = %id, courses = ?payload.course_ids, "Received request to drop courses");
    match state.students.drop_courses(&id, &payload.course_ids).await {
        Ok(student) => (StatusCode::OK, JsonResponse(student)).into_response(),
        Err(e) => {
            warn!(student_id = %id, "Failed to drop courses via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

// --- Course Handlers ---

/// Handler for filtering courses (GET /courses?id=..&courseName=..).
async fn list_courses_handler(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> Response {
    info!(?filter, "Received request to list courses");
    match state.courses.find(&filter).await {
        Ok(courses) => (StatusCode::OK, JsonResponse(courses)).into_response(),
        Err(e) => {
            error!("Failed to list courses via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn create_course_handler(
    State(state): State<AppState>,
    Json(payload): Json<Course>,
) -> Response {
    info!(course_id = %payload.id, "Received request to add course");
    match state.courses.add(payload).await {
        Ok(outcome) => {
            if !outcome.was_inserted() {
                warn!("Course id already present, nothing stored");
            }
            insertion_response(outcome)
        }
        Err(e) => {
            error!("Failed to add course via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn get_course_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(course_id = %id, "Received request to get course");
    match state.courses.get(&id).await {
        Ok(course) => (StatusCode::OK, JsonResponse(course)).into_response(),
        Err(e) => {
            warn!(course_id = %id, "Failed to get course via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn update_course_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Course>,
) -> Response {
    info!(course_id = %id, "Received request to update course");
    match state.courses.update(&id, payload).await {
        Ok(course) => (StatusCode::OK, JsonResponse(course)).into_response(),
        Err(e) => {
            warn!(course_id = %id, "Failed to update course via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

async fn delete_course_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    info!(course_id = %id, "Received request to remove course");
    match state.courses.remove(&id).await {
        Ok(course) => (StatusCode::OK, JsonResponse(course)).into_response(),
        Err(e) => {
            warn!(course_id = %id, "Failed to remove course via handler: {}", e);
            map_application_error_to_response(e)
        }
    }
}

/// Helper function to map ApplicationError enum to HTTP status codes and response body.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::NotFound { entity, key } => (
            StatusCode::NOT_FOUND,
            format!("No {} found for '{}'", entity, key),
        ),
        ApplicationError::Conflict { entity, key } => (
            StatusCode::CONFLICT,
            format!("A {} with id '{}' already exists", entity, key),
        ),
    };
    (status, body).into_response()
}
