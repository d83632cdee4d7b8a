use async_trait::async_trait;
use domain::{Course, Entity, Student, StudentFilter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Application Errors ---
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// No row matched the given identifier (an id, or an email for lookups by email).
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    /// Another row already holds the identifier the write would store under.
    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },
}

impl ApplicationError {
    pub fn not_found<T: Entity>(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: T::KIND,
            key: key.into(),
        }
    }

    pub fn conflict<T: Entity>(key: impl Into<String>) -> Self {
        Self::Conflict {
            entity: T::KIND,
            key: key.into(),
        }
    }
}

// --- Repository Interfaces (Traits) ---

/// Outcome of [`Repository::add`]. Both variants hand the input entity back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion<T> {
    /// The entity was appended to the store.
    Inserted(T),
    /// A row with the same id already existed; the store was left untouched.
    AlreadyPresent(T),
}

impl<T> Insertion<T> {
    pub fn was_inserted(&self) -> bool {
        matches!(self, Insertion::Inserted(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Insertion::Inserted(entity) | Insertion::AlreadyPresent(entity) => entity,
        }
    }
}

/// CRUD contract shared by every entity store.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Appends the entity unless a row with the same id exists.
    async fn add(&self, entity: T) -> Result<Insertion<T>, ApplicationError>;
    /// Retrieves the row with the given id.
    async fn get(&self, id: &str) -> Result<T, ApplicationError>;
    /// Returns every row matching the filter, in storage order.
    async fn find(&self, filter: &T::Filter) -> Result<Vec<T>, ApplicationError>;
    /// Replaces the row at `id` with `entity` and returns the row now stored under `id`.
    ///
    /// The replacement is appended at the end of the store. If `entity` carries a
    /// different id, it stays stored under that id and the call reports `NotFound`
    /// for `id`. Re-keying onto an id held by another row fails with `Conflict`
    /// and leaves the store untouched.
    async fn update(&self, id: &str, entity: T) -> Result<T, ApplicationError>;
    /// Removes the row with the given id and hands it back.
    async fn remove(&self, id: &str) -> Result<T, ApplicationError>;
    /// Number of rows currently stored.
    async fn count(&self) -> Result<usize, ApplicationError>;

    /// Every row, in storage order.
    async fn all(&self) -> Result<Vec<T>, ApplicationError> {
        self.find(&T::Filter::default()).await
    }
}

/// Interface for the student store.
#[async_trait]
pub trait StudentRepository: Repository<Student> {
    /// Retrieves the student with exactly this email.
    async fn get_by_email(&self, email: &str) -> Result<Student, ApplicationError>;
    /// Registers the student in the given courses and persists the result.
    async fn register(
        &self,
        id: &str,
        course_ids: &[String],
    ) -> Result<Student, ApplicationError>;
    /// Drops the given courses from the student and persists the result.
    /// Courses the student does not take are skipped.
    async fn drop_courses(
        &self,
        id: &str,
        course_ids: &[String],
    ) -> Result<Student, ApplicationError>;
}

/// Interface for the course store.
pub trait CourseRepository: Repository<Course> {}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

/// Query-string form of a [`StudentFilter`].
/// `courses` is a comma-separated list of course ids.
#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentQuery {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub courses: Option<String>,
}

impl From<StudentQuery> for StudentFilter {
    fn from(query: StudentQuery) -> Self {
        let courses = query
            .courses
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|course| !course.is_empty())
            .map(str::to_string)
            .collect();

        StudentFilter {
            id: query.id,
            first_name: query.first_name,
            last_name: query.last_name,
            email: query.email,
            age: query.age,
            courses,
        }
    }
}

/// Body of the register / drop course requests.
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CourseIdsRequest {
    pub course_ids: Vec<String>,
}

/// Response for the /health endpoint.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub students: usize,
    pub courses: usize,
}
