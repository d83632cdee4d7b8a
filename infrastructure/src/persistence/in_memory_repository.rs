// ./infrastructure/src/persistence/in_memory_repository.rs
use application::{
    ApplicationError, CourseRepository, Insertion, Repository, StudentRepository,
};
use async_trait::async_trait;
use domain::{Course, Criteria, Entity, Student};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

pub type InMemoryStudentRepository = InMemoryRepository<Student>;
pub type InMemoryCourseRepository = InMemoryRepository<Course>;

/// Ordered in-memory store for one entity type.
///
/// Rows keep insertion order; an update moves the row to the end. Every
/// mutation holds the write lock for its whole read-modify-write.
#[derive(Debug)]
pub struct InMemoryRepository<T: Entity> {
    rows: RwLock<Vec<T>>,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Builds a store pre-populated with `seed`. Later duplicates of an id are dropped.
    pub fn with_seed(seed: impl IntoIterator<Item = T>) -> Self {
        let mut rows: Vec<T> = Vec::new();
        for entity in seed {
            if position(&rows, entity.id()).is_some() {
                warn!(kind = T::KIND, id = %entity.id(), "Skipping duplicate id in seed data");
                continue;
            }
            rows.push(entity);
        }
        debug!(kind = T::KIND, count = rows.len(), "Seeded in-memory store");
        Self {
            rows: RwLock::new(rows),
        }
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

// --- Backing list helpers (caller holds the lock) ---

fn position<T: Entity>(rows: &[T], id: &str) -> Option<usize> {
    rows.iter().position(|row| row.id() == id)
}

fn lookup<T: Entity>(rows: &[T], id: &str) -> Result<T, ApplicationError> {
    rows.iter()
        .find(|row| row.id() == id)
        .cloned()
        .ok_or_else(|| ApplicationError::not_found::<T>(id))
}

fn take<T: Entity>(rows: &mut Vec<T>, id: &str) -> Result<T, ApplicationError> {
    let index = position(rows, id).ok_or_else(|| ApplicationError::not_found::<T>(id))?;
    Ok(rows.remove(index))
}

fn replace<T: Entity>(rows: &mut Vec<T>, id: &str, entity: T) -> Result<T, ApplicationError> {
    let index = position(rows, id).ok_or_else(|| ApplicationError::not_found::<T>(id))?;
    if entity.id() != id {
        if position(rows, entity.id()).is_some() {
            warn!(kind = T::KIND, id = %id, new_id = %entity.id(), "Update would re-key onto an existing row");
            return Err(ApplicationError::conflict::<T>(entity.id()));
        }
        warn!(kind = T::KIND, id = %id, new_id = %entity.id(), "Update re-keys the row under a new id");
    }
    rows.remove(index);
    rows.push(entity);
    lookup(rows, id)
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    #[instrument(skip(self, entity))]
    async fn add(&self, entity: T) -> Result<Insertion<T>, ApplicationError> {
        debug!(kind = T::KIND, id = %entity.id(), "Adding entity to in-memory store");
        let mut rows = self.rows.write().await;
        if position(&rows, entity.id()).is_some() {
            debug!(kind = T::KIND, id = %entity.id(), "Id already present, leaving store untouched");
            return Ok(Insertion::AlreadyPresent(entity));
        }
        rows.push(entity.clone());
        Ok(Insertion::Inserted(entity))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<T, ApplicationError> {
        debug!(kind = T::KIND, id = %id, "Getting entity from in-memory store");
        lookup(&self.rows.read().await, id)
    }

    #[instrument(skip(self, filter))]
    async fn find(&self, filter: &T::Filter) -> Result<Vec<T>, ApplicationError> {
        let rows = self.rows.read().await;
        let found: Vec<T> = rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        debug!(kind = T::KIND, scanned = rows.len(), matched = found.len(), "Filtered in-memory store");
        Ok(found)
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, id: &str, entity: T) -> Result<T, ApplicationError> {
        debug!(kind = T::KIND, id = %id, "Updating entity in in-memory store");
        replace(&mut *self.rows.write().await, id, entity)
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str) -> Result<T, ApplicationError> {
        debug!(kind = T::KIND, id = %id, "Removing entity from in-memory store");
        take(&mut *self.rows.write().await, id)
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.rows.read().await.len())
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository<Student> {
    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<Student, ApplicationError> {
        debug!(email = %email, "Looking up student by email");
        self.rows
            .read()
            .await
            .iter()
            .find(|student| student.email == email)
            .cloned()
            .ok_or_else(|| ApplicationError::not_found::<Student>(email))
    }

    #[instrument(skip(self, course_ids), fields(courses = course_ids.len()))]
    async fn register(
        &self,
        id: &str,
        course_ids: &[String],
    ) -> Result<Student, ApplicationError> {
        let mut rows = self.rows.write().await;
        let mut student = lookup(&rows, id)?;
        student.register_courses(course_ids.iter().cloned());
        debug!(student_id = %id, total_courses = student.courses.len(), "Registered student in courses");
        replace(&mut rows, id, student)
    }

    #[instrument(skip(self, course_ids), fields(courses = course_ids.len()))]
    async fn drop_courses(
        &self,
        id: &str,
        course_ids: &[String],
    ) -> Result<Student, ApplicationError> {
        let mut rows = self.rows.write().await;
        let mut student = lookup(&rows, id)?;
        for course_id in course_ids {
            student.drop_course(course_id);
        }
        debug!(student_id = %id, total_courses = student.courses.len(), "Dropped student from courses");
        replace(&mut rows, id, student)
    }
}

impl CourseRepository for InMemoryRepository<Course> {}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CourseFilter, StudentFilter};

    fn student(id: &str, first_name: &str) -> Student {
        Student::new(id, first_name, "last-name", format!("{id}@university.edu"), 20)
    }

    fn ids<T: Entity>(rows: &[T]) -> Vec<&str> {
        rows.iter().map(|row| row.id()).collect()
    }

    fn course_ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_store_finds_nothing() {
        let repo = InMemoryStudentRepository::new();
        assert!(repo.all().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn seed_keeps_order_and_drops_duplicate_ids() {
        let repo = InMemoryCourseRepository::with_seed(vec![
            Course::new("course-id1", "First"),
            Course::new("course-id2", "Second"),
            Course::new("course-id1", "Impostor"),
        ]);
        let all = repo.all().await.unwrap();
        assert_eq!(ids(&all), ["course-id1", "course-id2"]);
        assert_eq!(all[0].name, "First");
    }

    #[tokio::test]
    async fn add_then_get_returns_the_entity() {
        let repo = InMemoryStudentRepository::new();
        let expected = student("student-id", "first-name");

        let added = repo.add(expected.clone()).await.unwrap();
        assert!(added.was_inserted());
        assert_eq!(added.into_inner(), expected);
        assert_eq!(repo.get("student-id").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn add_with_existing_id_is_a_no_op() {
        let repo = InMemoryStudentRepository::with_seed(vec![student("student-id", "Original")]);
        let duplicate = student("student-id", "Replacement");

        let outcome = repo.add(duplicate.clone()).await.unwrap();
        assert_eq!(outcome, Insertion::AlreadyPresent(duplicate));
        assert_eq!(repo.get("student-id").await.unwrap().first_name, "Original");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_missing_id_is_not_found() {
        let repo = InMemoryCourseRepository::new();
        let err = repo.get("invalid-id").await.unwrap_err();
        assert_eq!(err, ApplicationError::not_found::<Course>("invalid-id"));
    }

    #[tokio::test]
    async fn find_filters_courses_by_name_prefix() {
        let repo = InMemoryCourseRepository::with_seed(vec![
            Course::new("course-id1", "First"),
            Course::new("course-id2", "First"),
            Course::new("course-id3", "NotFirst"),
        ]);

        let found = repo
            .find(&CourseFilter::default().with_name("Fir"))
            .await
            .unwrap();
        assert_eq!(ids(&found), ["course-id1", "course-id2"]);
    }

    #[tokio::test]
    async fn find_filters_students_by_first_name_prefix() {
        let repo = InMemoryStudentRepository::with_seed(vec![
            student("student-id1", "First"),
            student("student-id2", "First"),
            student("student-id3", "NotFirst"),
        ]);

        let example = Student {
            first_name: "Fir".to_string(),
            ..Student::default()
        };
        let found = repo.find(&StudentFilter::from_example(&example)).await.unwrap();
        assert_eq!(ids(&found), ["student-id1", "student-id2"]);
    }

    #[tokio::test]
    async fn find_with_empty_filter_returns_every_row_in_order() {
        let repo = InMemoryStudentRepository::with_seed(vec![
            student("student-id1", "A"),
            student("student-id2", "B"),
            student("student-id3", "C"),
        ]);
        let found = repo.find(&StudentFilter::default()).await.unwrap();
        assert_eq!(ids(&found), ["student-id1", "student-id2", "student-id3"]);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_moves_row_to_the_end() {
        let repo = InMemoryCourseRepository::with_seed(vec![
            Course::new("course-a", "A"),
            Course::new("course-b", "B"),
        ]);

        let updated = repo
            .update("course-a", Course::new("course-a", "A, revised"))
            .await
            .unwrap();
        assert_eq!(updated.name, "A, revised");
        assert_eq!(repo.get("course-a").await.unwrap().name, "A, revised");
        assert_eq!(ids(&repo.all().await.unwrap()), ["course-b", "course-a"]);
    }

    #[tokio::test]
    async fn update_missing_id_leaves_store_untouched() {
        let repo = InMemoryCourseRepository::with_seed(vec![Course::new("course-a", "A")]);
        let err = repo
            .update("course-z", Course::new("course-z", "Z"))
            .await
            .unwrap_err();
        assert_eq!(err, ApplicationError::not_found::<Course>("course-z"));
        assert_eq!(ids(&repo.all().await.unwrap()), ["course-a"]);
    }

    #[tokio::test]
    async fn update_with_new_id_rekeys_the_row() {
        let repo = InMemoryCourseRepository::with_seed(vec![Course::new("course-a", "A")]);
        let err = repo
            .update("course-a", Course::new("course-b", "B"))
            .await
            .unwrap_err();

        assert_eq!(err, ApplicationError::not_found::<Course>("course-a"));
        assert!(repo.get("course-a").await.is_err());
        assert_eq!(repo.get("course-b").await.unwrap().name, "B");
    }

    #[tokio::test]
    async fn update_onto_existing_id_leaves_store_untouched() {
        let repo = InMemoryCourseRepository::with_seed(vec![
            Course::new("course-a", "A"),
            Course::new("course-b", "B"),
        ]);
        let err = repo
            .update("course-a", Course::new("course-b", "B2"))
            .await
            .unwrap_err();

        assert_eq!(err, ApplicationError::conflict::<Course>("course-b"));
        let rows = repo.all().await.unwrap();
        assert_eq!(
            rows,
            vec![Course::new("course-a", "A"), Course::new("course-b", "B")]
        );
    }

    #[tokio::test]
    async fn remove_returns_row_and_forgets_it() {
        let repo = InMemoryStudentRepository::with_seed(vec![student("student-id", "first-name")]);

        let removed = repo.remove("student-id").await.unwrap();
        assert_eq!(removed.id, "student-id");
        assert!(repo.get("student-id").await.is_err());
        assert!(repo.remove("student-id").await.is_err());
    }

    #[tokio::test]
    async fn get_by_email_matches_exactly() {
        let repo = InMemoryStudentRepository::with_seed(vec![student("student-id", "first-name")]);

        let found = repo.get_by_email("student-id@university.edu").await.unwrap();
        assert_eq!(found.id, "student-id");

        let err = repo.get_by_email("student-id@").await.unwrap_err();
        assert_eq!(err, ApplicationError::not_found::<Student>("student-id@"));
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let repo = InMemoryStudentRepository::with_seed(vec![student("register-student-id", "first-name")]);

        let registered = repo
            .register("register-student-id", &course_ids(&["course-id"]))
            .await
            .unwrap();
        assert!(registered.is_taking("course-id"));

        let again = repo
            .register("register-student-id", &course_ids(&["course-id"]))
            .await
            .unwrap();
        assert_eq!(again.courses.len(), 1);
        assert!(repo.get("register-student-id").await.unwrap().is_taking("course-id"));
    }

    #[tokio::test]
    async fn drop_courses_skips_courses_not_taken() {
        let repo = InMemoryStudentRepository::with_seed(vec![
            student("drop-student-id", "first-name").with_courses(["course-1", "course-2"]),
        ]);

        let dropped = repo
            .drop_courses("drop-student-id", &course_ids(&["course-1", "course-9"]))
            .await
            .unwrap();
        assert!(!dropped.is_taking("course-1"));
        assert!(dropped.is_taking("course-2"));
        assert_eq!(repo.get("drop-student-id").await.unwrap().courses.len(), 1);
    }

    #[tokio::test]
    async fn register_and_drop_fail_for_unknown_student() {
        let repo = InMemoryStudentRepository::new();
        let courses = course_ids(&["course-1"]);
        assert!(repo.register("nobody", &courses).await.is_err());
        assert!(repo.drop_courses("nobody", &courses).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_are_not_lost() {
        let repo = std::sync::Arc::new(InMemoryStudentRepository::with_seed(vec![student(
            "student-id",
            "first-name",
        )]));

        let mut handles = Vec::new();
        for n in 0..32 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.register("student-id", &[format!("course-{n}")]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.get("student-id").await.unwrap().courses.len(), 32);
    }
}
