//! Lazily created, process-wide repository instances.
//!
//! A [`Singleton`] builds its store on first access from an optional seed and
//! hands out the same `Arc` forever after. Concurrent first callers block on
//! the cell's internal lock; exactly one seed wins and the rest are ignored.
//! There is no reset: tests that need a fresh store build their own
//! `Singleton` value instead of going through [`students`] / [`courses`].

use crate::persistence::{InMemoryCourseRepository, InMemoryRepository, InMemoryStudentRepository};
use domain::{Course, Entity, Student};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

pub struct Singleton<T: Entity> {
    cell: OnceLock<Arc<InMemoryRepository<T>>>,
}

impl<T: Entity> Singleton<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Returns the shared store, creating it from `seed` on first access.
    pub fn get_or_seed(&self, seed: Option<Vec<T>>) -> Arc<InMemoryRepository<T>> {
        let mut seed = seed;
        let mut created = false;
        let repo = self.cell.get_or_init(|| {
            created = true;
            let rows = seed.take().unwrap_or_default();
            info!(kind = T::KIND, count = rows.len(), "Creating singleton repository");
            Arc::new(InMemoryRepository::with_seed(rows))
        });
        if !created && seed.is_some() {
            debug!(kind = T::KIND, "Singleton already initialized, ignoring seed");
        }
        repo.clone()
    }

    /// The shared store, if something already created it.
    pub fn get(&self) -> Option<Arc<InMemoryRepository<T>>> {
        self.cell.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: Entity> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

static STUDENTS: Singleton<Student> = Singleton::new();
static COURSES: Singleton<Course> = Singleton::new();

/// Process-wide student store. `seed` only matters on the very first call.
pub fn students(seed: Option<Vec<Student>>) -> Arc<InMemoryStudentRepository> {
    STUDENTS.get_or_seed(seed)
}

/// Process-wide course store. `seed` only matters on the very first call.
pub fn courses(seed: Option<Vec<Course>>) -> Arc<InMemoryCourseRepository> {
    COURSES.get_or_seed(seed)
}
