pub mod in_memory_repository;

// Re-export the store and its per-entity aliases
pub use in_memory_repository::{
    InMemoryCourseRepository, InMemoryRepository, InMemoryStudentRepository,
};
