// Module declarations
pub mod persistence;
pub mod seed;
pub mod singleton;

// Re-export all implementations
pub use persistence::{InMemoryCourseRepository, InMemoryRepository, InMemoryStudentRepository};
pub use singleton::Singleton;
