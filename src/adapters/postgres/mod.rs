//! PostgreSQL adapter - sqlx implementation of the persistence ports.

mod tutor_store;

pub use tutor_store::PostgresTutorStore;
