//! Repository layer: one zero-sized struct per table with async query methods.

pub mod collage_repo;
pub mod generation_task_repo;

pub use collage_repo::CollageRepo;
pub use generation_task_repo::GenerationTaskRepo;
