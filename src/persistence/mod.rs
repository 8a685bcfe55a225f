pub mod error;
pub mod model_persistence;

pub use error::PersistenceError;
pub use model_persistence::ModelPersistence;
