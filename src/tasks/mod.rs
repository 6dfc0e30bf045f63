pub mod store;

pub use store::{CreateStatus, WorkTask, WorkTaskStore};
