pub mod health;
pub mod jobs;
pub mod objects;

pub use health::health_check;
pub use jobs::{get_job, submit_job};
pub use objects::{get_cas_object, get_index_pointer};
