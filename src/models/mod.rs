pub mod task;
pub mod user;

pub use task::{Task, TaskChanges, TaskInput, TaskQuery, TaskStatus};
pub use user::{NewUser, User, UserProfile};
