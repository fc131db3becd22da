mod session;
mod task;

pub use session::{Credentials, SessionState};
pub use task::{NewTask, Task, TaskStatus, TaskUpdate};
