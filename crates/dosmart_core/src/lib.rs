pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod form;
pub mod model;
pub mod session_store;
pub mod storage;
pub mod task_store;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Task, TaskStatus};

    #[test]
    fn task_decodes_from_server_json() {
        let task: Task = serde_json::from_str(
            r#"{
                "id": "t1",
                "user_id": "u1",
                "title": "demo",
                "start_time": "2025-06-01T09:00:00Z",
                "deadline": "2025-06-02T09:00:00Z",
                "status": "Ongoing Task",
                "created_at": "2025-06-01T08:00:00Z",
                "updated_at": "2025-06-01T08:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(task.id, "t1");
        assert_eq!(task.status, TaskStatus::Ongoing);
        assert_eq!(task.description, None);
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing title");
    }
}
