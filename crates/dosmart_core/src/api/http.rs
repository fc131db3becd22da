use crate::api::{AuthGateway, RegisteredUser, TaskGateway, error_from_response};
use crate::config::Config;
use crate::error::{AppError, Operation};
use crate::model::{NewTask, Task, TaskStatus, TaskUpdate};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct CredentialsBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    status: TaskStatus,
}

#[derive(Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    user: Option<RegisteredUser>,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct TaskResponse {
    task: Task,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

/// Backend client over HTTP/JSON. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        Self::with_timeouts(base_url, Duration::from_secs(10), Duration::from_secs(30))
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::with_timeouts(
            &config.api_base_url(),
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| AppError::invalid_input(format!("invalid api base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::invalid_input(format!(
                "invalid api base url: {base_url}"
            )));
        }

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| AppError::io(format!("failed to build http client: {err}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Appends path segments to the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::invalid_input("invalid api base url"))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&str>,
    ) -> Result<RequestBuilder, AppError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "sending request");
        let builder = self.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, AppError> {
        let response = request.send().await.map_err(|err| {
            debug!(%operation, error = %err, "request failed");
            AppError::Transport {
                operation,
                message: format!("{}: {}", operation.default_message(), err),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| AppError::Transport {
            operation,
            message: format!("{}: {}", operation.default_message(), err),
        })?;

        if !status.is_success() {
            debug!(%operation, status = status.as_u16(), "server rejected request");
            return Err(error_from_response(operation, status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|err| {
            AppError::invalid_data(format!("unexpected {operation} response: {err}"))
        })
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<RegisteredUser>, AppError> {
        let request = self
            .request(Method::POST, &["auth", "register"], None)?
            .json(&CredentialsBody { username, password });
        let response: RegisterResponse = self.send(Operation::Register, request).await?;
        Ok(response.user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        let request = self
            .request(Method::POST, &["auth", "login"], None)?
            .json(&CredentialsBody { username, password });
        let response: LoginResponse = self.send(Operation::Login, request).await?;
        Ok(response.token)
    }

    async fn validate_token(&self, token: &str) -> Result<(), AppError> {
        let request = self.request(Method::GET, &["task", ""], Some(token))?;
        let _: TasksResponse = self.send(Operation::FetchCurrentUser, request).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskGateway for HttpGateway {
    async fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, AppError> {
        let request = self.request(Method::GET, &["task", ""], Some(token))?;
        let response: TasksResponse = self.send(Operation::FetchTasks, request).await?;
        Ok(response.tasks)
    }

    async fn create_task(&self, token: &str, input: &NewTask) -> Result<Task, AppError> {
        let request = self
            .request(Method::POST, &["task"], Some(token))?
            .json(input);
        let response: TaskResponse = self.send(Operation::CreateTask, request).await?;
        Ok(response.task)
    }

    async fn update_task(
        &self,
        token: &str,
        id: &str,
        fields: &TaskUpdate,
    ) -> Result<Task, AppError> {
        let request = self
            .request(Method::PUT, &["task", id], Some(token))?
            .json(fields);
        let response: TaskResponse = self.send(Operation::UpdateTask, request).await?;
        Ok(response.task)
    }

    async fn update_task_status(
        &self,
        token: &str,
        id: &str,
        status: TaskStatus,
    ) -> Result<Task, AppError> {
        let request = self
            .request(Method::PATCH, &["task", id, "status"], Some(token))?
            .json(&StatusBody { status });
        let response: TaskResponse = self.send(Operation::UpdateTaskStatus, request).await?;
        Ok(response.task)
    }

    async fn delete_task(&self, token: &str, id: &str) -> Result<String, AppError> {
        let request = self.request(Method::DELETE, &["task", id], Some(token))?;
        let response: MessageResponse = self.send(Operation::DeleteTask, request).await?;
        Ok(response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::HttpGateway;
    use crate::api::{AuthGateway, TaskGateway, signup};
    use crate::error::{AppError, Operation};
    use crate::model::{NewTask, TaskStatus, TaskUpdate};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": "u1",
            "title": "Buy milk",
            "description": null,
            "start_time": "2025-06-01T09:00:00Z",
            "deadline": "2025-06-01T18:00:00Z",
            "status": status,
            "created_at": "2025-06-01T08:00:00Z",
            "updated_at": "2025-06-01T08:00:00Z"
        })
    }

    async fn gateway(server: &MockServer) -> HttpGateway {
        HttpGateway::new(&format!("{}/api", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn login_posts_credentials_and_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"username": "ada", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "ok", "token": "tok-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = gateway(&server).await.login("ada", "pw").await.unwrap();

        assert_eq!(token, "tok-1");
    }

    #[tokio::test]
    async fn login_failure_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = gateway(&server).await.login("ada", "bad").await.unwrap_err();

        assert_eq!(
            err,
            AppError::Rejected {
                operation: Operation::Login,
                status: 400,
                message: "Invalid credentials".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn signup_registers_then_logs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "created",
                "user": {"id": "u1", "username": "ada", "created_at": "2025-06-01T08:00:00Z"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "ok", "token": "t"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credentials = signup(&gateway(&server).await, "ada", "pw").await.unwrap();

        assert_eq!(credentials.username, "ada");
        assert_eq!(credentials.token, "t");
    }

    #[tokio::test]
    async fn fetch_tasks_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [task_json("t1", "Upcoming Task"), task_json("t2", "Failed Task")]
            })))
            .mount(&server)
            .await;

        let tasks = gateway(&server).await.fetch_tasks("tok-1").await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn fetch_tasks_treats_missing_list_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let tasks = gateway(&server).await.fetch_tasks("tok").await.unwrap();

        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn validate_token_reports_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "jwt expired"})))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .validate_token("old")
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(err.message(), "jwt expired");
        assert_eq!(err.operation(), Some(Operation::FetchCurrentUser));
    }

    #[tokio::test]
    async fn create_simple_task_uses_tagged_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/task"))
            .and(body_json(json!({"type": "simple", "textInput": "Buy milk"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"task": task_json("t9", "Upcoming Task")})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let input = NewTask::Simple {
            text_input: "Buy milk".to_string(),
        };
        let task = gateway(&server)
            .await
            .create_task("tok", &input)
            .await
            .unwrap();

        assert_eq!(task.id, "t9");
    }

    #[tokio::test]
    async fn update_sends_only_present_fields_and_null_description() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/task/t1"))
            .and(body_json(json!({"title": "Renamed", "description": null})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"task": task_json("t1", "Ongoing Task")})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fields = TaskUpdate {
            title: Some("Renamed".to_string()),
            description: Some(None),
            ..TaskUpdate::default()
        };
        gateway(&server)
            .await
            .update_task("tok", "t1", &fields)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_status_patches_status_label() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/task/t1/status"))
            .and(body_json(json!({"status": "Ongoing Task"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"task": task_json("t1", "Ongoing Task")})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let task = gateway(&server)
            .await
            .update_task_status("tok", "t1", TaskStatus::Ongoing)
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Ongoing);
    }

    #[tokio::test]
    async fn delete_failure_without_body_uses_default_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/task/t1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .delete_task("tok", "t1")
            .await
            .unwrap_err();

        assert_eq!(err.message(), "Failed to delete task");
        assert_eq!(err.code(), "rejected");
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway(&server).await.login("ada", "pw").await.unwrap_err();

        assert_eq!(err.code(), "invalid_data");
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:9/api").unwrap();

        let err = gateway.fetch_tasks("tok").await.unwrap_err();

        assert_eq!(err.code(), "transport_error");
        assert_eq!(err.operation(), Some(Operation::FetchTasks));
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = HttpGateway::new("not a url").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn endpoint_escapes_ids() {
        let gateway = HttpGateway::new("http://localhost:4000/api/").unwrap();
        let url = gateway.endpoint(&["task", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/task/a%2Fb");

        let list = gateway.endpoint(&["task", ""]).unwrap();
        assert_eq!(list.as_str(), "http://localhost:4000/api/task/");
    }
}
