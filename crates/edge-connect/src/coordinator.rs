use async_trait::async_trait;
use edge_model::{
    Capabilities, Cookie, Dxo,
    wire::{JobResponse, ResultResponse, TaskResponse},
};

use crate::ConnectError;

/// Request/response protocol with the federated-learning coordinator.
///
/// Implementations are stateless with respect to the session: the runner owns the cookie and passes it in.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Base URL or other human-readable address, used in progress reports.
    fn endpoint(&self) -> &str;

    async fn fetch_job(
        &self,
        job_name: &str,
        capabilities: &Capabilities,
    ) -> Result<JobResponse, ConnectError>;

    async fn fetch_task(
        &self,
        job_id: &str,
        cookie: Option<&Cookie>,
    ) -> Result<TaskResponse, ConnectError>;

    async fn send_result(
        &self,
        job_id: &str,
        task_id: &str,
        task_name: &str,
        result: &Dxo,
        cookie: Option<&Cookie>,
    ) -> Result<ResultResponse, ConnectError>;
}
