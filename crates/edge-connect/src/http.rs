use async_trait::async_trait;
use reqwest::{
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use edge_model::{
    Capabilities, Cookie, Dxo,
    wire::{JobRequest, JobResponse, ResultRequest, ResultResponse, TaskRequest, TaskResponse},
};

use crate::{ConnectConfig, ConnectError, Coordinator};

pub const DEVICE_ID_HEADER: &str = "x-flare-device-id";
pub const DEVICE_INFO_HEADER: &str = "x-flare-device-info";
pub const USER_INFO_HEADER: &str = "x-flare-user-info";

/// [`Coordinator`] over JSON/HTTP.
///
/// Identity headers are attached to every request through the client's default headers.
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpConnection {
    pub fn new(cfg: ConnectConfig) -> Result<Self, ConnectError> {
        cfg.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(DEVICE_ID_HEADER),
            header_value(&cfg.device_id)?,
        );
        headers.insert(
            HeaderName::from_static(DEVICE_INFO_HEADER),
            header_value(&json_header(&cfg.device_info)?)?,
        );
        headers.insert(
            HeaderName::from_static(USER_INFO_HEADER),
            header_value(&json_header(&cfg.user_info)?)?,
        );

        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .connect_timeout(cfg.connect_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ConnectError> {
        let raw = format!("{}/{path}", self.endpoint);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| ConnectError::InvalidConfig(format!("url {raw}: {e}")))
    }

    async fn post<B, R>(&self, url: Url, body: &B) -> Result<R, ConnectError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        trace!(%url, "posting to coordinator");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(ConnectError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(ConnectError::from_reqwest)?;
        if !status.is_success() {
            return Err(ConnectError::from_status(status.as_u16(), body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ConnectError::Malformed(format!("failed to parse response: {e}, body: {body}")))
    }
}

#[async_trait]
impl Coordinator for HttpConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_job(
        &self,
        job_name: &str,
        capabilities: &Capabilities,
    ) -> Result<JobResponse, ConnectError> {
        let request = JobRequest {
            job_name: job_name.to_string(),
            capabilities: capabilities.clone(),
        };
        let response: JobResponse = self.post(self.url("job", &[])?, &request).await?;
        debug!(status = %response.status, job_id = ?response.job_id, "job response");
        Ok(response)
    }

    async fn fetch_task(
        &self,
        job_id: &str,
        cookie: Option<&Cookie>,
    ) -> Result<TaskResponse, ConnectError> {
        let request = TaskRequest {
            cookie: cookie.cloned(),
        };
        let url = self.url("task", &[("job_id", job_id)])?;
        let response: TaskResponse = self.post(url, &request).await?;
        debug!(status = %response.status, task_id = ?response.task_id, "task response");
        Ok(response)
    }

    async fn send_result(
        &self,
        job_id: &str,
        task_id: &str,
        task_name: &str,
        result: &Dxo,
        cookie: Option<&Cookie>,
    ) -> Result<ResultResponse, ConnectError> {
        let request = ResultRequest {
            job_id: job_id.to_string(),
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            result: result.clone(),
            cookie: cookie.cloned(),
        };
        let url = self.url(
            "result",
            &[("job_id", job_id), ("task_id", task_id), ("task_name", task_name)],
        )?;
        let response: ResultResponse = self.post(url, &request).await?;
        debug!(status = %response.status, "result response");
        Ok(response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ConnectError> {
    HeaderValue::from_str(value)
        .map_err(|e| ConnectError::InvalidConfig(format!("header value {value:?}: {e}")))
}

fn json_header<T: Serialize>(value: &T) -> Result<String, ConnectError> {
    serde_json::to_string(value).map_err(|e| ConnectError::InvalidConfig(e.to_string()))
}
