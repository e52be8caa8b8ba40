use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use tower::Service;
use tracing::info;

use crate::archive::today_archive_file_name;
use crate::config::{MoodleConfig, DEFAULT_BASE_URL};
use crate::error::CollectorError;
use crate::moodle::{CollectReport, MoodleCollector};

/// 収集リクエスト
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub username: String,
    pub password: String,
    pub target_url: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl CollectRequest {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            target_url: target_url.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<CollectRequest> for MoodleConfig {
    fn from(req: CollectRequest) -> Self {
        MoodleConfig::new(req.username, req.password)
            .with_base_url(req.base_url)
            .with_timeout(req.timeout)
    }
}

/// 収集結果
#[derive(Debug)]
pub struct CollectResult {
    /// ZIPの中身
    pub archive: Vec<u8>,
    /// 保存用のファイル名 (`collected_files_<日付>.zip`)
    pub file_name: String,
    /// 問題メモ
    pub diagnostics: Vec<String>,
    pub report: CollectReport,
}

/// tower::Serviceを実装した収集サービス (ログイン → 巡回 → ZIP)
#[derive(Debug, Clone, Default)]
pub struct CollectorService {}

impl CollectorService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<CollectRequest> for CollectorService {
    type Response = CollectResult;
    type Error = CollectorError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CollectRequest) -> Self::Future {
        info!("Collect request received: user={}", req.username);

        Box::pin(async move {
            let target_url = req.target_url.clone();
            let config: MoodleConfig = req.into();
            let (username, password) = (config.username.clone(), config.password.clone());

            let collector = MoodleCollector::from_config(config)?;
            collector.client().try_login(&username, &password).await?;

            let (archive, outcome) = collector.collect_archive(&target_url).await?;

            let result = CollectResult {
                archive,
                file_name: today_archive_file_name(),
                diagnostics: outcome.diagnostics(),
                report: outcome.report(),
            };

            info!(
                "Collect finished: file={}, size={}bytes, problems={}",
                result.file_name,
                result.archive.len(),
                result.diagnostics.len()
            );

            Ok(result)
        })
    }
}
