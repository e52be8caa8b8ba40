//! Moodle 提出物コレクター
//!
//! - Moodle にログインし、クイズレポートをページ送りしながら巡回
//! - 学生ごとの添付ファイルをダウンロードして1つのZIPにまとめる
//!
//! # 使用例
//!
//! ```rust,ignore
//! use moodle_collector::{MoodleCollector, MoodleConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let collector = MoodleCollector::from_config(MoodleConfig::default()).unwrap();
//!
//!     if collector.login_to_moodle("instructor", "password").await {
//!         let (archive, problems) = collector
//!             .download_files("https://moodle.ufar.am/mod/quiz/report.php?id=123&mode=overview")
//!             .await;
//!         println!("ZIP: {:?} bytes", archive.map(|a| a.len()));
//!         for p in problems {
//!             println!("{}", p);
//!         }
//!     }
//! }
//! ```
//!
//! # tower::Service 使用例
//!
//! ```rust,ignore
//! use moodle_collector::{CollectRequest, CollectorService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = CollectorService::new();
//!     let request = CollectRequest::new("instructor", "password", "/mod/quiz/report.php?id=123");
//!     let result = service.call(request).await.unwrap();
//!     std::fs::write(&result.file_name, &result.archive).unwrap();
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod moodle;
pub mod service;
pub mod traits;

// 主要な型をリエクスポート
pub use archive::{archive_file_name, build_zip, today_archive_file_name};
pub use config::MoodleConfig;
pub use error::CollectorError;
pub use moodle::{
    CollectOutcome, CollectReport, CollectedFiles, MissingFileNote, MoodleCollector,
    MoodleSession, PageParser, StudentFolder,
};
pub use service::{CollectRequest, CollectResult, CollectorService};
pub use traits::PortalClient;
