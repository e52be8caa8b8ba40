//! Moodle 提出物コレクターモジュール
//!
//! クイズレポートを巡回し、学生ごとの添付ファイルを集める

mod collector;
mod fetcher;
mod parser;
mod session;
mod types;

pub use collector::{FolderNames, MoodleCollector};
pub use fetcher::{download_attachment, download_attachments};
pub use parser::{extract_login_token, Attachments, PageParser, ReportPage};
pub use session::MoodleSession;
pub use types::{
    AttachmentFile, AttachmentLink, CollectOutcome, CollectReport, CollectedFiles, FileSummary,
    FolderSummary, MissingFileNote, NoteKind, RowOutcome, StudentFolder, StudentRecord,
};
