//! Moodle 提出物収集の型定義

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;

/// レポート行から抽出した学生情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    /// 表示名 (前後の空白は除去済み)
    pub name: String,
    /// 受験詳細ページのURL (正規化済み)
    pub detail_url: String,
}

/// 詳細ページ上の添付ファイルリンク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentLink {
    pub file_name: String,
    pub url: String,
}

/// ダウンロード済みの添付ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// 学生ごとのフォルダ (ファイルが0件のこともある)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFolder {
    pub folder_name: String,
    pub files: Vec<AttachmentFile>,
}

/// フォルダ名 → ファイル列 (作成順を保持)
///
/// フォルダ名の一意性は収集側で保証されるので、ここでは追加順に並べるだけ。
#[derive(Debug, Clone, Default)]
pub struct CollectedFiles {
    folders: Vec<StudentFolder>,
}

impl CollectedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, folder: StudentFolder) {
        self.folders.push(folder);
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudentFolder> {
        self.folders.iter()
    }

    pub fn get(&self, folder_name: &str) -> Option<&StudentFolder> {
        self.folders.iter().find(|f| f.folder_name == folder_name)
    }

    pub fn folder_names(&self) -> Vec<&str> {
        self.folders.iter().map(|f| f.folder_name.as_str()).collect()
    }

    /// 全フォルダのファイル数合計
    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }
}

impl IntoIterator for CollectedFiles {
    type Item = StudentFolder;
    type IntoIter = std::vec::IntoIter<StudentFolder>;

    fn into_iter(self) -> Self::IntoIter {
        self.folders.into_iter()
    }
}

/// 問題の種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteKind {
    /// 添付ファイル欄なし
    NoUploads,
    /// 個別ファイルのダウンロード失敗
    DownloadFailed { file_name: String },
    /// 行の処理中に発生したエラー
    RowError,
}

/// 学生フォルダ単位の問題メモ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFileNote {
    pub folder_name: String,
    pub kind: NoteKind,
}

impl MissingFileNote {
    pub fn no_uploads(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            kind: NoteKind::NoUploads,
        }
    }

    pub fn download_failed(folder_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            kind: NoteKind::DownloadFailed {
                file_name: file_name.into(),
            },
        }
    }

    pub fn row_error(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            kind: NoteKind::RowError,
        }
    }
}

impl fmt::Display for MissingFileNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NoteKind::NoUploads => write!(f, "{} - Empty (No files uploaded)", self.folder_name),
            NoteKind::DownloadFailed { file_name } => {
                write!(f, "{} - Failed to download {}", self.folder_name, file_name)
            }
            NoteKind::RowError => write!(f, "{} - Error", self.folder_name),
        }
    }
}

/// 1行の処理結果
#[derive(Debug)]
pub enum RowOutcome {
    /// 学生行ではない (名前セルまたは詳細リンクなし)
    Skipped,
    /// フォルダを作成した
    Collected(StudentFolder),
    /// 行の処理に失敗した。フォルダ名が決まる前の失敗なら `folder_name` は `None`
    Failed {
        folder_name: Option<String>,
        error: CollectorError,
    },
}

/// レポート巡回の結果
#[derive(Debug, Default)]
pub struct CollectOutcome {
    pub collected: CollectedFiles,
    pub notes: Vec<MissingFileNote>,
    pub pages_visited: usize,
}

impl CollectOutcome {
    /// 問題メモを表示用文字列に変換
    pub fn diagnostics(&self) -> Vec<String> {
        self.notes.iter().map(ToString::to_string).collect()
    }

    pub fn report(&self) -> CollectReport {
        CollectReport::new(self)
    }
}

/// ファイル概要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_name: String,
    pub size: usize,
}

/// フォルダ概要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderSummary {
    pub folder_name: String,
    pub files: Vec<FileSummary>,
}

/// 収集結果のJSONレポート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectReport {
    pub generated_at: DateTime<Utc>,
    pub pages_visited: usize,
    pub folders: Vec<FolderSummary>,
    pub diagnostics: Vec<String>,
}

impl CollectReport {
    pub fn new(outcome: &CollectOutcome) -> Self {
        let folders = outcome
            .collected
            .iter()
            .map(|folder| FolderSummary {
                folder_name: folder.folder_name.clone(),
                files: folder
                    .files
                    .iter()
                    .map(|file| FileSummary {
                        file_name: file.file_name.clone(),
                        size: file.content.len(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            pages_visited: outcome.pages_visited,
            folders,
            diagnostics: outcome.diagnostics(),
        }
    }
}
