//! レポート巡回と提出物収集
//!
//! レポートページを「次へ」リンクがなくなるまで順に辿り、各学生行の詳細ページから
//! 添付ファイルを集める。行単位の失敗は問題メモに残して続行し、巡回全体の失敗だけが
//! `Err` として返る。

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::archive::build_zip;
use crate::config::MoodleConfig;
use crate::error::CollectorError;
use crate::traits::PortalClient;

use super::fetcher::download_attachments;
use super::parser::{Attachments, PageParser};
use super::session::MoodleSession;
use super::types::{
    CollectOutcome, CollectedFiles, MissingFileNote, RowOutcome, StudentFolder, StudentRecord,
};

/// 実行全体で一意なフォルダ名を払い出す
#[derive(Debug, Default)]
pub struct FolderNames {
    seen: HashSet<String>,
}

impl FolderNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用済みなら `<name>_1`, `<name>_2`, ... と空きが見つかるまで試す
    pub fn reserve(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut counter = 1;
        while self.seen.contains(&candidate) {
            candidate = format!("{}_{}", name, counter);
            counter += 1;
        }
        self.seen.insert(candidate.clone());
        candidate
    }
}

/// 提出物コレクター
///
/// セッション (`PortalClient`) を実行中ずっと所有し、すべての取得はこれを通す。
pub struct MoodleCollector<C> {
    client: C,
    parser: PageParser,
}

impl MoodleCollector<MoodleSession> {
    /// 設定からセッションとパーサーを作成
    pub fn from_config(config: MoodleConfig) -> Result<Self, CollectorError> {
        let parser = PageParser::new(config.base_url.clone())?;
        let session = MoodleSession::new(config)?;
        Ok(Self::new(session, parser))
    }

    /// ログイン (失敗はすべて `false`)
    pub async fn login_to_moodle(&self, username: &str, password: &str) -> bool {
        self.client.login(username, password).await
    }
}

impl<C> MoodleCollector<C>
where
    C: PortalClient,
{
    pub fn new(client: C, parser: PageParser) -> Self {
        Self { client, parser }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 全ページを巡回してZIPと問題メモ一覧を返す
    ///
    /// 巡回全体が失敗した場合はアーカイブなし・問題メモは空になる。
    pub async fn download_files(&self, target_url: &str) -> (Option<Vec<u8>>, Vec<String>) {
        match self.collect_archive(target_url).await {
            Ok((archive, outcome)) => (Some(archive), outcome.diagnostics()),
            Err(e) => {
                error!("Error during file download: {}", e);
                (None, Vec::new())
            }
        }
    }

    /// 巡回してZIPを作成
    pub async fn collect_archive(
        &self,
        target_url: &str,
    ) -> Result<(Vec<u8>, CollectOutcome), CollectorError> {
        let outcome = self.collect(target_url).await?;
        let archive = build_zip(&outcome.collected)?;
        Ok((archive, outcome))
    }

    /// レポートページを巡回して添付ファイルを集める
    pub async fn collect(&self, target_url: &str) -> Result<CollectOutcome, CollectorError> {
        let target_url = target_url.trim();
        if target_url.is_empty() {
            return Err(CollectorError::Navigation("対象URLが空です".into()));
        }

        let mut names = FolderNames::new();
        let mut collected = CollectedFiles::new();
        let mut notes = Vec::new();
        let mut visited = HashSet::new();
        let mut page_number = 0;
        let mut current_page = Some(self.parser.normalize_link(target_url));

        while let Some(page_url) = current_page.take() {
            if !visited.insert(page_url.clone()) {
                warn!("Pagination loops back to {}, stopping", page_url);
                break;
            }

            let Some(html) = self.client.fetch_html(&page_url).await else {
                info!("Report page {} unavailable, stopping pagination", page_url);
                break;
            };
            page_number += 1;
            info!("Processing report page {}: {}", page_number, page_url);

            let page = self.parser.parse_report_page(&html);
            debug!("Found {} report rows", page.rows.len());

            for record in page.rows {
                let outcome = match record {
                    Some(record) => self.process_row(record, &mut names, &mut notes).await,
                    None => RowOutcome::Skipped,
                };

                match outcome {
                    RowOutcome::Skipped => debug!("Skipping non-student row"),
                    RowOutcome::Collected(folder) => collected.push(folder),
                    RowOutcome::Failed { folder_name, error } => {
                        error!(
                            "Error processing row for {}: {}",
                            folder_name.as_deref().unwrap_or("<unknown>"),
                            error
                        );
                        if let Some(folder_name) = folder_name {
                            notes.push(MissingFileNote::row_error(folder_name));
                        }
                    }
                }
            }

            current_page = page.next_page;
        }

        info!(
            "Collection finished: {} pages, {} folders, {} files, {} problems",
            page_number,
            collected.len(),
            collected.file_count(),
            notes.len()
        );

        Ok(CollectOutcome {
            collected,
            notes,
            pages_visited: page_number,
        })
    }

    /// 1人分の処理: フォルダ名確保 → 詳細ページ取得 → 添付ダウンロード
    pub async fn process_row(
        &self,
        record: StudentRecord,
        names: &mut FolderNames,
        notes: &mut Vec<MissingFileNote>,
    ) -> RowOutcome {
        let folder_name = names.reserve(&record.name);
        debug!("Student {} -> folder {}", record.name, folder_name);

        // エラーページも本文として解析する (添付欄がなければ「未提出」扱い)
        let detail_html = match self.client.fetch_page(&record.detail_url).await {
            Ok(html) => html,
            Err(error) => {
                return RowOutcome::Failed {
                    folder_name: Some(folder_name),
                    error,
                }
            }
        };

        let files = match self.parser.extract_attachments(&detail_html) {
            Attachments::Missing => {
                info!("{}: no files uploaded", folder_name);
                notes.push(MissingFileNote::no_uploads(&folder_name));
                Vec::new()
            }
            Attachments::Links(links) => {
                debug!("{}: {} attachment links", folder_name, links.len());
                download_attachments(&self.client, &folder_name, &links, notes).await
            }
        };

        RowOutcome::Collected(StudentFolder { folder_name, files })
    }
}
