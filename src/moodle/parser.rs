//! レポートページ・詳細ページのHTML解析
//!
//! ポータルのマークアップ (セレクタ、クラス名、aria-label) への依存はこのモジュールに閉じ込める。
//! `scraper::Html` は `Send` ではないため、解析はすべて同期関数で行い所有データを返す。

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::CollectorError;

use super::types::{AttachmentLink, StudentRecord};

/// 提出一覧の行 (`id` の接頭辞で判定)
const REPORT_ROW_SELECTOR: &str = r#"tr[id^="mod-quiz-report-overview-report_r"]"#;
/// 学生名セル
const STUDENT_NAME_SELECTOR: &str = "td.c2 a";
/// 受験詳細リンクセル
const ATTEMPT_LINK_SELECTOR: &str = "td.c8 a";
/// 詳細ページの添付ファイル欄
const ATTACHMENTS_SELECTOR: &str = "div.attachments";
const ANCHOR_SELECTOR: &str = "a";
/// ページネーションの「次へ」
const NEXT_PAGE_SELECTOR: &str = r#"nav.pagination a[aria-label="Next"]"#;

/// 1ページ分の解析結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPage {
    /// 行ごとの学生情報。学生行でない行は `None`
    pub rows: Vec<Option<StudentRecord>>,
    /// 次ページのURL (正規化済み)
    pub next_page: Option<String>,
}

/// 詳細ページの解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachments {
    /// 添付ファイル欄なし
    Missing,
    /// 添付ファイル欄内のリンク (文書順)
    Links(Vec<AttachmentLink>),
}

#[derive(Debug, Clone)]
pub struct PageParser {
    base_url: String,
    report_row: Selector,
    student_name: Selector,
    attempt_link: Selector,
    attachments: Selector,
    anchor: Selector,
    next_page: Selector,
}

impl PageParser {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CollectorError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            report_row: parse_selector(REPORT_ROW_SELECTOR)?,
            student_name: parse_selector(STUDENT_NAME_SELECTOR)?,
            attempt_link: parse_selector(ATTEMPT_LINK_SELECTOR)?,
            attachments: parse_selector(ATTACHMENTS_SELECTOR)?,
            anchor: parse_selector(ANCHOR_SELECTOR)?,
            next_page: parse_selector(NEXT_PAGE_SELECTOR)?,
        })
    }

    /// `/` で始まるリンクはベースオリジンを付与、それ以外は絶対URLとして扱う
    pub fn normalize_link(&self, href: &str) -> String {
        if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            href.to_string()
        }
    }

    /// レポートページ全体を解析
    pub fn parse_report_page(&self, html: &str) -> ReportPage {
        let document = Html::parse_document(html);
        let rows = self
            .parse_report_rows(&document)
            .into_iter()
            .map(|row| self.extract_student(row))
            .collect();

        ReportPage {
            rows,
            next_page: self.extract_next_page(&document),
        }
    }

    /// 提出一覧の行を文書順に取得
    pub fn parse_report_rows<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.report_row).collect()
    }

    /// 行から学生名と詳細リンクを抽出
    pub fn extract_student(&self, row: ElementRef<'_>) -> Option<StudentRecord> {
        let name = row.select(&self.student_name).next().map(element_text)?;
        let href = row
            .select(&self.attempt_link)
            .next()
            .and_then(|a| a.value().attr("href"))?;

        Some(StudentRecord {
            name,
            detail_url: self.normalize_link(href),
        })
    }

    /// 詳細ページから添付ファイルリンクを抽出
    pub fn extract_attachments(&self, detail_html: &str) -> Attachments {
        let document = Html::parse_document(detail_html);
        let Some(container) = document.select(&self.attachments).next() else {
            return Attachments::Missing;
        };

        let links = container
            .select(&self.anchor)
            .filter_map(|a| match a.value().attr("href") {
                Some(href) => Some(AttachmentLink {
                    file_name: element_text(a),
                    url: self.normalize_link(href),
                }),
                None => {
                    debug!("Skipping attachment anchor without href");
                    None
                }
            })
            .collect();

        Attachments::Links(links)
    }

    /// 「次へ」リンクを取得
    pub fn extract_next_page(&self, document: &Html) -> Option<String> {
        document
            .select(&self.next_page)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| self.normalize_link(href))
    }
}

/// ログインフォームの hidden `logintoken` を取得
pub fn extract_login_token(html: &str) -> Result<String, CollectorError> {
    let selector = parse_selector(r#"input[name="logintoken"]"#)?;
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|input| input.value().attr("value").unwrap_or_default().to_string())
        .ok_or_else(|| CollectorError::ElementNotFound("logintoken".into()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_selector(selector: &str) -> Result<Selector, CollectorError> {
    Selector::parse(selector)
        .map_err(|e| CollectorError::Selector(format!("'{}': {}", selector, e)))
}
