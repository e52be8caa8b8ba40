use async_trait::async_trait;

use crate::error::CollectorError;

/// 認証済みセッションでのGET取得
#[async_trait]
pub trait PortalClient: Send + Sync {
    /// URLの生バイト列を取得
    ///
    /// 成功ステータスのときだけ本文を返す。
    /// ネットワークエラーや4xx/5xxはすべて `None` にまとめる。
    async fn fetch(&self, url: &str) -> Option<Vec<u8>>;

    /// HTMLページを取得 (UTF-8として不正なバイトは置換)
    async fn fetch_html(&self, url: &str) -> Option<String> {
        self.fetch(url)
            .await
            .map(|body| String::from_utf8_lossy(&body).into_owned())
    }

    /// ステータスに関係なくページ本文を取得
    ///
    /// 通信自体の失敗だけを `Err` とする。4xx/5xxのエラーページも本文として返す。
    async fn fetch_page(&self, url: &str) -> Result<String, CollectorError> {
        self.fetch_html(url)
            .await
            .ok_or_else(|| CollectorError::Navigation(format!("ページを取得できません: {}", url)))
    }
}
