use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("HTTPクライアント初期化エラー: {0}")]
    ClientInit(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("ログインエラー: {0}")]
    Login(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("セレクタ解析エラー: {0}")]
    Selector(String),

    #[error("アーカイブ作成エラー: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}
