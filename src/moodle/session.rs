//! 認証済みHTTPセッション
//!
//! クッキーストア付きの `reqwest::Client` を1つ保持し、ログインとその後の全GETを担う。

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::MoodleConfig;
use crate::error::CollectorError;
use crate::traits::PortalClient;

use super::parser::extract_login_token;

/// ログイン後のURLにこれが含まれていればログイン画面に戻されたと判断する
///
/// `/login/index.php` のディレクトリ部分。クエリやコース名に含まれる `login` には反応しない。
const LOGIN_PATH_MARKER: &str = "/login/";

pub struct MoodleSession {
    config: MoodleConfig,
    client: reqwest::Client,
}

impl MoodleSession {
    pub fn new(config: MoodleConfig) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CollectorError::ClientInit(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// ログイン実行 (失敗はすべて `false`)
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.try_login(username, password).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error during login: {}", e);
                false
            }
        }
    }

    /// ログイン実行 (失敗理由付き)
    ///
    /// ログインフォームから `logintoken` を取り出し、資格情報と一緒にPOSTする。
    /// ステータスが成功かつリダイレクト後のURLがログイン画面でなければ成功。
    pub async fn try_login(&self, username: &str, password: &str) -> Result<(), CollectorError> {
        let login_url = self.config.login_url();
        info!("Starting login process: user={}", username);

        let login_page = self
            .client
            .get(&login_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!("Fetched login form ({} bytes)", login_page.len());

        let logintoken = extract_login_token(&login_page)?;

        let form = [
            ("username", username),
            ("password", password),
            ("logintoken", logintoken.as_str()),
        ];
        let response = self.client.post(&login_url).form(&form).send().await?;

        let status = response.status();
        let final_url = response.url().clone();
        debug!("Login response: status={}, url={}", status, final_url);

        if !status.is_success() {
            return Err(CollectorError::Login(format!("HTTP {}", status)));
        }
        if final_url.as_str().contains(LOGIN_PATH_MARKER) {
            return Err(CollectorError::Login(
                "ログイン画面に戻されました (ユーザー名またはパスワードが不正)".into(),
            ));
        }

        info!("Login successful");
        Ok(())
    }
}

#[async_trait]
impl PortalClient for MoodleSession {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("GET {} failed: {}", url, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("GET {} -> {}", url, status);
            return None;
        }

        match response.bytes().await {
            Ok(body) => {
                debug!("GET {} -> {} ({} bytes)", url, status, body.len());
                Some(body.to_vec())
            }
            Err(e) => {
                warn!("Reading body of {} failed: {}", url, e);
                None
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, CollectorError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("GET {} -> {} (parsing error page body)", url, status);
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const SESSION_COOKIE: &str = "MoodleSession=s3cr3t";

    struct TestRequest {
        method: String,
        path: String,
        headers: String,
        body: String,
    }

    async fn read_request(stream: &mut TcpStream) -> Option<TestRequest> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.lines().next()?.split_whitespace();
        let method = request_line.next()?.to_string();
        let path = request_line.next()?.to_string();
        let body_end = buf.len().min(header_end + content_length);

        Some(TestRequest {
            method,
            path,
            headers: head,
            body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
        })
    }

    fn response(status: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
        let mut out = format!("HTTP/1.1 {}\r\n", status);
        for (k, v) in extra_headers {
            out.push_str(&format!("{}: {}\r\n", k, v));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));
        out
    }

    /// ログインフォーム、ダッシュボード、クッキー必須のページを持つ最小限のポータル
    fn portal(req: &TestRequest) -> String {
        let has_cookie = req.headers.contains(SESSION_COOKIE);
        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/login/index.php") => response(
                "200 OK",
                &[("Set-Cookie", "MoodleSession=s3cr3t; Path=/")],
                r#"<form><input type="hidden" name="logintoken" value="tok123"></form>"#,
            ),
            ("POST", "/login/index.php") => {
                let ok = has_cookie
                    && req.body.contains("username=instructor")
                    && req.body.contains("password=secret")
                    && req.body.contains("logintoken=tok123");
                let location = if ok { "/my/" } else { "/login/index.php" };
                response("303 See Other", &[("Location", location)], "")
            }
            ("GET", "/my/") => response("200 OK", &[], "dashboard"),
            ("GET", "/private/file.bin") if has_cookie => response("200 OK", &[], "payload"),
            ("GET", "/private/file.bin") => response("403 Forbidden", &[], "denied"),
            _ => response("404 Not Found", &[], "missing"),
        }
    }

    async fn spawn_portal(handler: fn(&TestRequest) -> String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    if let Some(req) = read_request(&mut stream).await {
                        let _ = stream.write_all(handler(&req).as_bytes()).await;
                        let _ = stream.shutdown().await;
                    }
                });
            }
        });

        format!("http://{}", addr)
    }

    fn session(base_url: &str) -> MoodleSession {
        let config = MoodleConfig::default()
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5));
        MoodleSession::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_login_success_keeps_session_cookie() {
        let base = spawn_portal(portal).await;
        let session = session(&base);

        assert!(session.login("instructor", "secret").await);

        let body = session.fetch(&format!("{}/private/file.bin", base)).await;
        assert_eq!(body.as_deref(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn test_login_rejected_credentials() {
        let base = spawn_portal(portal).await;
        let session = session(&base);

        let err = session.try_login("instructor", "wrong").await.unwrap_err();
        assert!(matches!(err, CollectorError::Login(_)));
        assert!(!session.login("instructor", "wrong").await);
    }

    #[tokio::test]
    async fn test_login_missing_token() {
        fn no_token(req: &TestRequest) -> String {
            match req.path.as_str() {
                "/login/index.php" => response("200 OK", &[], "<form></form>"),
                _ => response("404 Not Found", &[], ""),
            }
        }
        let base = spawn_portal(no_token).await;
        let session = session(&base);

        let err = session.try_login("instructor", "secret").await.unwrap_err();
        assert!(matches!(err, CollectorError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_login_network_error_is_false() {
        // 接続先がないポート
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        assert!(!session(&base).login("instructor", "secret").await);
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_none() {
        let base = spawn_portal(portal).await;
        let session = session(&base);

        assert!(session.fetch(&format!("{}/private/file.bin", base)).await.is_none());
        assert!(session.fetch(&format!("{}/nowhere", base)).await.is_none());
        assert_eq!(
            session.fetch_html(&format!("{}/my/", base)).await.as_deref(),
            Some("dashboard")
        );
    }

    #[tokio::test]
    async fn test_fetch_page_returns_error_status_body() {
        let base = spawn_portal(portal).await;
        let session = session(&base);

        let page = session.fetch_page(&format!("{}/private/file.bin", base)).await.unwrap();
        assert_eq!(page, "denied");
        let page = session.fetch_page(&format!("{}/nowhere", base)).await.unwrap();
        assert_eq!(page, "missing");
    }

    #[tokio::test]
    async fn test_fetch_page_transport_failure_is_err() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = session(&base).fetch_page(&format!("{}/report", base)).await.unwrap_err();
        assert!(matches!(err, CollectorError::Http(_)));
    }

    #[tokio::test]
    async fn test_login_word_outside_login_path_is_success() {
        fn redirect_with_login_query(req: &TestRequest) -> String {
            match (req.method.as_str(), req.path.as_str()) {
                ("GET", "/login/index.php") => response(
                    "200 OK",
                    &[],
                    r#"<input type="hidden" name="logintoken" value="tok123">"#,
                ),
                ("POST", "/login/index.php") => response(
                    "303 See Other",
                    &[("Location", "/course/view.php?id=5&ref=login")],
                    "",
                ),
                ("GET", "/course/view.php?id=5&ref=login") => response("200 OK", &[], "course"),
                _ => response("404 Not Found", &[], ""),
            }
        }
        let base = spawn_portal(redirect_with_login_query).await;

        assert!(session(&base).try_login("instructor", "secret").await.is_ok());
    }

    #[tokio::test]
    #[ignore] // 実環境テスト用: MOODLE_USERNAME / MOODLE_PASSWORD を設定して --ignored で実行
    async fn test_live_login() {
        let username = std::env::var("MOODLE_USERNAME").expect("MOODLE_USERNAME not set");
        let password = std::env::var("MOODLE_PASSWORD").expect("MOODLE_PASSWORD not set");

        let session = MoodleSession::new(MoodleConfig::default()).unwrap();
        assert!(session.login(&username, &password).await);
    }
}
