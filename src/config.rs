use std::time::Duration;

/// ポータルのベースオリジン (デフォルト)
pub const DEFAULT_BASE_URL: &str = "https://moodle.ufar.am";

/// ログインエンドポイントのパス
pub const LOGIN_PATH: &str = "/login/index.php";

const DEFAULT_USER_AGENT: &str = concat!("moodle-collector/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct MoodleConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for MoodleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl MoodleConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// 末尾の `/` は取り除いて保持する (正規化時に `/path` を連結するため)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// ログインページのURL
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, LOGIN_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MoodleConfig::new("user", "pass")
            .with_base_url("https://lms.example.edu/")
            .with_timeout(Duration::from_secs(120))
            .with_connect_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");

        assert_eq!(config.username, "user");
        assert_eq!(config.password, "pass");
        assert_eq!(config.base_url, "https://lms.example.edu");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_login_url() {
        let config = MoodleConfig::default();
        assert_eq!(config.login_url(), "https://moodle.ufar.am/login/index.php");
    }
}
