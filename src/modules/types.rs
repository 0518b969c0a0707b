use derive_more::with_trait::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, Display, Serialize, PartialEq, Eq)]
#[display(
    "{file} level={level} size={max_size}MB backups={max_backups} age={max_age}d gz={compress}"
)]
pub struct LogConfig {
    pub file: String,
    pub max_size: u64,
    pub max_backups: u64,
    pub max_age: u64,
    pub compress: bool,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: "logs/informer.log".to_string(),
            max_size: 10,
            max_backups: 5,
            max_age: 30,
            compress: true,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, Display, Serialize, PartialEq, Eq)]
#[display("proxy_pool_api={proxy_pool_api:?}")]
pub struct ProxyConfig {
    pub proxy_pool_api: String,
}

#[derive(Debug, Deserialize, Clone, Default, Display, Serialize, PartialEq, Eq)]
#[display("cookies=({} bytes)", cookies.len())]
pub struct CookieConfig {
    pub cookies: String,
}

/// Seconds to wait between two polls of the forum, picked uniformly in `min..=max`.
#[derive(Debug, Deserialize, Clone, Copy, Display, Serialize, PartialEq, Eq)]
#[display("{min}..{max}s")]
pub struct WaitTimeRange {
    pub min: u64,
    pub max: u64,
}

impl Default for WaitTimeRange {
    fn default() -> Self {
        Self { min: 30, max: 60 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, Display, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    #[display("openai")]
    OpenAi,
    #[display("deepseek")]
    DeepSeek,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "deepseek" => Some(Self::DeepSeek),
            _ => None,
        }
    }
}

// The api key never goes into log lines.
#[derive(Debug, Deserialize, Clone, Display, Serialize, PartialEq, Eq)]
#[display("provider={provider} model={model} base_url={base_url}")]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    #[serde(default)]
    pub provider: LlmProvider,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            provider: LlmProvider::OpenAi,
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub wait_time: WaitTimeRange,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone, Display, Serialize, PartialEq, Eq)]
#[display("{phone} (always_at={always_at}, {} keywords)", keywords.len())]
pub struct Recipient {
    pub phone: String,
    #[serde(default)]
    pub always_at: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Recipient {
    pub fn new(phone: impl Into<String>, always_at: bool) -> Self {
        Self {
            phone: phone.into(),
            always_at,
            keywords: Vec::new(),
        }
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }
}

/// A webhook notification target. `index` is its position in the robot list
/// and never changes once assigned.
#[derive(Debug, Deserialize, Clone, Display, Serialize, PartialEq, Eq)]
#[display("#{index} {name:?}")]
pub struct Robot {
    pub index: usize,
    pub name: String,
    pub token: String,
    pub secret: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub receive_all: bool,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

fn enabled_by_default() -> bool {
    true
}

impl Robot {
    pub fn recipient(&self, phone: &str) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.phone == phone)
    }
}

#[derive(Debug, Deserialize, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ConfigState {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub robots: Vec<Robot>,
}

/// Names of the independently editable settings blocks, in save-all order.
#[derive(Debug, Clone, Copy, Display, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SettingsBlockKind {
    #[display("log")]
    Log,
    #[display("proxy")]
    Proxy,
    #[display("cookies")]
    Cookies,
    #[display("wait_time")]
    WaitTime,
    #[display("llm")]
    Llm,
}

impl SettingsBlockKind {
    pub const ALL: [SettingsBlockKind; 5] = [
        SettingsBlockKind::Log,
        SettingsBlockKind::Proxy,
        SettingsBlockKind::Cookies,
        SettingsBlockKind::WaitTime,
        SettingsBlockKind::Llm,
    ];
}

#[derive(Debug, Clone, Display, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SettingsBlock {
    Log(LogConfig),
    Proxy(ProxyConfig),
    Cookies(CookieConfig),
    WaitTime(WaitTimeRange),
    Llm(LlmConfig),
}

impl Settings {
    pub fn block(&self, kind: SettingsBlockKind) -> SettingsBlock {
        match kind {
            SettingsBlockKind::Log => SettingsBlock::Log(self.log.clone()),
            SettingsBlockKind::Proxy => SettingsBlock::Proxy(self.proxy.clone()),
            SettingsBlockKind::Cookies => SettingsBlock::Cookies(self.cookies.clone()),
            SettingsBlockKind::WaitTime => SettingsBlock::WaitTime(self.wait_time),
            SettingsBlockKind::Llm => SettingsBlock::Llm(self.llm.clone()),
        }
    }
}
