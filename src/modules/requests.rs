use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::modules::errors::ValidationError;
use crate::modules::graph::{LlmUpdate, Mutation, RobotFields};
use crate::modules::types::{CookieConfig, LlmProvider, LogConfig, ProxyConfig, WaitTimeRange};
use crate::modules::validation::{log_level, non_empty, non_negative, optional_url, wait_time};

pub fn parse_form<T: DeserializeOwned>(
    what: impl Display,
    fields: Value,
) -> Result<T, ValidationError> {
    if fields.is_null() {
        return Err(ValidationError::Malformed {
            what: what.to_string(),
            reason: "no values submitted".to_string(),
        });
    }
    serde_json::from_value(fields).map_err(|err| ValidationError::Malformed {
        what: what.to_string(),
        reason: err.to_string(),
    })
}

// The panel reads robot indexes from form inputs and phones/keywords from
// jQuery `.data()`, so either may arrive as a string or as a number.
fn index_text_or_number<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| de::Error::custom(format!("invalid robot index {n}"))),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid robot index {text:?}"))),
        other => Err(de::Error::custom(format!("expected a robot index, got {other}"))),
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected text, got {other}"))),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfigForm {
    pub file: String,
    pub max_size: i64,
    pub max_backups: i64,
    pub max_age: i64,
    pub compress: bool,
    pub level: String,
}

impl LogConfigForm {
    pub fn validate(self) -> Result<LogConfig, ValidationError> {
        Ok(LogConfig {
            file: non_empty("file", &self.file)?,
            max_size: non_negative("max_size", self.max_size)?,
            max_backups: non_negative("max_backups", self.max_backups)?,
            max_age: non_negative("max_age", self.max_age)?,
            compress: self.compress,
            level: log_level(&self.level)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyForm {
    pub proxy_pool_api: String,
}

impl ProxyForm {
    pub fn validate(self) -> Result<ProxyConfig, ValidationError> {
        Ok(ProxyConfig {
            proxy_pool_api: optional_url("proxy_pool_api", &self.proxy_pool_api)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookiesForm {
    pub cookies: String,
}

impl CookiesForm {
    // Cookie text is pasted verbatim from a browser; only the outer whitespace goes.
    pub fn validate(self) -> Result<CookieConfig, ValidationError> {
        Ok(CookieConfig {
            cookies: self.cookies.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaitTimeForm {
    pub min: i64,
    pub max: i64,
}

impl WaitTimeForm {
    pub fn validate(self) -> Result<WaitTimeRange, ValidationError> {
        wait_time(self.min, self.max)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmForm {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl LlmForm {
    pub fn validate(self) -> Result<LlmUpdate, ValidationError> {
        let provider = match self.provider.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(
                LlmProvider::parse(name)
                    .ok_or_else(|| ValidationError::UnknownProvider(name.to_string()))?,
            ),
        };
        Ok(LlmUpdate {
            api_key: self.api_key.trim().to_string(),
            base_url: optional_url("base_url", &self.base_url)?,
            model: self.model.trim().to_string(),
            provider,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddRobotRequest {
    pub name: String,
    pub token: String,
    pub secret: String,
    pub receive_all: bool,
}

impl AddRobotRequest {
    pub fn into_mutation(self) -> Result<Mutation, ValidationError> {
        Ok(Mutation::AddRobot {
            name: non_empty("name", &self.name)?,
            token: self.token.trim().to_string(),
            secret: self.secret.trim().to_string(),
            receive_all: self.receive_all,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotData {
    pub name: String,
    pub token: String,
    pub secret: String,
    pub enabled: bool,
    pub receive_all: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateRobotRequest {
    #[serde(deserialize_with = "index_text_or_number")]
    pub robot_index: usize,
    pub robot_data: RobotData,
}

impl UpdateRobotRequest {
    pub fn into_mutation(self) -> Result<Mutation, ValidationError> {
        let data = self.robot_data;
        Ok(Mutation::UpdateRobot {
            index: self.robot_index,
            fields: RobotFields {
                name: non_empty("name", &data.name)?,
                token: data.token.trim().to_string(),
                secret: data.secret.trim().to_string(),
                enabled: data.enabled,
                receive_all: data.receive_all,
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddUserRequest {
    #[serde(deserialize_with = "index_text_or_number")]
    pub robot_index: usize,
    #[serde(deserialize_with = "text_or_number")]
    pub phone: String,
    pub always_at: bool,
}

impl AddUserRequest {
    pub fn into_mutation(self) -> Result<Mutation, ValidationError> {
        Ok(Mutation::AddUser {
            robot_index: self.robot_index,
            phone: non_empty("phone", &self.phone)?,
            always_at: self.always_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeleteUserRequest {
    #[serde(deserialize_with = "index_text_or_number")]
    pub robot_index: usize,
    #[serde(deserialize_with = "text_or_number")]
    pub phone: String,
}

impl DeleteUserRequest {
    pub fn into_mutation(self) -> Result<Mutation, ValidationError> {
        Ok(Mutation::DeleteUser {
            robot_index: self.robot_index,
            phone: non_empty("phone", &self.phone)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeywordRequest {
    #[serde(deserialize_with = "index_text_or_number")]
    pub robot_index: usize,
    #[serde(deserialize_with = "text_or_number")]
    pub phone: String,
    #[serde(deserialize_with = "text_or_number")]
    pub keyword: String,
}

impl KeywordRequest {
    fn normalized(self) -> Result<(usize, String, String), ValidationError> {
        Ok((
            self.robot_index,
            non_empty("phone", &self.phone)?,
            non_empty("keyword", &self.keyword)?,
        ))
    }

    pub fn into_add(self) -> Result<Mutation, ValidationError> {
        let (robot_index, phone, keyword) = self.normalized()?;
        Ok(Mutation::AddKeyword {
            robot_index,
            phone,
            keyword,
        })
    }

    pub fn into_delete(self) -> Result<Mutation, ValidationError> {
        let (robot_index, phone, keyword) = self.normalized()?;
        Ok(Mutation::DeleteKeyword {
            robot_index,
            phone,
            keyword,
        })
    }
}
