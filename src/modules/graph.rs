use std::collections::HashSet;

use derive_more::with_trait::Display;

use crate::modules::errors::{ConflictError, UpdateError, ValidationError};
use crate::modules::types::{
    ConfigState, CookieConfig, LlmConfig, LlmProvider, LogConfig, ProxyConfig, Recipient, Robot,
    WaitTimeRange,
};

/// New LLM credentials. A `None` provider keeps the one already stored.
#[derive(Debug, Clone, Display, PartialEq, Eq)]
#[display("model={model} base_url={base_url}")]
pub struct LlmUpdate {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub provider: Option<LlmProvider>,
}

#[derive(Debug, Clone, Display, PartialEq, Eq)]
#[display("name={name:?} enabled={enabled} receive_all={receive_all}")]
pub struct RobotFields {
    pub name: String,
    pub token: String,
    pub secret: String,
    pub enabled: bool,
    pub receive_all: bool,
}

#[derive(Debug, Clone, Display, PartialEq, Eq)]
pub enum Mutation {
    #[display("replace log config ({_0})")]
    ReplaceLog(LogConfig),
    #[display("replace proxy config ({_0})")]
    ReplaceProxy(ProxyConfig),
    #[display("replace cookies ({_0})")]
    ReplaceCookies(CookieConfig),
    #[display("replace wait time ({_0})")]
    ReplaceWaitTime(WaitTimeRange),
    #[display("replace llm config ({_0})")]
    ReplaceLlm(LlmUpdate),
    #[display("add robot {name:?} (receive_all={receive_all})")]
    AddRobot {
        name: String,
        token: String,
        secret: String,
        receive_all: bool,
    },
    #[display("update robot {index} ({fields})")]
    UpdateRobot { index: usize, fields: RobotFields },
    #[display("add user {phone} to robot {robot_index} (always_at={always_at})")]
    AddUser {
        robot_index: usize,
        phone: String,
        always_at: bool,
    },
    #[display("delete user {phone} from robot {robot_index}")]
    DeleteUser { robot_index: usize, phone: String },
    #[display("add keyword {keyword:?} to user {phone} of robot {robot_index}")]
    AddKeyword {
        robot_index: usize,
        phone: String,
        keyword: String,
    },
    #[display("delete keyword {keyword:?} from user {phone} of robot {robot_index}")]
    DeleteKeyword {
        robot_index: usize,
        phone: String,
        keyword: String,
    },
}

impl ConfigState {
    pub fn robot(&self, index: usize) -> Result<&Robot, ConflictError> {
        self.robots
            .get(index)
            .ok_or(ConflictError::RobotNotFound(index))
    }

    fn robot_mut(&mut self, index: usize) -> Result<&mut Robot, ConflictError> {
        self.robots
            .get_mut(index)
            .ok_or(ConflictError::RobotNotFound(index))
    }

    pub fn recipient(&self, robot_index: usize, phone: &str) -> Result<&Recipient, ConflictError> {
        self.robot(robot_index)?
            .recipient(phone)
            .ok_or_else(|| ConflictError::RecipientNotFound {
                robot_index,
                phone: phone.to_string(),
            })
    }

    fn recipient_mut(
        &mut self,
        robot_index: usize,
        phone: &str,
    ) -> Result<&mut Recipient, ConflictError> {
        self.robot_mut(robot_index)?
            .recipients
            .iter_mut()
            .find(|r| r.phone == phone)
            .ok_or_else(|| ConflictError::RecipientNotFound {
                robot_index,
                phone: phone.to_string(),
            })
    }

    /// Applies `mutation` in place. On error `self` may be half-changed, so
    /// callers work on a copy and drop it on failure.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), UpdateError> {
        match mutation {
            Mutation::ReplaceLog(log) => self.settings.log = log.clone(),
            Mutation::ReplaceProxy(proxy) => self.settings.proxy = proxy.clone(),
            Mutation::ReplaceCookies(cookies) => self.settings.cookies = cookies.clone(),
            Mutation::ReplaceWaitTime(range) => {
                if range.min > range.max {
                    return Err(ValidationError::WaitTimeRange {
                        min: range.min,
                        max: range.max,
                    }
                    .into());
                }
                self.settings.wait_time = *range;
            }
            Mutation::ReplaceLlm(update) => {
                self.settings.llm = LlmConfig {
                    api_key: update.api_key.clone(),
                    base_url: update.base_url.clone(),
                    provider: update.provider.unwrap_or(self.settings.llm.provider),
                    model: update.model.clone(),
                };
            }
            Mutation::AddRobot {
                name,
                token,
                secret,
                receive_all,
            } => {
                let index = self.robots.len();
                self.robots.push(Robot {
                    index,
                    name: name.clone(),
                    token: token.clone(),
                    secret: secret.clone(),
                    enabled: true,
                    receive_all: *receive_all,
                    recipients: Vec::new(),
                });
            }
            Mutation::UpdateRobot { index, fields } => {
                let robot = self.robot_mut(*index)?;
                robot.name = fields.name.clone();
                robot.token = fields.token.clone();
                robot.secret = fields.secret.clone();
                robot.enabled = fields.enabled;
                robot.receive_all = fields.receive_all;
            }
            Mutation::AddUser {
                robot_index,
                phone,
                always_at,
            } => {
                let robot = self.robot_mut(*robot_index)?;
                if robot.recipient(phone).is_some() {
                    return Err(ConflictError::DuplicatePhone {
                        robot_index: *robot_index,
                        phone: phone.clone(),
                    }
                    .into());
                }
                robot.recipients.push(Recipient::new(phone.clone(), *always_at));
            }
            Mutation::DeleteUser { robot_index, phone } => {
                let robot = self.robot_mut(*robot_index)?;
                let position = robot
                    .recipients
                    .iter()
                    .position(|r| &r.phone == phone)
                    .ok_or_else(|| ConflictError::RecipientNotFound {
                        robot_index: *robot_index,
                        phone: phone.clone(),
                    })?;
                // Keywords are owned by the recipient and go with it.
                robot.recipients.remove(position);
            }
            Mutation::AddKeyword {
                robot_index,
                phone,
                keyword,
            } => {
                let recipient = self.recipient_mut(*robot_index, phone)?;
                if recipient.has_keyword(keyword) {
                    return Err(ConflictError::DuplicateKeyword {
                        robot_index: *robot_index,
                        phone: phone.clone(),
                        keyword: keyword.clone(),
                    }
                    .into());
                }
                recipient.keywords.push(keyword.clone());
            }
            Mutation::DeleteKeyword {
                robot_index,
                phone,
                keyword,
            } => {
                let recipient = self.recipient_mut(*robot_index, phone)?;
                let position = recipient
                    .keywords
                    .iter()
                    .position(|k| k == keyword)
                    .ok_or_else(|| ConflictError::KeywordNotFound {
                        robot_index: *robot_index,
                        phone: phone.clone(),
                        keyword: keyword.clone(),
                    })?;
                recipient.keywords.remove(position);
            }
        }
        Ok(())
    }

    /// Checks a state that did not come through `apply`, e.g. one read from disk.
    pub fn check_invariants(&self) -> Result<(), String> {
        let range = self.settings.wait_time;
        if range.min > range.max {
            return Err(ValidationError::WaitTimeRange {
                min: range.min,
                max: range.max,
            }
            .to_string());
        }

        for (position, robot) in self.robots.iter().enumerate() {
            if robot.index != position {
                return Err(format!(
                    "robot at position {position} carries index {}",
                    robot.index
                ));
            }

            let mut phones = HashSet::new();
            for recipient in &robot.recipients {
                if !phones.insert(recipient.phone.as_str()) {
                    return Err(ConflictError::DuplicatePhone {
                        robot_index: position,
                        phone: recipient.phone.clone(),
                    }
                    .to_string());
                }

                let mut keywords = HashSet::new();
                for keyword in &recipient.keywords {
                    if !keywords.insert(keyword.as_str()) {
                        return Err(ConflictError::DuplicateKeyword {
                            robot_index: position,
                            phone: recipient.phone.clone(),
                            keyword: keyword.clone(),
                        }
                        .to_string());
                    }
                }
            }
        }
        Ok(())
    }
}
