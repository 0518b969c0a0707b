use std::sync::Arc;

use serde_json::Value;

use crate::modules::errors::{PersistenceError, UpdateError};
use crate::modules::graph::Mutation;
use crate::modules::requests::{
    AddRobotRequest, AddUserRequest, CookiesForm, DeleteUserRequest, KeywordRequest, LlmForm,
    LogConfigForm, ProxyForm, UpdateRobotRequest, WaitTimeForm, parse_form,
};
use crate::modules::store::ConfigStore;
use crate::modules::types::{ConfigState, Recipient, Robot, SettingsBlock, SettingsBlockKind};

/// Validates update requests and commits them to the store, one atomic
/// mutation per call. Each call returns the entity as committed.
#[derive(Clone)]
pub struct UpdateService {
    store: Arc<ConfigStore>,
}

impl UpdateService {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<ConfigState> {
        self.store.snapshot()
    }

    async fn commit(&self, mutation: Mutation) -> Result<Arc<ConfigState>, UpdateError> {
        let store = Arc::clone(&self.store);
        // Runs on its own task so that a dropped caller cannot cancel a write halfway.
        tokio::spawn(async move { store.apply(mutation).await })
            .await
            .map_err(|err| PersistenceError::Aborted(err.to_string()))?
    }

    pub async fn update_settings_block(
        &self,
        kind: SettingsBlockKind,
        fields: Value,
    ) -> Result<SettingsBlock, UpdateError> {
        let mutation = match kind {
            SettingsBlockKind::Log => {
                Mutation::ReplaceLog(parse_form::<LogConfigForm>(kind, fields)?.validate()?)
            }
            SettingsBlockKind::Proxy => {
                Mutation::ReplaceProxy(parse_form::<ProxyForm>(kind, fields)?.validate()?)
            }
            SettingsBlockKind::Cookies => {
                Mutation::ReplaceCookies(parse_form::<CookiesForm>(kind, fields)?.validate()?)
            }
            SettingsBlockKind::WaitTime => {
                Mutation::ReplaceWaitTime(parse_form::<WaitTimeForm>(kind, fields)?.validate()?)
            }
            SettingsBlockKind::Llm => {
                Mutation::ReplaceLlm(parse_form::<LlmForm>(kind, fields)?.validate()?)
            }
        };
        let state = self.commit(mutation).await?;
        Ok(state.settings.block(kind))
    }

    pub async fn add_robot(&self, request: AddRobotRequest) -> Result<Robot, UpdateError> {
        let state = self.commit(request.into_mutation()?).await?;
        let index = state.robots.len().saturating_sub(1);
        Ok(state.robot(index)?.clone())
    }

    pub async fn update_robot(&self, request: UpdateRobotRequest) -> Result<Robot, UpdateError> {
        let index = request.robot_index;
        let state = self.commit(request.into_mutation()?).await?;
        Ok(state.robot(index)?.clone())
    }

    pub async fn add_user(&self, request: AddUserRequest) -> Result<Recipient, UpdateError> {
        let robot_index = request.robot_index;
        let phone = request.phone.trim().to_string();
        let state = self.commit(request.into_mutation()?).await?;
        Ok(state.recipient(robot_index, &phone)?.clone())
    }

    pub async fn delete_user(&self, request: DeleteUserRequest) -> Result<Robot, UpdateError> {
        let robot_index = request.robot_index;
        let state = self.commit(request.into_mutation()?).await?;
        Ok(state.robot(robot_index)?.clone())
    }

    pub async fn add_keyword(&self, request: KeywordRequest) -> Result<Recipient, UpdateError> {
        let robot_index = request.robot_index;
        let phone = request.phone.trim().to_string();
        let state = self.commit(request.into_add()?).await?;
        Ok(state.recipient(robot_index, &phone)?.clone())
    }

    pub async fn delete_keyword(&self, request: KeywordRequest) -> Result<Recipient, UpdateError> {
        let robot_index = request.robot_index;
        let phone = request.phone.trim().to_string();
        let state = self.commit(request.into_delete()?).await?;
        Ok(state.recipient(robot_index, &phone)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::errors::{ConflictError, ValidationError};
    use crate::modules::types::{LogConfig, WaitTimeRange};
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_service() -> (TempDir, UpdateService) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.toml"))
            .await
            .unwrap();
        (dir, UpdateService::new(Arc::new(store)))
    }

    fn ops_bot() -> AddRobotRequest {
        AddRobotRequest {
            name: "Ops Bot".to_string(),
            token: "tok123".to_string(),
            secret: "sec456".to_string(),
            receive_all: false,
        }
    }

    fn keyword(keyword: &str) -> KeywordRequest {
        KeywordRequest {
            robot_index: 0,
            phone: "13800000000".to_string(),
            keyword: keyword.to_string(),
        }
    }

    #[tokio::test]
    async fn test_inverted_wait_time_changes_nothing() {
        let (_dir, service) = test_service().await;
        let before = service.store().get_settings();

        let err = service
            .update_settings_block(SettingsBlockKind::WaitTime, json!({"min": 120, "max": 60}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UpdateError::Validation(ValidationError::WaitTimeRange { min: 120, max: 60 })
        ));
        assert_eq!(service.store().get_settings(), before);
    }

    #[tokio::test]
    async fn test_log_block_round_trip() {
        let (_dir, service) = test_service().await;
        let before = service.store().get_settings();

        let block = service
            .update_settings_block(
                SettingsBlockKind::Log,
                json!({
                    "file": "logs/informer.log",
                    "max_size": 10,
                    "max_backups": 5,
                    "max_age": 30,
                    "compress": true,
                    "level": "debug"
                }),
            )
            .await
            .unwrap();

        let expected = LogConfig {
            level: "debug".to_string(),
            ..LogConfig::default()
        };
        assert_eq!(block, SettingsBlock::Log(expected.clone()));

        let after = service.store().get_settings();
        assert_eq!(after.log, expected);
        assert_eq!(after.wait_time, before.wait_time);
        assert_eq!(after.llm, before.llm);
    }

    #[tokio::test]
    async fn test_wait_time_block_only_touches_wait_time() {
        let (_dir, service) = test_service().await;
        service
            .update_settings_block(SettingsBlockKind::Cookies, json!({"cookies": "sid=1"}))
            .await
            .unwrap();

        service
            .update_settings_block(SettingsBlockKind::WaitTime, json!({"min": 10, "max": 20}))
            .await
            .unwrap();

        let settings = service.store().get_settings();
        assert_eq!(settings.wait_time, WaitTimeRange { min: 10, max: 20 });
        assert_eq!(settings.cookies.cookies, "sid=1");
    }

    #[tokio::test]
    async fn test_add_robot_defaults_to_enabled() {
        let (_dir, service) = test_service().await;
        let first = service.add_robot(ops_bot()).await.unwrap();
        let second = service
            .add_robot(AddRobotRequest {
                name: "Deals".to_string(),
                receive_all: true,
                ..ops_bot()
            })
            .await
            .unwrap();

        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert!(first.enabled && second.enabled);
        assert!(second.receive_all);
    }

    #[tokio::test]
    async fn test_update_unknown_robot_is_a_conflict() {
        let (_dir, service) = test_service().await;
        let err = service
            .update_robot(UpdateRobotRequest {
                robot_index: 2,
                robot_data: crate::modules::requests::RobotData {
                    name: "ghost".to_string(),
                    token: String::new(),
                    secret: String::new(),
                    enabled: false,
                    receive_all: false,
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Conflict(ConflictError::RobotNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_phone_adds_exactly_one_recipient() {
        let (_dir, service) = test_service().await;
        service.add_robot(ops_bot()).await.unwrap();
        let request = AddUserRequest {
            robot_index: 0,
            phone: "13800000000".to_string(),
            always_at: false,
        };

        let first = service.add_user(request.clone()).await;
        let second = service.add_user(request).await;

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(UpdateError::Conflict(ConflictError::DuplicatePhone { .. }))
        ));
        assert_eq!(service.store().get_robots()[0].recipients.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_keyword_is_stored_once() {
        let (_dir, service) = test_service().await;
        service.add_robot(ops_bot()).await.unwrap();
        service
            .add_user(AddUserRequest {
                robot_index: 0,
                phone: "13800000000".to_string(),
                always_at: false,
            })
            .await
            .unwrap();

        service.add_keyword(keyword("outage")).await.unwrap();
        let err = service.add_keyword(keyword("outage")).await.unwrap_err();

        assert!(matches!(
            err,
            UpdateError::Conflict(ConflictError::DuplicateKeyword { .. })
        ));
        let robots = service.store().get_robots();
        assert_eq!(robots[0].recipients[0].keywords, ["outage"]);
    }

    #[tokio::test]
    async fn test_delete_user_takes_keywords_along() {
        let (_dir, service) = test_service().await;
        service.add_robot(ops_bot()).await.unwrap();
        service
            .add_user(AddUserRequest {
                robot_index: 0,
                phone: "13800000000".to_string(),
                always_at: true,
            })
            .await
            .unwrap();
        service.add_keyword(keyword("outage")).await.unwrap();
        service.add_keyword(keyword("4090")).await.unwrap();

        let robot = service
            .delete_user(DeleteUserRequest {
                robot_index: 0,
                phone: "13800000000".to_string(),
            })
            .await
            .unwrap();

        assert!(robot.recipients.is_empty());
        let err = service.add_keyword(keyword("outage")).await.unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Conflict(ConflictError::RecipientNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_keyword_lifecycle_keeps_recipient() {
        let (_dir, service) = test_service().await;
        let robot = service.add_robot(ops_bot()).await.unwrap();
        assert_eq!(robot.index, 0);

        let recipient = service
            .add_user(AddUserRequest {
                robot_index: 0,
                phone: "13800000000".to_string(),
                always_at: true,
            })
            .await
            .unwrap();
        assert!(recipient.always_at);

        let recipient = service.add_keyword(keyword("outage")).await.unwrap();
        assert_eq!(recipient.keywords, ["outage"]);

        let recipient = service.delete_keyword(keyword("outage")).await.unwrap();
        assert!(recipient.keywords.is_empty());

        let robots = service.store().get_robots();
        assert_eq!(robots[0].recipients.len(), 1);
        assert_eq!(robots[0].recipients[0].phone, "13800000000");
    }
}
