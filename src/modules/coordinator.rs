use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::errors::ErrorKind;
use crate::modules::service::UpdateService;
use crate::modules::types::{SettingsBlock, SettingsBlockKind};

/// The values the caller currently holds for every settings block. Blocks
/// are left raw so that one malformed block cannot reject the others.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SaveAllRequest {
    #[serde(default)]
    pub log: Value,
    #[serde(default)]
    pub proxy: Value,
    #[serde(default)]
    pub cookies: Value,
    #[serde(default)]
    pub wait_time: Value,
    #[serde(default)]
    pub llm: Value,
}

impl SaveAllRequest {
    fn take(&mut self, kind: SettingsBlockKind) -> Value {
        let slot = match kind {
            SettingsBlockKind::Log => &mut self.log,
            SettingsBlockKind::Proxy => &mut self.proxy,
            SettingsBlockKind::Cookies => &mut self.cookies,
            SettingsBlockKind::WaitTime => &mut self.wait_time,
            SettingsBlockKind::Llm => &mut self.llm,
        };
        slot.take()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BlockResult {
    Success { data: SettingsBlock },
    Error { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockOutcome {
    pub block: SettingsBlockKind,
    #[serde(flatten)]
    pub result: BlockResult,
}

impl BlockOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, BlockResult::Success { .. })
    }
}

impl fmt::Display for BlockOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            BlockResult::Success { .. } => write!(f, "{}: saved", self.block),
            BlockResult::Error { message, .. } => write!(f, "{}: {message}", self.block),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SaveAllReport {
    pub outcomes: Vec<BlockOutcome>,
}

impl SaveAllReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(BlockOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BlockOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn committed(&self) -> Vec<SettingsBlockKind> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.block)
            .collect()
    }

    pub fn summary(&self) -> String {
        let total = self.outcomes.len();
        let saved = self.committed().len();
        if saved == total {
            return format!("All {total} settings blocks saved");
        }
        let failed: Vec<String> = self.failures().map(|o| o.to_string()).collect();
        format!(
            "{saved} of {total} settings blocks saved; failed: {}",
            failed.join("; ")
        )
    }
}

/// Submits every settings block, strictly one after another in
/// `SettingsBlockKind::ALL` order. A failing block is recorded and the
/// remaining blocks are still attempted.
pub async fn save_all(service: &UpdateService, mut request: SaveAllRequest) -> SaveAllReport {
    let mut outcomes = Vec::with_capacity(SettingsBlockKind::ALL.len());

    for kind in SettingsBlockKind::ALL {
        let result = match service
            .update_settings_block(kind, request.take(kind))
            .await
        {
            Ok(data) => BlockResult::Success { data },
            Err(err) => {
                warn!("Save-all: {kind} block failed: {err}");
                BlockResult::Error {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        outcomes.push(BlockOutcome {
            block: kind,
            result,
        });
    }

    let report = SaveAllReport { outcomes };
    info!("Save-all finished: {}", report.summary());
    report
}
