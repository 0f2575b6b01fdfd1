use serde::Deserialize;
use serde::Serialize;

use crate::ConfigKey;
use crate::Error;
use crate::Result;

/// One `[[subscribe]]` declaration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Group name; may contain `*`
    pub group: String,
    /// Data id; may contain `*`
    pub id: String,
    /// Name of the registered handler receiving values
    pub handler: String,
}

impl SubscriptionConfig {
    pub fn new(
        group: impl Into<String>,
        id: impl Into<String>,
        handler: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
            handler: handler.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.group.is_empty() {
            return Err(Error::InvalidConfig("subscribe var group is empty".into()));
        }
        if self.id.is_empty() {
            return Err(Error::InvalidConfig("subscribe var id is empty".into()));
        }
        if self.handler.is_empty() {
            return Err(Error::InvalidConfig("subscribe var handler is empty".into()));
        }
        Ok(())
    }

    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(&self.group, &self.id)
    }

    pub fn is_pattern(&self) -> bool {
        self.key().is_pattern()
    }
}
