use serde::{Deserialize, Serialize};

use spacegov_common::{Configuration, LoggingConfig, Result};
use spacegov_governance::GovernanceConfig;

/// Configuration of the spacegov binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Configuration for AppConfig {
    fn validate(&self) -> Result<()> {
        self.governance.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
