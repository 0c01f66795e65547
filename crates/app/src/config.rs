use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use fiscus_import::StatementProfile;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the budget resource store.
    pub store_url: String,
    /// Budget the import targets.
    pub budget_id: String,
    /// Session database location; defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// CSV column mapping for the bank's statement exports.
    #[serde(default)]
    pub statement_profile: Option<StatementProfile>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("could not parse config at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses() {
        let config: Config = toml::from_str(
            r#"
            store_url = "https://budget.example.net/api"
            budget_id = "budget-1"
            "#,
        )
        .unwrap();
        assert_eq!(config.store_url, "https://budget.example.net/api");
        assert!(config.statement_profile.is_none());
    }

    #[test]
    fn statement_profile_is_configurable() {
        let config: Config = toml::from_str(
            r#"
            store_url = "https://budget.example.net/api"
            budget_id = "budget-1"

            [statement_profile]
            name = "My Bank"
            has_header = false
            delimiter = ";"

            [statement_profile.mapping]
            date_column = 1
            description_column = 3
            debit_column = 4
            credit_column = 5
            date_format = "%d.%m.%Y"
            "#,
        )
        .unwrap();
        let profile = config.statement_profile.unwrap();
        assert_eq!(profile.delimiter, ";");
        assert_eq!(profile.mapping.debit_column, Some(4));
        assert_eq!(profile.mapping.amount_column, None);
    }
}
