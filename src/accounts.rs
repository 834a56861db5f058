//! Account attribution: maps a project key to a worklog account and attaches it as a work attribute.

use std::collections::BTreeMap;

use crate::config::{AccountSettings, ConfigStore, SettingUpdate};
use crate::error::Result;
use crate::model::WorklogAttribute;
use crate::prompt::{confirm, LinePrompt, Terminal};
use crate::services::{ServiceResult, WorklogService};
use crate::summary::SkipReason;

#[derive(Debug, Clone, PartialEq)]
pub enum Attribution {
    Inactive,
    Attached(WorklogAttribute),
    Skipped(SkipReason),
    /// The account list could not be fetched; carries the error text.
    Unavailable(String),
}

pub struct AccountAttributor {
    attribute_key: Option<String>,
    mapping: BTreeMap<String, String>,
    known_accounts: Option<Vec<String>>,
}

impl AccountAttributor {
    pub fn from_settings(settings: &AccountSettings) -> Self {
        let key = settings.account_attribute_key.trim();
        Self {
            attribute_key: (settings.use_accounts && !key.is_empty()).then(|| key.to_string()),
            mapping: settings.project_accounts.clone(),
            known_accounts: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.attribute_key.is_some()
    }

    /// Account mapped to `project` in this session, persisted or not.
    pub fn mapped_account(&self, project: &str) -> Option<&str> {
        self.mapping.get(project).map(String::as_str)
    }

    pub async fn attribute<T>(
        &mut self,
        project: &str,
        worklogs: &dyn WorklogService,
        store: &mut ConfigStore,
        terminal: &T,
    ) -> Result<Attribution>
    where
        T: Terminal + ?Sized,
    {
        let Some(attribute_key) = self.attribute_key.clone() else {
            return Ok(Attribution::Inactive);
        };

        if let Some(account) = self.mapping.get(project) {
            return Ok(Attribution::Attached(WorklogAttribute {
                key: attribute_key,
                value: account.clone(),
            }));
        }

        log::info!("No account configured for project {}", project);
        let message = format!("Enter account key for project {}: ", project);
        let account = LinePrompt::new(&message)
            .retry_message("Account key must not be empty: ")
            .ask(terminal, |input| !input.is_empty())
            .await?;

        match self.account_exists(&account, worklogs).await {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Account {} does not exist", account);
                return Ok(Attribution::Skipped(SkipReason::UnknownAccount));
            }
            Err(err) => return Ok(Attribution::Unavailable(format!("could not fetch accounts: {}", err))),
        }

        let question = format!("Save account key {} for project {} to config? (y/n) ", account, project);
        if confirm(terminal, &question).await? {
            let update = SettingUpdate::ProjectAccount {
                project: project.to_string(),
                account: account.clone(),
            };
            match store.apply(update) {
                Ok(()) => log::info!("✓ Saved account {} for project {}", account, project),
                Err(err) => log::warn!("Could not save account mapping: {}", err),
            }
        }
        self.mapping.insert(project.to_string(), account.clone());

        Ok(Attribution::Attached(WorklogAttribute {
            key: attribute_key,
            value: account,
        }))
    }

    /// A failed fetch is not cached, so the next entry tries again.
    async fn account_exists(&mut self, account: &str, worklogs: &dyn WorklogService) -> ServiceResult<bool> {
        if self.known_accounts.is_none() {
            self.known_accounts = Some(worklogs.list_accounts().await?);
        }
        Ok(self
            .known_accounts
            .as_ref()
            .is_some_and(|accounts| accounts.iter().any(|known| known == account)))
    }
}
