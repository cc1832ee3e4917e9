//! `AccountRepository` implementation for `FileStore`.

use async_trait::async_trait;

use datagram_orchestrator_core::error::CoreResult;
use datagram_orchestrator_core::traits::AccountRepository;
use datagram_orchestrator_core::types::Account;

use super::{read_json, remove_if_exists, write_json, FileStore};

impl FileStore {
    async fn read_accounts(&self) -> CoreResult<Vec<Account>> {
        Ok(read_json(&self.paths.token_cache_file())
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl AccountRepository for FileStore {
    async fn find_all(&self) -> CoreResult<Vec<Account>> {
        self.read_accounts().await
    }

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<Account>> {
        Ok(self
            .read_accounts()
            .await?
            .into_iter()
            .find(|account| account.token == token))
    }

    async fn save(&self, account: &Account) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.read_accounts().await?;
        match accounts.iter_mut().find(|a| a.token == account.token) {
            Some(existing) => *existing = account.clone(),
            None => accounts.push(account.clone()),
        }
        write_json(&self.paths.token_cache_file(), &accounts).await
    }

    async fn remove_by_token(&self, token: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.read_accounts().await?;
        let before = accounts.len();
        accounts.retain(|a| a.token != token);
        if accounts.len() == before {
            return Ok(());
        }
        write_json(&self.paths.token_cache_file(), &accounts).await
    }

    async fn clear(&self) -> CoreResult<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = remove_if_exists(&self.paths.token_cache_file()).await?;
        Ok(usize::from(removed))
    }
}
