//! In-process [`Memory`] [`Cache`].

use std::{collections::HashMap, sync::Arc};

use common::operations::{By, Delete, Insert, Select};
use tokio::sync::Mutex;
use tracerr::Traced;

use crate::{
    domain::user::{password_reset, PasswordReset},
    infra::{cache, Cache},
};

/// [`Cache`] keeping its entries in the memory of the current process.
///
/// Entries are lost on restart and aren't shared between multiple instances
/// of the application.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`PasswordReset`]s.
    password_resets: Arc<Mutex<HashMap<password_reset::Token, PasswordReset>>>,
}

impl Memory {
    /// Creates a new empty [`Memory`] [`Cache`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns number of the stored [`PasswordReset`]s, expired included.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.password_resets.lock().await.len()
    }
}

impl Cache<Insert<PasswordReset>> for Memory {
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Insert(reset): Insert<PasswordReset>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(
            self.password_resets
                .lock()
                .await
                .insert(reset.token.clone(), reset),
        );
        Ok(())
    }
}

impl<'t> Cache<Select<By<Option<PasswordReset>, &'t password_reset::Token>>>
    for Memory
{
    type Ok = Option<PasswordReset>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<PasswordReset>, &'t password_reset::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        Ok(self
            .password_resets
            .lock()
            .await
            .get(token)
            .filter(|r| !r.expires_at.is_elapsed())
            .cloned())
    }
}

impl<'t> Cache<Delete<By<Option<PasswordReset>, &'t password_reset::Token>>>
    for Memory
{
    type Ok = Option<PasswordReset>;
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Option<PasswordReset>, &'t password_reset::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        Ok(self
            .password_resets
            .lock()
            .await
            .remove(token)
            .filter(|r| !r.expires_at.is_elapsed()))
    }
}

impl Cache<Delete<By<PasswordReset, password_reset::ExpirationDateTime>>>
    for Memory
{
    type Ok = ();
    type Err = Traced<cache::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<PasswordReset, password_reset::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        self.password_resets
            .lock()
            .await
            .retain(|_, r| r.expires_at > deadline);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::operations::{By, Delete, Insert, Select};

    use crate::{
        domain::user::{self, password_reset, PasswordReset},
        infra::Cache as _,
    };

    use super::Memory;

    fn reset(ttl: Duration, expired: bool) -> PasswordReset {
        let now = password_reset::ExpirationDateTime::now();
        PasswordReset {
            token: password_reset::Token::generate(),
            user_id: user::Id::new(),
            expires_at: if expired { now - ttl } else { now + ttl },
        }
    }

    #[tokio::test]
    async fn take_is_single_use() {
        let cache = Memory::new();
        let entry = reset(Duration::from_secs(60), false);
        let token = entry.token.clone();
        cache.execute(Insert(entry)).await.unwrap();

        let selected = cache
            .execute(Select(By::<Option<PasswordReset>, _>::new(&token)))
            .await
            .unwrap();
        assert!(selected.is_some());

        let first = cache
            .execute(Delete(By::<Option<PasswordReset>, _>::new(&token)))
            .await
            .unwrap();
        let second = cache
            .execute(Delete(By::<Option<PasswordReset>, _>::new(&token)))
            .await
            .unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_purged() {
        let cache = Memory::new();
        let stale = reset(Duration::from_secs(60), true);
        let fresh = reset(Duration::from_secs(60), false);
        let (stale_token, fresh_token) =
            (stale.token.clone(), fresh.token.clone());
        cache.execute(Insert(stale)).await.unwrap();
        cache.execute(Insert(fresh)).await.unwrap();

        let selected = cache
            .execute(Select(By::<Option<PasswordReset>, _>::new(&stale_token)))
            .await
            .unwrap();
        assert!(selected.is_none());

        cache
            .execute(Delete(By::<PasswordReset, _>::new(
                password_reset::ExpirationDateTime::now(),
            )))
            .await
            .unwrap();

        let resets = cache.password_resets.lock().await;
        assert!(!resets.contains_key(&stale_token));
        assert!(resets.contains_key(&fresh_token));
    }
}
