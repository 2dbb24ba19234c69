//! [`Background`] runner of [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _,
};
use tokio::task;

#[cfg(doc)]
use crate::{Service, Task};

/// Error a [`Background`] [`Task`] failed with.
pub type Failure = Box<dyn Error>;

/// [`Task`]s running alongside a [`Service`] on the current thread.
///
/// Nothing runs until the [`Background`] is awaited, which resolves once all
/// the [`Task`]s complete, or with the first [`Failure`].
#[derive(Debug, Default)]
pub struct Background {
    /// [`task::LocalSet`] driving the spawned [`Task`]s.
    local: task::LocalSet,

    /// Handles of the spawned [`Task`]s.
    running: Vec<task::JoinHandle<Result<(), Failure>>>,
}

impl Background {
    /// Spawns the provided [`Task`] future into this [`Background`].
    pub fn spawn<F, E>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        self.running.push(
            self.local
                .spawn_local(async move { task.await.map_err(Failure::from) }),
        );
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { local, running } = self;
        async move {
            local
                .run_until(future::try_join_all(running.into_iter().map(
                    |handle| async move {
                        // Panicked `Task` fails the whole `Background`.
                        handle.await.unwrap_or_else(|e| Err(Failure::from(e)))
                    },
                )))
                .await
                .map(drop)
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use futures::future;

    use super::Background;

    #[tokio::test]
    async fn completes_once_all_tasks_complete() {
        let mut bg = Background::default();
        bg.spawn(async { Ok::<_, io::Error>(()) });
        bg.spawn(async {
            tokio::task::yield_now().await;
            Ok::<_, io::Error>(())
        });

        assert!(bg.await.is_ok());
    }

    #[tokio::test]
    async fn fails_with_first_failure() {
        let mut bg = Background::default();
        bg.spawn(future::pending::<Result<(), io::Error>>());
        bg.spawn(async { Err(io::Error::other("boom")) });

        assert_eq!(bg.await.unwrap_err().to_string(), "boom");
    }

    #[tokio::test]
    async fn empty_completes_immediately() {
        assert!(Background::default().await.is_ok());
    }
}
