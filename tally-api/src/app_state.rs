use std::{collections::HashMap, sync::Arc, time::Duration};

use sqlx::PgPool;
use tokio::sync::RwLock;

use tally_core::domain::{ActivityId, UserId};
use tally_core::engine::{EngineConfig, TimerEngine};

use crate::repositories::{
    ActivityRepositoryImpl, ClientRepositoryImpl, EntryRepositoryImpl, ProjectRepositoryImpl,
};

type Engines = HashMap<(UserId, ActivityId), Arc<TimerEngine<EntryRepositoryImpl>>>;

#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<ClientRepositoryImpl>,
    pub projects: Arc<ProjectRepositoryImpl>,
    pub activities: Arc<ActivityRepositoryImpl>,
    pub entries: Arc<EntryRepositoryImpl>,
    engines: Arc<RwLock<Engines>>,
    engine_config: EngineConfig,
}

impl AppState {
    pub fn new(db_pool: PgPool, checkpoint_interval: Duration) -> Self {
        Self {
            clients: Arc::new(ClientRepositoryImpl::new(db_pool.clone())),
            projects: Arc::new(ProjectRepositoryImpl::new(db_pool.clone())),
            activities: Arc::new(ActivityRepositoryImpl::new(db_pool.clone())),
            entries: Arc::new(EntryRepositoryImpl::new(db_pool)),
            engines: Arc::new(RwLock::new(HashMap::new())),
            engine_config: EngineConfig {
                checkpoint_interval,
                ..EngineConfig::default()
            },
        }
    }

    /// The timer engine for one user/activity pair, created on first
    /// use. Every acquisition reconciles against store truth, so a
    /// timer left running by a previous process is picked up here.
    pub async fn engine(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Arc<TimerEngine<EntryRepositoryImpl>> {
        let engine = {
            let engines = self.engines.read().await;
            engines.get(&(user_id, activity_id)).cloned()
        };
        let engine = match engine {
            Some(engine) => engine,
            None => {
                let mut engines = self.engines.write().await;
                engines
                    .entry((user_id, activity_id))
                    .or_insert_with(|| {
                        Arc::new(TimerEngine::with_config(
                            Arc::clone(&self.entries),
                            user_id,
                            activity_id,
                            self.engine_config,
                        ))
                    })
                    .clone()
            }
        };

        if let Err(err) = engine.attach().await {
            tracing::warn!(activity = %activity_id, %err, "timer reconciliation failed");
        }

        engine
    }

    /// Drop the registry entry for an idle engine so the map does not
    /// grow without bound. Skipped while a timer is running or any
    /// caller still holds the engine; such entries are released on a
    /// later stop.
    pub async fn release(&self, user_id: UserId, activity_id: ActivityId) {
        let mut engines = self.engines.write().await;
        if let Some(engine) = engines.get(&(user_id, activity_id)) {
            if Arc::strong_count(engine) == 1 && !engine.status().await.running {
                engines.remove(&(user_id, activity_id));
            }
        }
    }

    /// Final checkpoint for every running engine; called on graceful
    /// shutdown. Entries stay running in the store and are picked up
    /// again on the next start.
    pub async fn detach_all(&self) {
        let mut engines = self.engines.write().await;
        for engine in engines.values() {
            engine.detach().await;
        }
        engines.clear();
    }

    #[cfg(test)]
    async fn engine_count(&self) -> usize {
        self.engines.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    fn app_state() -> AppState {
        // Lazy pool; the registry logic under test never needs a live
        // database, and reconciliation failures are tolerated.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(PgConnectOptions::new());
        AppState::new(pool, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn release_evicts_only_unreferenced_stopped_engines() {
        let state = app_state();
        let user = UserId::random();
        let activity = ActivityId::random();

        let engine = state.engine(user, activity).await;
        assert_eq!(state.engine_count().await, 1);

        // A caller still holding the engine keeps the entry alive.
        state.release(user, activity).await;
        assert_eq!(state.engine_count().await, 1);

        drop(engine);
        state.release(user, activity).await;
        assert_eq!(state.engine_count().await, 0);
    }

    #[tokio::test]
    async fn engine_is_shared_per_user_and_activity() {
        let state = app_state();
        let user = UserId::random();
        let activity = ActivityId::random();

        let first = state.engine(user, activity).await;
        let second = state.engine(user, activity).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = state.engine(user, ActivityId::random()).await;
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(state.engine_count().await, 2);
    }
}
