use crate::{
    Configuration,
    adapters::ResourceAdapter,
    db::{SpecDb, SpecRowStore},
    errors::{ControllerError, ExtKubeApiError},
    finalizers::{add_finalizer_if_missing, remove_finalizer},
};

use futures::StreamExt;
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::{
    controller::{Action, Controller},
    watcher::Config,
};
use log::{debug, info, warn};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use sqlx::PgPool;
use std::{future::Future, sync::Arc, time::Instant};
use tokio::time::{Duration, sleep};

const SPEC_SYNC_CONTROLLER: &'static str = "spec_sync_controller";

/// Interval after which in-sync objects are revisited to repair any
/// database drift in an eventual consistent manner.
const RESYNC_PERIOD: Duration = Duration::from_secs(3600);

pub(crate) fn metric_name(name: &str) -> String {
    format!("spec_sync_{}", name)
}

/// The database row key: the framework assigned UID, stable and
/// collision-free across the object's lifetime.
fn row_id<T: ResourceExt>(object: &T) -> Result<String, ControllerError> {
    object
        .uid()
        .ok_or_else(|| ControllerError::MissingUid(object.name_any()))
}

/// Decides whether the stored payload still matches the current snapshot.
///
/// Equality is evaluated on decoded, typed values via the adapter's equality
/// hook, never on raw serialized bytes, so field-order or formatting
/// differences in the stored `jsonb` can not trigger spurious writes. A
/// payload that no longer decodes is reported as changed and thereby
/// overwritten on the next write.
fn is_unchanged<A: ResourceAdapter>(
    adapter: &A,
    stored: serde_json::Value,
    snapshot: &A::Object,
) -> bool {
    match serde_json::from_value::<A::Object>(stored) {
        Ok(stored) => adapter.are_equal(&stored, snapshot),
        Err(e) => {
            warn!(
                "stored payload in table {} does not decode anymore ({}), overwriting it",
                adapter.table_name(),
                e
            );
            false
        }
    }
}

/// The teardown half of the protocol: delete the row and only then release
/// the finalizer.
///
/// The ordering is the load-bearing part. The control plane can not
/// physically remove the object while the finalizer is present, so a failed
/// row delete aborts before the release and the whole sequence is
/// redelivered; releasing first could lose the row delete forever.
async fn delete_row_then_release<S, F, Fut>(
    store: &S,
    table: &str,
    id: &str,
    release_finalizer: F,
) -> Result<(), ControllerError>
where
    S: SpecRowStore,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), ControllerError>>,
{
    store.delete(table, id).await?;
    release_finalizer().await
}

/// Generic spec-to-database reconciler, instantiated once per
/// [`ResourceAdapter`].
///
/// Drives the watch-compare-upsert-finalize protocol: live objects are
/// mirrored into the adapter's table, objects in deletion have their row
/// removed strictly before the finalizer is released. Work is serialized
/// per object by the kube-runtime [`Controller`], so no additional
/// per-identity locking is needed here.
pub(crate) struct SpecSyncController<A: ResourceAdapter> {
    adapter: A,
    configuration: Configuration,
    db: SpecDb,
    reconcile_count: Counter<u64>,
    reconcile_duration: Histogram<u64>,
}

impl<A: ResourceAdapter> SpecSyncController<A> {
    pub fn new(adapter: A, configuration: Configuration, pool: PgPool) -> Self {
        let meter: Meter = global::meter(SPEC_SYNC_CONTROLLER);
        let reconcile_count = meter
            .u64_counter(metric_name("reconcile_count"))
            .with_description("Count of spec-sync reconcile invocations")
            .build();
        let reconcile_duration = meter
            .u64_histogram(metric_name("reconcile_duration_ms"))
            .with_description("Spec-sync reconciliation duration in milliseconds")
            .with_unit("ms")
            .build();
        Self {
            adapter,
            configuration,
            db: SpecDb::new(pool),
            reconcile_count,
            reconcile_duration,
        }
    }

    fn client(&self) -> Client {
        self.configuration.client.clone()
    }

    /// Mirror the live object into the database.
    async fn sync(&self, api: &Api<A::Object>, object: A::Object) -> Result<(), ControllerError> {
        let mut object = object;
        // Persist the finalizer before the first row write, so that once a
        // sync has begun deletion can not bypass the cleanup path.
        add_finalizer_if_missing(api, &mut object, self.adapter.finalizer_name()).await?;
        let id = row_id(&object)?;
        let name = object.name_any();
        let mut snapshot = object;
        self.adapter.clean_status(&mut snapshot);
        if let Some(stored) = self.db.get_payload(self.adapter.table_name(), &id).await? {
            if is_unchanged(&self.adapter, stored, &snapshot) {
                debug!(
                    "{} in table {} is unchanged, skipping database write",
                    name,
                    self.adapter.table_name()
                );
                return Ok(());
            }
        }
        let payload = serde_json::to_value(&snapshot)?;
        self.db
            .upsert(self.adapter.table_name(), &id, &payload)
            .await?;
        info!("synced {} into table {}", name, self.adapter.table_name());
        Ok(())
    }

    /// Tear down the mirror of an object in deletion, see
    /// [`delete_row_then_release`] for the ordering contract.
    async fn delete(&self, api: &Api<A::Object>, object: A::Object) -> Result<(), ControllerError> {
        let mut object = object;
        let id = row_id(&object)?;
        let name = object.name_any();
        let table = self.adapter.table_name();
        let finalizer = self.adapter.finalizer_name();
        let object = &mut object;
        delete_row_then_release(&self.db, table, &id, move || async move {
            remove_finalizer(api, object, finalizer).await?;
            Ok(())
        })
        .await?;
        info!("removed {} from table {} and released its finalizer", name, table);
        Ok(())
    }

    /// Controller triggers this whenever a watched object changed.
    async fn reconcile(object: Arc<A::Object>, ctx: Arc<Self>) -> Result<Action, ControllerError> {
        let me = ctx.as_ref();
        let namespace = object.namespace().unwrap_or_default();
        let name = object.name_any();
        if !(me.adapter.scope().contains(namespace.as_str())
            && me.configuration.watches(namespace.as_str()))
        {
            debug!(
                "ignoring {}/{} as it is outside the {} syncer's namespace scope",
                namespace,
                name,
                me.adapter.table_name()
            );
            return Ok(Action::await_change());
        }
        let start = Instant::now();
        let api: Api<A::Object> = Api::namespaced(me.client(), namespace.as_str());
        // Re-read the live object, the triggering event may be arbitrarily
        // stale by the time this invocation runs.
        let result = match api.get(name.as_str()).await {
            Err(e) if e.is_not_found() => {
                // Object fully deleted and finalizer already released.
                debug!("{}/{} does no longer exist", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
            Ok(object) if object.meta().deletion_timestamp.is_some() => {
                me.delete(&api, object).await
            }
            Ok(object) => me.sync(&api, object).await,
        };
        let duration = Instant::now() - start;
        let labels = &[
            KeyValue::new("table", me.adapter.table_name()),
            KeyValue::new("object_name", name),
            KeyValue::new("object_namespace", namespace),
        ];
        me.reconcile_count.add(1, labels);
        me.reconcile_duration
            .record(duration.as_millis() as u64, labels);
        result?;
        Ok(Action::requeue(RESYNC_PERIOD))
    }

    /// The controller triggers this on reconcile errors
    fn error_policy(_object: Arc<A::Object>, error: &ControllerError, _ctx: Arc<Self>) -> Action {
        if error.is_temporary() {
            Action::requeue(Duration::from_secs(30))
        } else {
            Action::requeue(Duration::from_secs(300))
        }
    }

    pub fn start(self) -> impl Future<Output = ()> {
        let api = match self.adapter.scope().exactly_one() {
            // Exactly one namespace in scope: let the API server do the
            // filtering, out-of-scope objects never reach the reconciler.
            Some(ns) => Api::namespaced(self.client(), ns),
            None => Api::all(self.client()),
        };
        let table = self.adapter.table_name();
        info!(
            "starting {}-spec-syncer for namespace(s) {}",
            table,
            self.adapter.scope()
        );
        Controller::new(api, Config::default())
            .run(Self::reconcile, Self::error_policy, Arc::new(self))
            .for_each(move |res| async move {
                match res {
                    Ok(o) => {
                        debug!("reconciled {:?}", o);
                    }
                    Err(e) => {
                        let meter: Meter = global::meter(SPEC_SYNC_CONTROLLER);
                        let reconcile_errors = meter
                            .u64_counter(metric_name("reconcile_errors"))
                            .with_description("Count of spec-sync reconcile invocation errors")
                            .build();
                        let labels = &[KeyValue::new("table", table)];
                        match e {
                            a @ kube_runtime::controller::Error::QueueError { .. } => {
                                debug!("reconcile failed: {:?}", a);
                                reconcile_errors.add(1, labels);
                                // Slow down on errors caused by missing CRDs or permissions.
                                sleep(Duration::from_secs(30)).await;
                            }
                            a @ kube_runtime::controller::Error::ObjectNotFound { .. } => {
                                debug!("reconcile failed: {:?}", a);
                            }
                            e => {
                                warn!("reconcile failed: {:?}", e);
                                reconcile_errors.add(1, labels);
                            }
                        };
                    }
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ConfigAdapter;
    use hub_of_hubs_spec_sync_apis::{AggregationLevel, Config, ConfigSpec};
    use kube::api::ObjectMeta;

    fn config(level: AggregationLevel) -> Config {
        let mut config = Config::new(
            "hub-of-hubs-config",
            ConfigSpec {
                aggregation_level: level,
                enable_local_policies: true,
            },
        );
        config.metadata = ObjectMeta {
            name: Some("hub-of-hubs-config".to_string()),
            namespace: Some("hoh-system".to_string()),
            uid: Some("0000-1111".to_string()),
            ..Default::default()
        };
        config
    }

    #[test]
    fn row_id_is_the_object_uid() {
        let config = config(AggregationLevel::Full);
        assert_eq!(row_id(&config).unwrap(), "0000-1111");
    }

    #[test]
    fn row_id_fails_without_uid() {
        let mut config = config(AggregationLevel::Full);
        config.metadata.uid = None;
        let err = row_id(&config).unwrap_err();
        assert!(!err.is_temporary());
    }

    #[test]
    fn unchanged_object_needs_no_write() {
        let adapter = ConfigAdapter::new();
        let current = config(AggregationLevel::Full);
        let stored = serde_json::to_value(&current).unwrap();
        assert!(is_unchanged(&adapter, stored, &current));
    }

    #[test]
    fn equality_ignores_serialization_details() {
        // Same decoded value, different metadata noise in the stored payload.
        let adapter = ConfigAdapter::new();
        let current = config(AggregationLevel::Full);
        let mut stored = config(AggregationLevel::Full);
        stored.metadata.resource_version = Some("42".to_string());
        let stored = serde_json::to_value(&stored).unwrap();
        assert!(is_unchanged(&adapter, stored, &current));
    }

    #[test]
    fn spec_change_is_detected() {
        let adapter = ConfigAdapter::new();
        let current = config(AggregationLevel::Minimal);
        let stored = serde_json::to_value(config(AggregationLevel::Full)).unwrap();
        assert!(!is_unchanged(&adapter, stored, &current));
    }

    #[test]
    fn undecodable_payload_is_overwritten() {
        let adapter = ConfigAdapter::new();
        let current = config(AggregationLevel::Full);
        let stored = serde_json::json!({ "spec": "not an object" });
        assert!(!is_unchanged(&adapter, stored, &current));
    }

    /// In-memory row store recording every operation in order, optionally
    /// failing deletes like an unreachable database would.
    struct RecordingStore {
        fail_delete: bool,
        events: std::cell::RefCell<Vec<String>>,
    }

    impl RecordingStore {
        fn new(fail_delete: bool) -> Self {
            Self {
                fail_delete,
                events: Default::default(),
            }
        }
    }

    impl SpecRowStore for RecordingStore {
        async fn get_payload(
            &self,
            _table: &str,
            _id: &str,
        ) -> Result<Option<serde_json::Value>, ControllerError> {
            Ok(None)
        }

        async fn upsert(
            &self,
            table: &str,
            id: &str,
            _payload: &serde_json::Value,
        ) -> Result<(), ControllerError> {
            self.events.borrow_mut().push(format!("upsert {}/{}", table, id));
            Ok(())
        }

        async fn delete(&self, table: &str, id: &str) -> Result<(), ControllerError> {
            self.events.borrow_mut().push(format!("delete {}/{}", table, id));
            if self.fail_delete {
                Err(ControllerError::Database(sqlx::Error::PoolClosed))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn row_delete_completes_before_finalizer_release() {
        let store = RecordingStore::new(false);
        delete_row_then_release(&store, "configs", "0000-1111", || async {
            store
                .events
                .borrow_mut()
                .push("release finalizer".to_string());
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(
            *store.events.borrow(),
            vec![
                "delete configs/0000-1111".to_string(),
                "release finalizer".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn failed_row_delete_leaves_the_finalizer_in_place() {
        let store = RecordingStore::new(true);
        let result = delete_row_then_release(&store, "configs", "0000-1111", || async {
            store
                .events
                .borrow_mut()
                .push("release finalizer".to_string());
            Ok(())
        })
        .await;
        // The error is retryable, the finalizer guarantees redelivery.
        assert!(result.unwrap_err().is_temporary());
        assert_eq!(
            *store.events.borrow(),
            vec!["delete configs/0000-1111".to_string()]
        );
    }
}
