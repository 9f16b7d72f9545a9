//! ExploreEngine: resolves the explore, plans, fans out component calls,
//! fuses, allocates the token budget, and caches the response.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use explore_cache::{CacheEntry, CacheKey, Origin, ResultCache};
use explore_core::cancellation::CancellationToken;
use explore_core::config::{EngineConfig, ExploreSettings, RetrievalConfig};
use explore_core::errors::{ComponentError, ComponentFailure, ExploreError, ExploreResult};
use explore_core::models::{ComponentHit, ExploreResponse, RuntimeQuery};
use explore_core::traits::{BackendConnector, QueryEmbedder, TokenCounter};
use explore_observability::tracing_setup::events;
use explore_observability::{cache_span, component_span, plan_span, query_span};
use explore_observability::{ComponentLatency, QueryLog, QueryLogEntry};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::budget::BudgetAllocator;
use crate::executors::{self, QueryInputs};
use crate::fusion::{self, ComponentOutput};
use crate::planner::{self, ExecutionPlan, PlannedCall};
use crate::registry::ConfigRegistry;

type CallOutcome = (PlannedCall, Result<Vec<ComponentHit>, ComponentError>, Duration);

/// The explore engine. Cheap to share behind an `Arc`.
pub struct ExploreEngine {
    config: EngineConfig,
    registry: ConfigRegistry,
    connector: Arc<dyn BackendConnector>,
    embedder: Option<Arc<dyn QueryEmbedder>>,
    counter: Arc<dyn TokenCounter>,
    cache: Arc<ResultCache>,
    query_log: Mutex<QueryLog>,
}

impl ExploreEngine {
    pub fn new(config: EngineConfig, connector: Arc<dyn BackendConnector>) -> ExploreResult<Self> {
        let counter = explore_tokens::counter_for(&config)?;
        Ok(Self {
            registry: ConfigRegistry::new(),
            connector,
            embedder: None,
            counter,
            cache: Arc::new(ResultCache::new(config.cache_capacity)),
            query_log: Mutex::new(QueryLog::with_capacity(config.query_log_capacity)),
            config,
        })
    }

    /// Install tracing per `settings.observability`, then build the engine.
    pub fn from_settings(
        settings: &ExploreSettings,
        connector: Arc<dyn BackendConnector>,
    ) -> ExploreResult<Self> {
        explore_observability::init_tracing(&settings.observability);
        Self::new(settings.engine.clone(), connector)
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn QueryEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Register an explore, or reload it with a higher version. A reload
    /// drops every cached response of that explore.
    pub fn register(&self, config: RetrievalConfig) -> ExploreResult<()> {
        let name = config.name.clone();
        if self.registry.register(config)?.is_some() {
            self.cache.invalidate_explore(&name);
        }
        Ok(())
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Plan without executing, for explainability.
    pub fn plan(&self, query: &RuntimeQuery) -> ExploreResult<ExecutionPlan> {
        let config = self.registry.get(&query.explore)?;
        planner::plan(&config, query)
    }

    /// Run a query. Cancelling `cancel` aborts every in-flight component
    /// call and fails the query with `Cancelled`; nothing is cached. Both
    /// outcomes land in the query log.
    pub async fn explore(
        &self,
        query: RuntimeQuery,
        cancel: Option<CancellationToken>,
    ) -> ExploreResult<ExploreResponse> {
        let started = Instant::now();
        let query_id = Uuid::new_v4();
        let cancel = cancel.unwrap_or_default();
        let span = query_span!(query.explore, query_id);
        let mut timings = Vec::new();

        let work = async {
            let config = self.registry.get(&query.explore)?;
            let plan = {
                let strategy = query.strategy.as_deref().unwrap_or("default");
                let _entered = plan_span!(config.name, strategy).entered();
                planner::plan(&config, &query)?
            };
            let (mut response, origin) = self
                .resolve(query_id, &config, &plan, &query, &mut timings)
                .await?;
            response.cache_hit = origin == Origin::Cache;
            Ok::<_, ExploreError>(response)
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExploreError::Cancelled),
            result = work.instrument(span) => result,
        };

        let latency = started.elapsed();
        let entry = match &result {
            Ok(response) => {
                events::query_completed(
                    &response.explore,
                    &response.strategy,
                    millis(latency),
                    response.items.len(),
                    response.cache_hit,
                    response.degraded,
                );
                QueryLogEntry::new(
                    response.query_id,
                    response.explore.clone(),
                    response.strategy.clone(),
                    latency,
                )
                .with_results(response.items.len(), response.tokens_used)
                .with_flags(response.cache_hit, response.degraded)
            }
            Err(err) => {
                events::query_failed(&query.explore, err.kind(), millis(latency), &err.to_string());
                let strategy = query.strategy.clone().unwrap_or_else(|| "default".to_string());
                QueryLogEntry::new(query_id, query.explore.clone(), strategy, latency)
                    .with_error(err.kind())
            }
        };
        self.record(entry.with_components(timings));
        result
    }

    /// Serve from cache when enabled, otherwise compute.
    async fn resolve(
        &self,
        query_id: Uuid,
        config: &RetrievalConfig,
        plan: &ExecutionPlan,
        query: &RuntimeQuery,
        timings: &mut Vec<ComponentLatency>,
    ) -> ExploreResult<(ExploreResponse, Origin)> {
        if !config.cache.enabled {
            let response = self.run(query_id, config, plan, query, timings).await?;
            return Ok((response, Origin::Computed));
        }

        let key = CacheKey::compute(&config.id(), &plan.strategy, query, plan.limit);
        let compute_key = key.clone();
        let fetched = self
            .cache
            .get_or_compute(&key, || async move {
                let response = self.run(query_id, config, plan, query, timings).await?;
                Ok(CacheEntry::new(compute_key, response, plan.sources(), &config.cache))
            })
            .instrument(cache_span!(key.short()))
            .await?;

        match fetched.origin {
            Origin::Cache => events::cache_hit(&config.name, key.short()),
            Origin::Computed | Origin::Shared => events::cache_miss(&config.name, key.short()),
        }
        Ok((fetched.entry.response.clone(), fetched.origin))
    }

    /// Execute a plan: embed if needed, fan out, classify failures, fuse,
    /// allocate.
    async fn run(
        &self,
        query_id: Uuid,
        config: &RetrievalConfig,
        plan: &ExecutionPlan,
        query: &RuntimeQuery,
        timings: &mut Vec<ComponentLatency>,
    ) -> ExploreResult<ExploreResponse> {
        let deadline = query.deadline().map(|d| Instant::now() + d);
        let mut inputs = QueryInputs::from_query(query);
        if plan.needs_embedding() && inputs.embedding.is_none() {
            self.embed(&mut inputs, deadline).await;
        }

        let outcomes = self.fan_out(plan, Arc::new(inputs), deadline).await?;

        let mut outputs = Vec::with_capacity(outcomes.len());
        let mut required_failures = Vec::new();
        let mut omitted = BTreeSet::new();
        for (call, outcome, latency) in outcomes {
            timings.push(ComponentLatency {
                component: call.component(),
                source: call.source.clone(),
                latency,
                ok: outcome.is_ok(),
            });
            match outcome {
                Ok(hits) => outputs.push(ComponentOutput {
                    component: call.component(),
                    ordinal: call.ordinal,
                    source: call.source,
                    weight: call.weight,
                    hits,
                }),
                Err(error) => {
                    let failure = ComponentFailure {
                        component: call.component(),
                        ordinal: call.ordinal,
                        source_alias: call.source,
                        error,
                    };
                    if !failure.error.is_transient() {
                        return Err(failure.into());
                    }
                    if call.required {
                        required_failures.push(failure);
                    } else {
                        events::component_degraded(
                            failure.component.as_str(),
                            &failure.source_alias,
                            &failure.error.to_string(),
                        );
                        omitted.insert(failure.source_alias);
                    }
                }
            }
        }
        if !required_failures.is_empty() {
            return Err(ExploreError::AggregateFailure {
                failures: required_failures,
            });
        }

        let ranked = fusion::fuse(&outputs, plan.limit);
        let budget = config.limits.active_token_budget();
        let allocation = BudgetAllocator::new(self.counter.as_ref(), &config.fields).allocate(
            ranked,
            budget,
            &query.context,
        );
        if let (Some(budget), true) = (budget, allocation.skipped > 0) {
            events::budget_truncated(
                &config.name,
                budget.max_tokens,
                allocation.tokens_used,
                allocation.skipped,
            );
        }

        Ok(ExploreResponse {
            query_id,
            explore: config.name.clone(),
            version: config.version,
            strategy: plan.strategy.clone(),
            items: allocation.items,
            tokens_used: allocation.tokens_used,
            cache_hit: false,
            degraded: !omitted.is_empty(),
            omitted_sources: omitted.into_iter().collect(),
        })
    }

    /// Fill in the query embedding from the normalized text, the same text
    /// the cache key hashes. Embedder failures are recorded on the inputs
    /// and surface as failures of the vector calls.
    async fn embed(&self, inputs: &mut QueryInputs, deadline: Option<Instant>) {
        let Some(embedder) = &self.embedder else {
            return;
        };
        let Some(text) = inputs.text.clone() else {
            return;
        };
        let budget = self.call_timeout(deadline);
        match tokio::time::timeout(budget, embedder.embed(&text)).await {
            Ok(Ok(embedding)) => inputs.embedding = Some(embedding),
            Ok(Err(err)) => inputs.embedding_error = Some(err.into()),
            Err(_) => {
                inputs.embedding_error = Some(ComponentError::Timeout {
                    elapsed_ms: millis(budget),
                })
            }
        }
    }

    /// One task per planned call, each bounded by the per-call timeout and
    /// the remaining deadline. Outcomes come back in plan order.
    async fn fan_out(
        &self,
        plan: &ExecutionPlan,
        inputs: Arc<QueryInputs>,
        deadline: Option<Instant>,
    ) -> ExploreResult<Vec<CallOutcome>> {
        let mut tasks = JoinSet::new();
        for call in &plan.calls {
            let connector = Arc::clone(&self.connector);
            let inputs = Arc::clone(&inputs);
            let call = call.clone();
            let budget = self.call_timeout(deadline);
            let span = component_span!(call.component(), call.ordinal, call.source);
            tasks.spawn(
                async move {
                    let started = Instant::now();
                    let outcome = match tokio::time::timeout(
                        budget,
                        executors::execute(connector.as_ref(), &call, &inputs),
                    )
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => Err(ComponentError::Timeout {
                            elapsed_ms: millis(started.elapsed()),
                        }),
                    };
                    (call, outcome, started.elapsed())
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => return Err(ExploreError::Cancelled),
            }
        }
        outcomes.sort_by_key(|(call, _, _)| call.index);
        debug!(calls = outcomes.len(), "fan-out complete");
        Ok(outcomes)
    }

    fn call_timeout(&self, deadline: Option<Instant>) -> Duration {
        let per_call = Duration::from_millis(self.config.per_call_timeout_ms);
        match deadline {
            Some(at) => per_call.min(at.saturating_duration_since(Instant::now())),
            None => per_call,
        }
    }

    fn record(&self, entry: QueryLogEntry) {
        if entry.latency >= Duration::from_millis(self.config.slow_query_ms) {
            events::slow_query(&entry.explore, millis(entry.latency), self.config.slow_query_ms);
        }
        if let Ok(mut log) = self.query_log.lock() {
            log.record(entry);
        }
    }

    /// Write-path hook: a record changed in `source`. Returns the number of
    /// cache entries removed synchronously.
    pub fn notify_record_changed(&self, source: &str, record_id: &str) -> usize {
        self.cache.notify_record_changed(source, record_id)
    }

    /// Apply queued write-behind invalidations now.
    pub fn flush_invalidations(&self) -> usize {
        self.cache.flush_pending()
    }

    /// Start the background write-behind flusher. Needs a tokio runtime.
    pub fn spawn_write_behind_worker(&self) -> JoinHandle<()> {
        self.cache
            .spawn_write_behind_worker(Duration::from_millis(self.config.write_behind_flush_ms))
    }

    /// Snapshot of the query log.
    pub fn query_log(&self) -> QueryLog {
        self.query_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
