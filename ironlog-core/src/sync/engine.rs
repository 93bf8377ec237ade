//! The sync engine: a durable queue of pending mutations drained
//! against the remote store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::entity::{EntityKind, RecordRef};
use super::error::SyncError;
use super::id_map::IdMap;
use super::op::{backoff_delay, derive_idempotency_key, OpAction, OpStatus, SyncOperation, MAX_RETRIES};
use super::payload::Payload;
use crate::record_id::RecordId;
use crate::remote::{RemoteError, RemoteRecord, RemoteStore};
use crate::storage::LocalStore;

/// Bound on a single remote call during a drain pass. A timeout is a
/// network-class failure.
const CALL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Observable queue state, recomputed on every queue mutation and
/// broadcast to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncState {
    pub queued: usize,
    pub syncing: usize,
    pub failed: usize,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub online: bool,
    /// Most recent conflict notice, cleared by a manual retry.
    pub conflict: Option<String>,
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub skipped: usize,
    /// The pass stopped early on a network error.
    pub aborted_offline: bool,
    /// Another pass was already running; nothing was attempted.
    pub already_draining: bool,
}

/// A mutation to enqueue.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Create a record from a payload carrying the locally minted id.
    Create(Payload),
    /// Patch the record addressed by `id`.
    Update { id: RecordId, patch: Payload },
    /// Delete the record addressed by `id`.
    Delete { entity: EntityKind, id: RecordId },
}

/// Caller-supplied extras for `enqueue`.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Explicit idempotency key; derived from the payload when absent.
    pub idempotency_key: Option<String>,
    /// Dependencies beyond those derived from the payload's reference
    /// fields.
    pub depends_on: Vec<RecordRef>,
    /// When the record was modified locally; defaults to now.
    pub modified_at: Option<DateTime<Utc>>,
}

/// What `enqueue` did with the mutation.
#[derive(Debug, Clone)]
pub struct EnqueueOutcome {
    pub operation_id: String,
    /// Id the caller should use to address the record locally.
    pub local_id: RecordId,
    /// True when the immediate drain executed the operation; false when
    /// it stays queued (offline, busy, unresolved dependency).
    pub synced: bool,
}

#[derive(Debug)]
enum OpOutcome {
    Synced,
    Skipped,
    Failed(RemoteError),
}

struct PassResult {
    report: DrainReport,
    outcomes: Vec<(String, OpOutcome)>,
}

struct Staged {
    op_id: String,
    local_id: RecordId,
    /// An equivalent operation was already queued; nothing was added.
    reused: bool,
}

#[derive(Default)]
struct QueueState {
    loaded: bool,
    ops: Vec<SyncOperation>,
    id_map: IdMap,
    last_synced_at: Option<DateTime<Utc>>,
    conflict: Option<String>,
}

/// Offline mutation queue for one signed-in user.
///
/// Owns its storage handles; multiple engines for different users can
/// coexist. Queue and id map are persisted under per-user keys so a
/// restart resumes where the last process stopped.
pub struct SyncEngine {
    user_id: String,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    state: Mutex<QueueState>,
    draining: AtomicBool,
    online: AtomicBool,
    state_tx: watch::Sender<SyncState>,
    retry_task: StdMutex<Option<JoinHandle<()>>>,
    /// Self-handle for the retry timer task, so a live timer never keeps
    /// a dropped engine alive.
    weak_self: Weak<SyncEngine>,
}

impl SyncEngine {
    /// Creates an engine for `user_id`. Starts online; callers feed
    /// connectivity changes through [`SyncEngine::set_online`].
    pub fn new(
        user_id: impl Into<String>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(SyncState {
            online: true,
            ..Default::default()
        });

        Arc::new_cyclic(|weak_self| Self {
            user_id: user_id.into(),
            local,
            remote,
            state: Mutex::new(QueueState::default()),
            draining: AtomicBool::new(false),
            online: AtomicBool::new(true),
            state_tx,
            retry_task: StdMutex::new(None),
            weak_self: weak_self.clone(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Current queue state snapshot.
    pub fn state(&self) -> SyncState {
        self.state_tx.borrow().clone()
    }

    /// Subscribes to queue state changes. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    fn queue_key(&self) -> String {
        format!("sync_queue:{}", self.user_id)
    }

    fn map_key(&self) -> String {
        format!("id_map:{}", self.user_id)
    }

    async fn ensure_loaded(&self, state: &mut QueueState) -> Result<(), SyncError> {
        if state.loaded {
            return Ok(());
        }

        if let Some(value) = self.local.get(&self.queue_key()).await? {
            state.ops = serde_json::from_value(value)?;
            // A crash mid-pass leaves operations marked syncing.
            for op in &mut state.ops {
                if op.status == OpStatus::Syncing {
                    op.status = OpStatus::Queued;
                }
            }
        }
        if let Some(value) = self.local.get(&self.map_key()).await? {
            state.id_map = serde_json::from_value(value)?;
        }

        state.loaded = true;
        debug!(user = %self.user_id, ops = state.ops.len(), "sync queue loaded");
        Ok(())
    }

    async fn persist(&self, state: &QueueState) -> Result<(), SyncError> {
        self.local
            .set(&self.queue_key(), serde_json::to_value(&state.ops)?)
            .await?;
        self.local
            .set(&self.map_key(), serde_json::to_value(&state.id_map)?)
            .await?;
        Ok(())
    }

    fn publish(&self, state: &QueueState) {
        let snapshot = SyncState {
            queued: count(state, OpStatus::Queued),
            syncing: count(state, OpStatus::Syncing),
            failed: count(state, OpStatus::Failed),
            last_synced_at: state.last_synced_at,
            online: self.online.load(Ordering::SeqCst),
            conflict: state.conflict.clone(),
        };
        self.state_tx.send_replace(snapshot);
    }

    /// Appends a mutation to the durable queue. When online, the new
    /// operation is immediately drained; a non-network failure during
    /// that drain removes the operation and surfaces the error.
    pub async fn enqueue(
        &self,
        mutation: Mutation,
        options: EnqueueOptions,
    ) -> Result<EnqueueOutcome, SyncError> {
        let staged = {
            let mut state = self.state.lock().await;
            self.ensure_loaded(&mut state).await?;
            let staged = stage_mutation(&mut state, mutation, options, Utc::now())?;
            if !staged.reused {
                self.persist(&state).await?;
                self.publish(&state);
            }
            staged
        };

        if staged.reused || !self.is_online() {
            return Ok(EnqueueOutcome {
                operation_id: staged.op_id,
                local_id: staged.local_id,
                synced: false,
            });
        }

        let pass = self.run_pass(Some(staged.op_id.as_str())).await?;
        let outcome = pass
            .outcomes
            .into_iter()
            .find(|(id, _)| id == &staged.op_id)
            .map(|(_, outcome)| outcome);

        match outcome {
            Some(OpOutcome::Synced) => Ok(EnqueueOutcome {
                operation_id: staged.op_id,
                local_id: staged.local_id,
                synced: true,
            }),
            Some(OpOutcome::Failed(err)) if !err.is_network() => {
                // Nothing stays queued after an immediate rejection.
                let mut state = self.state.lock().await;
                state.ops.retain(|op| op.id != staged.op_id);
                self.persist(&state).await?;
                self.publish(&state);
                Err(SyncError::Remote(err))
            }
            _ => Ok(EnqueueOutcome {
                operation_id: staged.op_id,
                local_id: staged.local_id,
                synced: false,
            }),
        }
    }

    /// Drains every eligible operation in dependency order.
    pub async fn process_sync_queue(&self) -> Result<DrainReport, SyncError> {
        Ok(self.run_pass(None).await?.report)
    }

    /// Resets all failed operations to queued with a fresh retry budget
    /// and drains.
    pub async fn retry_failed(&self) -> Result<DrainReport, SyncError> {
        {
            let mut state = self.state.lock().await;
            self.ensure_loaded(&mut state).await?;

            let mut reset = 0;
            for op in state.ops.iter_mut().filter(|op| op.status == OpStatus::Failed) {
                reset_for_retry(op);
                reset += 1;
            }
            state.conflict = None;

            if reset > 0 {
                info!(user = %self.user_id, count = reset, "failed operations reset for manual retry");
            }
            self.persist(&state).await?;
            self.publish(&state);
        }

        self.process_sync_queue().await
    }

    /// Resets one failed operation and drains it.
    pub async fn retry_operation(&self, operation_id: &str) -> Result<DrainReport, SyncError> {
        {
            let mut state = self.state.lock().await;
            self.ensure_loaded(&mut state).await?;

            let op = state
                .ops
                .iter_mut()
                .find(|op| op.id == operation_id)
                .ok_or_else(|| SyncError::OperationNotFound(operation_id.to_string()))?;
            if op.status == OpStatus::Failed {
                reset_for_retry(op);
            }
            state.conflict = None;

            self.persist(&state).await?;
            self.publish(&state);
        }

        Ok(self.run_pass(Some(operation_id)).await?.report)
    }

    /// The server id mapped for a locally minted id, if any. For an
    /// unsynced create this is the optimistic self-mapping.
    pub async fn server_id(
        &self,
        entity: EntityKind,
        local_id: &RecordId,
    ) -> Result<Option<RecordId>, SyncError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        Ok(state.id_map.server_id(entity, local_id).cloned())
    }

    /// Records an externally learned local-to-server id mapping.
    pub async fn set_id_mapping(
        &self,
        entity: EntityKind,
        local_id: RecordId,
        server_id: RecordId,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        state.id_map.insert(entity, local_id, server_id);
        self.persist(&state).await?;
        Ok(())
    }

    /// All operations still in the queue, in drain order.
    pub async fn pending_operations(&self) -> Result<Vec<SyncOperation>, SyncError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut ops = state.ops.clone();
        ops.sort_by(compare_ops);
        Ok(ops)
    }

    /// Operations held in the failed state.
    pub async fn failed_operations(&self) -> Result<Vec<SyncOperation>, SyncError> {
        Ok(self
            .pending_operations()
            .await?
            .into_iter()
            .filter(|op| op.status == OpStatus::Failed)
            .collect())
    }

    /// Connectivity signal from the caller. Coming online triggers a
    /// drain.
    pub async fn set_online(&self, online: bool) -> Result<DrainReport, SyncError> {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        {
            let mut state = self.state.lock().await;
            self.ensure_loaded(&mut state).await?;
            self.publish(&state);
        }

        if online && !was_online {
            info!(user = %self.user_id, "back online, draining queue");
            return self.process_sync_queue().await;
        }
        Ok(DrainReport::default())
    }

    /// Wipes the queue and id map from durable storage (sign-out).
    pub async fn clear(&self) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        state.ops.clear();
        state.id_map = IdMap::new();
        state.conflict = None;
        state.last_synced_at = None;
        state.loaded = true;

        self.local.remove(&self.queue_key()).await?;
        self.local.remove(&self.map_key()).await?;
        self.cancel_retry_timer();
        self.publish(&state);

        info!(user = %self.user_id, "sync queue cleared");
        Ok(())
    }

    /// One drain pass. `only` restricts the pass to a single operation
    /// (the immediate drain after enqueue).
    async fn run_pass(&self, only: Option<&str>) -> Result<PassResult, SyncError> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(user = %self.user_id, "drain already running");
            return Ok(PassResult {
                report: DrainReport {
                    already_draining: true,
                    ..Default::default()
                },
                outcomes: Vec::new(),
            });
        }

        let result = self.run_pass_inner(only).await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn run_pass_inner(&self, only: Option<&str>) -> Result<PassResult, SyncError> {
        let mut report = DrainReport::default();
        let mut outcomes = Vec::new();

        let batch: Vec<String> = {
            let mut state = self.state.lock().await;
            self.ensure_loaded(&mut state).await?;
            state.ops.sort_by(compare_ops);

            let now = Utc::now();
            state
                .ops
                .iter()
                .filter(|op| op.is_eligible(now))
                .filter(|op| only.map_or(true, |id| op.id == id))
                .map(|op| op.id.clone())
                .collect()
        };

        if batch.is_empty() {
            return Ok(PassResult { report, outcomes });
        }
        info!(user = %self.user_id, eligible = batch.len(), "sync pass started");

        for op_id in batch {
            // Claim: re-check eligibility and dependencies, resolve ids.
            let prepared = {
                let mut state = self.state.lock().await;
                let Some(index) = state.ops.iter().position(|op| op.id == op_id) else {
                    continue;
                };
                if !state.ops[index].is_eligible(Utc::now()) {
                    continue;
                }

                let unresolved: Vec<&RecordRef> = state.ops[index]
                    .depends_on
                    .iter()
                    .filter(|dep| !dependency_resolved(&state.ops, dep))
                    .collect();
                if !unresolved.is_empty() {
                    debug!(
                        operation = %op_id,
                        waiting_on = %unresolved
                            .iter()
                            .map(|r| r.to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                        "dependencies unresolved, skipping"
                    );
                    report.skipped += 1;
                    outcomes.push((op_id.clone(), OpOutcome::Skipped));
                    continue;
                }

                let mut prepared = state.ops[index].clone();
                prepared.payload.rewrite_refs(&state.id_map);
                if let Some(target) = prepared.local_id.clone() {
                    prepared.local_id = Some(state.id_map.resolve(prepared.entity(), &target));
                }

                state.ops[index].status = OpStatus::Syncing;
                self.publish(&state);
                prepared
            };

            let result = match tokio::time::timeout(CALL_TIMEOUT, self.execute(&prepared)).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Network("remote call timed out".to_string())),
            };

            // On conflict, fetch the server copy so the notice can say
            // when it changed.
            let server_copy = match (&result, prepared.local_id.as_ref()) {
                (Err(RemoteError::Conflict(_)), Some(id)) => {
                    self.remote.fetch(prepared.entity(), id).await.ok().flatten()
                }
                _ => None,
            };

            // Apply the result.
            let mut state = self.state.lock().await;
            let Some(index) = state.ops.iter().position(|op| op.id == op_id) else {
                continue;
            };
            report.attempted += 1;

            let mut abort = false;
            match result {
                Ok(record) => {
                    self.mark_synced(&mut state, index, record);
                    report.synced += 1;
                    outcomes.push((op_id.clone(), OpOutcome::Synced));
                }
                Err(err) if err.is_network() => {
                    state.ops[index].status = OpStatus::Queued;
                    self.online.store(false, Ordering::SeqCst);
                    report.aborted_offline = true;
                    warn!(operation = %op_id, error = %err, "network error, sync pass aborted");
                    outcomes.push((op_id.clone(), OpOutcome::Failed(err)));
                    abort = true;
                }
                Err(RemoteError::Duplicate(detail)) if state.ops[index].action == OpAction::Create => {
                    // The record already exists under this id.
                    debug!(operation = %op_id, detail = %detail, "create already applied on server");
                    self.mark_synced(&mut state, index, None);
                    report.synced += 1;
                    outcomes.push((op_id.clone(), OpOutcome::Synced));
                }
                Err(RemoteError::Conflict(message)) => {
                    let op = &mut state.ops[index];
                    op.status = OpStatus::Failed;
                    op.last_error = Some(message.clone());
                    op.next_retry_at = None;

                    let mut notice = format!("{} was changed on the server", describe(op));
                    if let Some(at) = server_copy.as_ref().and_then(|r| r.updated_at) {
                        notice.push_str(&format!(" at {}", at.format("%Y-%m-%d %H:%M:%S")));
                    }
                    warn!(operation = %op_id, error = %message, "conflict, holding for manual retry");
                    state.conflict = Some(notice);

                    report.failed += 1;
                    outcomes.push((op_id.clone(), OpOutcome::Failed(RemoteError::Conflict(message))));
                }
                Err(err) => {
                    let op = &mut state.ops[index];
                    op.status = OpStatus::Failed;
                    op.last_error = Some(err.to_string());
                    op.retry_count += 1;
                    op.next_retry_at = if op.retry_count < MAX_RETRIES {
                        Some(Utc::now() + backoff_delay(op.retry_count))
                    } else {
                        None
                    };
                    warn!(
                        operation = %op_id,
                        retries = op.retry_count,
                        error = %err,
                        "operation failed"
                    );
                    report.failed += 1;
                    outcomes.push((op_id.clone(), OpOutcome::Failed(err)));
                }
            }
            self.publish(&state);
            drop(state);

            if abort {
                break;
            }
        }

        // Finish: purge synced ops, persist, reschedule the retry timer.
        {
            let mut state = self.state.lock().await;
            state.ops.retain(|op| op.status != OpStatus::Synced);
            self.persist(&state).await?;
            self.publish(&state);
            self.schedule_retry(&state);
        }

        info!(
            user = %self.user_id,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            aborted = report.aborted_offline,
            "sync pass finished"
        );
        Ok(PassResult { report, outcomes })
    }

    fn mark_synced(&self, state: &mut QueueState, index: usize, record: Option<RemoteRecord>) {
        let entity = state.ops[index].entity();
        if state.ops[index].action == OpAction::Create {
            if let Some(local) = state.ops[index].local_id.clone() {
                let server = record.map(|r| r.id).unwrap_or_else(|| local.clone());
                state.id_map.insert(entity, local, server.clone());
                state.ops[index].server_id = Some(server);
            }
        }
        state.ops[index].status = OpStatus::Synced;
        state.last_synced_at = Some(Utc::now());
        info!(operation = %state.ops[index].id, entity = %entity, action = %state.ops[index].action, "operation synced");
    }

    async fn execute(&self, op: &SyncOperation) -> Result<Option<RemoteRecord>, RemoteError> {
        let entity = op.entity();
        match op.action {
            OpAction::Create => self.remote.create(entity, &op.payload).await.map(Some),
            OpAction::Update => {
                let id = op
                    .target_id()
                    .ok_or_else(|| RemoteError::Rejected("update without a target id".to_string()))?;
                self.remote
                    .update(entity, id, &op.payload, op.local_modified_at)
                    .await
                    .map(Some)
            }
            OpAction::Delete => {
                let id = op
                    .target_id()
                    .ok_or_else(|| RemoteError::Rejected("delete without a target id".to_string()))?;
                self.remote.delete(entity, id).await.map(|_| None)
            }
        }
    }

    /// Arms the retry timer for the earliest scheduled retry, replacing
    /// any previous timer.
    fn schedule_retry(&self, state: &QueueState) {
        let next = state
            .ops
            .iter()
            .filter(|op| op.status == OpStatus::Failed && op.retry_count < MAX_RETRIES)
            .filter_map(|op| op.next_retry_at)
            .min();

        self.cancel_retry_timer();
        let Some(at) = next else { return };

        let delay = (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
        debug!(user = %self.user_id, in_secs = delay.as_secs(), "retry timer armed");

        let engine = self.weak_self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(engine) = engine.upgrade() {
                if let Err(e) = engine.process_sync_queue().await {
                    warn!(error = %e, "scheduled retry pass failed");
                }
            }
        });

        if let Ok(mut guard) = self.retry_task.lock() {
            *guard = Some(task);
        }
    }

    fn cancel_retry_timer(&self) {
        if let Ok(mut guard) = self.retry_task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.cancel_retry_timer();
    }
}

fn count(state: &QueueState, status: OpStatus) -> usize {
    state.ops.iter().filter(|op| op.status == status).count()
}

fn compare_ops(a: &SyncOperation, b: &SyncOperation) -> std::cmp::Ordering {
    (a.entity().sync_order(), a.created_at).cmp(&(b.entity().sync_order(), b.created_at))
}

fn describe(op: &SyncOperation) -> String {
    match op.target_id() {
        Some(id) => format!("{} {}", op.entity(), id),
        None => op.entity().to_string(),
    }
}

fn reset_for_retry(op: &mut SyncOperation) {
    op.status = OpStatus::Queued;
    op.retry_count = 0;
    op.next_retry_at = None;
    op.last_error = None;
}

/// A dependency is resolved once no unsynced create for that record
/// remains in the queue. The id map alone cannot answer this because a
/// create is optimistically self-mapped the moment it is enqueued.
fn dependency_resolved(ops: &[SyncOperation], dep: &RecordRef) -> bool {
    !ops.iter().any(|op| {
        op.action == OpAction::Create
            && op.status != OpStatus::Synced
            && op.entity() == dep.entity
            && op.local_id.as_ref() == Some(&dep.id)
    })
}

fn set_slot_matches(op: &SyncOperation, patch: &Payload) -> bool {
    match (&op.payload, patch) {
        (Payload::Set(a), Payload::Set(b)) => {
            match (&a.session_exercise_id, a.position, &b.session_exercise_id, b.position) {
                (Some(parent_a), Some(pos_a), Some(parent_b), Some(pos_b)) => {
                    parent_a == parent_b && pos_a == pos_b
                }
                _ => false,
            }
        }
        _ => false,
    }
}

fn stage_mutation(
    state: &mut QueueState,
    mutation: Mutation,
    options: EnqueueOptions,
    now: DateTime<Utc>,
) -> Result<Staged, SyncError> {
    match mutation {
        Mutation::Create(mut payload) => {
            let local_id = payload.id().cloned().unwrap_or_else(RecordId::generate);
            payload.set_id(local_id.clone());

            let key = match options.idempotency_key {
                Some(key) => key,
                None => derive_idempotency_key(OpAction::Create, &payload, now)?,
            };

            if let Some(existing) = state
                .ops
                .iter()
                .find(|op| op.idempotency_key == key && op.status != OpStatus::Synced)
            {
                debug!(operation = %existing.id, "create already queued for this idempotency key");
                return Ok(Staged {
                    op_id: existing.id.clone(),
                    local_id: existing.local_id.clone().unwrap_or(local_id),
                    reused: true,
                });
            }

            let entity = payload.entity();
            let depends_on = merge_refs(payload.references(), options.depends_on);
            let op = SyncOperation {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                action: OpAction::Create,
                payload,
                idempotency_key: key,
                status: OpStatus::Queued,
                last_error: None,
                retry_count: 0,
                next_retry_at: None,
                local_id: Some(local_id.clone()),
                server_id: None,
                depends_on,
                local_modified_at: Some(options.modified_at.unwrap_or(now)),
            };
            let op_id = op.id.clone();

            // Optimistic self-mapping until the real server id arrives.
            state.id_map.insert(entity, local_id.clone(), local_id.clone());
            state.ops.push(op);

            Ok(Staged {
                op_id,
                local_id,
                reused: false,
            })
        }

        Mutation::Update { id, patch } => {
            let entity = patch.entity();
            let existing = state.ops.iter().position(|op| {
                op.entity() == entity
                    && op.can_absorb_update()
                    && (op.target_id() == Some(&id) || set_slot_matches(op, &patch))
            });

            if let Some(index) = existing {
                let new_refs = patch.references();
                let op = &mut state.ops[index];
                op.payload.merge(&patch);
                op.created_at = now;
                op.local_modified_at = Some(options.modified_at.unwrap_or(now));
                op.depends_on = merge_refs(
                    std::mem::take(&mut op.depends_on),
                    merge_refs(new_refs, options.depends_on),
                );
                if op.status == OpStatus::Failed {
                    op.status = OpStatus::Queued;
                    op.next_retry_at = None;
                    op.last_error = None;
                }
                debug!(operation = %op.id, entity = %entity, "update coalesced into queued operation");
                return Ok(Staged {
                    op_id: op.id.clone(),
                    local_id: id,
                    reused: false,
                });
            }

            let key = match options.idempotency_key {
                Some(key) => key,
                None => derive_idempotency_key(OpAction::Update, &patch, now)?,
            };
            let depends_on = merge_refs(patch.references(), options.depends_on);
            let op = SyncOperation {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                action: OpAction::Update,
                payload: patch,
                idempotency_key: key,
                status: OpStatus::Queued,
                last_error: None,
                retry_count: 0,
                next_retry_at: None,
                local_id: Some(id.clone()),
                server_id: None,
                depends_on,
                local_modified_at: Some(options.modified_at.unwrap_or(now)),
            };
            let op_id = op.id.clone();
            state.ops.push(op);

            Ok(Staged {
                op_id,
                local_id: id,
                reused: false,
            })
        }

        Mutation::Delete { entity, id } => {
            if let Some(existing) = state.ops.iter().find(|op| {
                op.action == OpAction::Delete
                    && op.entity() == entity
                    && op.target_id() == Some(&id)
                    && op.status != OpStatus::Synced
            }) {
                debug!(operation = %existing.id, "delete already queued");
                return Ok(Staged {
                    op_id: existing.id.clone(),
                    local_id: id,
                    reused: true,
                });
            }

            let mut payload = Payload::empty(entity);
            payload.set_id(id.clone());
            let key = match options.idempotency_key {
                Some(key) => key,
                None => derive_idempotency_key(OpAction::Delete, &payload, now)?,
            };
            let op = SyncOperation {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                action: OpAction::Delete,
                payload,
                idempotency_key: key,
                status: OpStatus::Queued,
                last_error: None,
                retry_count: 0,
                next_retry_at: None,
                local_id: Some(id.clone()),
                server_id: None,
                depends_on: options.depends_on,
                local_modified_at: Some(options.modified_at.unwrap_or(now)),
            };
            let op_id = op.id.clone();
            state.ops.push(op);

            Ok(Staged {
                op_id,
                local_id: id,
                reused: false,
            })
        }
    }
}

fn merge_refs(mut base: Vec<RecordRef>, extra: Vec<RecordRef>) -> Vec<RecordRef> {
    for r in extra {
        if !base.contains(&r) {
            base.push(r);
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use crate::sync::payload::{HealthEntryPatch, SessionExercisePatch, SessionPatch, SetPatch};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as TestMutex;

    // ========== Test remote ==========

    #[derive(Default)]
    struct FakeRemote {
        records: TestMutex<HashMap<String, Value>>,
        calls: TestMutex<Vec<String>>,
        failures: TestMutex<VecDeque<RemoteError>>,
        assigned: TestMutex<HashMap<String, String>>,
    }

    impl FakeRemote {
        fn key(entity: EntityKind, id: &RecordId) -> String {
            format!("{}:{}", entity.table(), id)
        }

        fn fail_next(&self, err: RemoteError) {
            self.failures.lock().unwrap().push_back(err);
        }

        /// Makes the server assign `server_id` when a create arrives
        /// with `local_id`.
        fn assign_server_id(&self, entity: EntityKind, local_id: &str, server_id: &str) {
            self.assigned
                .lock()
                .unwrap()
                .insert(Self::key(entity, &local_id.into()), server_id.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, entity: EntityKind, id: &str) -> Option<Value> {
            self.records.lock().unwrap().get(&Self::key(entity, &id.into())).cloned()
        }

        fn take_failure(&self) -> Option<RemoteError> {
            self.failures.lock().unwrap().pop_front()
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn create(&self, entity: EntityKind, payload: &Payload) -> Result<RemoteRecord, RemoteError> {
            let local_id = payload.id().cloned().unwrap_or_else(RecordId::generate);
            self.calls
                .lock()
                .unwrap()
                .push(format!("create {} {}", entity.table(), local_id));
            if let Some(err) = self.take_failure() {
                return Err(err);
            }

            let server_id: RecordId = self
                .assigned
                .lock()
                .unwrap()
                .get(&Self::key(entity, &local_id))
                .cloned()
                .map(RecordId::from)
                .unwrap_or_else(|| local_id.clone());

            let mut fields = payload.fields_json().map_err(|e| RemoteError::Rejected(e.to_string()))?;
            fields["id"] = json!(server_id.as_str());
            self.records
                .lock()
                .unwrap()
                .insert(Self::key(entity, &server_id), fields.clone());

            Ok(RemoteRecord {
                id: server_id,
                updated_at: None,
                fields,
            })
        }

        async fn update(
            &self,
            entity: EntityKind,
            id: &RecordId,
            patch: &Payload,
            _if_unmodified_since: Option<DateTime<Utc>>,
        ) -> Result<RemoteRecord, RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("update {} {}", entity.table(), id));
            if let Some(err) = self.take_failure() {
                return Err(err);
            }

            let fields = patch.fields_json().map_err(|e| RemoteError::Rejected(e.to_string()))?;
            let mut records = self.records.lock().unwrap();
            let existing = records
                .get_mut(&Self::key(entity, id))
                .ok_or_else(|| RemoteError::Rejected(format!("{} {} not found", entity, id)))?;

            if let (Some(stored), Some(patched)) = (existing.as_object_mut(), fields.as_object()) {
                for (field, value) in patched {
                    stored.insert(field.clone(), value.clone());
                }
            }

            Ok(RemoteRecord {
                id: id.clone(),
                updated_at: None,
                fields: existing.clone(),
            })
        }

        async fn delete(&self, entity: EntityKind, id: &RecordId) -> Result<(), RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete {} {}", entity.table(), id));
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.records.lock().unwrap().remove(&Self::key(entity, id));
            Ok(())
        }

        async fn fetch(&self, entity: EntityKind, id: &RecordId) -> Result<Option<RemoteRecord>, RemoteError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&Self::key(entity, id))
                .map(|fields| RemoteRecord {
                    id: id.clone(),
                    updated_at: None,
                    fields: fields.clone(),
                }))
        }
    }

    fn test_engine() -> (Arc<SyncEngine>, Arc<FakeRemote>) {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::default());
        let engine = SyncEngine::new("user-1", local, remote.clone());
        (engine, remote)
    }

    fn session_create(id: &str) -> Mutation {
        Mutation::Create(Payload::Session(SessionPatch {
            id: Some(id.into()),
            user_id: Some("user-1".to_string()),
            started_at: Some(Utc::now()),
            ..Default::default()
        }))
    }

    fn set_create(id: &str, parent: &str, reps: i64) -> Mutation {
        Mutation::Create(Payload::Set(SetPatch {
            id: Some(id.into()),
            session_exercise_id: Some(parent.into()),
            position: Some(0),
            weight_kg: Some(100.0),
            reps: Some(reps),
            ..Default::default()
        }))
    }

    async fn push_retry_into_past(engine: &Arc<SyncEngine>, op_id: &str) {
        let mut state = engine.state.lock().await;
        if let Some(op) = state.ops.iter_mut().find(|op| op.id == op_id) {
            op.next_retry_at = Some(Utc::now() - chrono::Duration::seconds(1));
        }
    }

    // ========== Enqueue ==========

    #[tokio::test]
    async fn test_enqueue_offline_queues() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();

        let outcome = engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        assert!(!outcome.synced);
        assert_eq!(outcome.local_id, "sess-1".into());
        assert!(remote.calls().is_empty());

        let state = engine.state();
        assert_eq!(state.queued, 1);
        assert!(!state.online);
    }

    #[tokio::test]
    async fn test_enqueue_online_syncs_immediately() {
        let (engine, remote) = test_engine();

        let outcome = engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        assert!(outcome.synced);
        assert_eq!(remote.calls(), vec!["create sessions sess-1"]);
        assert!(engine.pending_operations().await.unwrap().is_empty());
        assert_eq!(
            engine.server_id(EntityKind::Session, &"sess-1".into()).await.unwrap(),
            Some("sess-1".into())
        );
        assert!(engine.state().last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_enqueue_rejection_removes_op_and_returns_error() {
        let (engine, remote) = test_engine();
        remote.fail_next(RemoteError::Rejected("reps out of range".into()));

        let result = engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await;

        assert!(matches!(result, Err(SyncError::Remote(RemoteError::Rejected(_)))));
        assert!(engine.pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_network_failure_keeps_op_queued() {
        let (engine, remote) = test_engine();
        remote.fail_next(RemoteError::Network("connection refused".into()));

        let outcome = engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        assert!(!outcome.synced);
        assert!(!engine.is_online());
        assert_eq!(engine.pending_operations().await.unwrap().len(), 1);
        assert_eq!(engine.state().queued, 1);
    }

    #[tokio::test]
    async fn test_create_dedup_by_idempotency_key() {
        let (engine, _remote) = test_engine();
        engine.set_online(false).await.unwrap();

        let options = EnqueueOptions {
            idempotency_key: Some("finish-sess-1".to_string()),
            ..Default::default()
        };
        let first = engine.enqueue(session_create("sess-1"), options.clone()).await.unwrap();
        let second = engine.enqueue(session_create("sess-1"), options).await.unwrap();

        assert_eq!(first.operation_id, second.operation_id);
        assert_eq!(engine.pending_operations().await.unwrap().len(), 1);
    }

    // ========== Coalescing ==========

    #[tokio::test]
    async fn test_update_coalesces_into_queued_create() {
        let (engine, _remote) = test_engine();
        engine.set_online(false).await.unwrap();

        engine
            .enqueue(set_create("set-1", "se-1", 8), EnqueueOptions::default())
            .await
            .unwrap();
        engine
            .enqueue(
                Mutation::Update {
                    id: "set-1".into(),
                    patch: Payload::Set(SetPatch {
                        reps: Some(9),
                        rpe: Some(8.0),
                        ..Default::default()
                    }),
                },
                EnqueueOptions::default(),
            )
            .await
            .unwrap();

        let ops = engine.pending_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0].payload {
            Payload::Set(p) => {
                assert_eq!(p.weight_kg, Some(100.0));
                assert_eq!(p.reps, Some(9));
                assert_eq!(p.rpe, Some(8.0));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_updates_match_by_parent_and_position() {
        let (engine, _remote) = test_engine();
        engine.set_online(false).await.unwrap();

        let slot = |reps: i64| Payload::Set(SetPatch {
            session_exercise_id: Some("se-1".into()),
            position: Some(2),
            reps: Some(reps),
            ..Default::default()
        });

        engine
            .enqueue(Mutation::Update { id: "set-a".into(), patch: slot(8) }, EnqueueOptions::default())
            .await
            .unwrap();
        // Same slot, different local row id: still the same set.
        engine
            .enqueue(Mutation::Update { id: "set-b".into(), patch: slot(10) }, EnqueueOptions::default())
            .await
            .unwrap();

        let ops = engine.pending_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        match &ops[0].payload {
            Payload::Set(p) => assert_eq!(p.reps, Some(10)),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_coalescing_resets_failed_status() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();

        engine
            .enqueue(set_create("set-1", "se-1", 8), EnqueueOptions::default())
            .await
            .unwrap();

        remote.fail_next(RemoteError::Rejected("invalid".into()));
        engine.set_online(true).await.unwrap();

        let failed = engine.failed_operations().await.unwrap();
        assert_eq!(failed.len(), 1);

        engine.set_online(false).await.unwrap();
        engine
            .enqueue(
                Mutation::Update {
                    id: "set-1".into(),
                    patch: Payload::Set(SetPatch { reps: Some(10), ..Default::default() }),
                },
                EnqueueOptions::default(),
            )
            .await
            .unwrap();

        let ops = engine.pending_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].status, OpStatus::Queued);
        assert!(ops[0].next_retry_at.is_none());
    }

    // ========== Ordering and dependencies ==========

    #[tokio::test]
    async fn test_parents_drain_before_children_with_fk_rewrite() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();
        remote.assign_server_id(EntityKind::Session, "sess-1", "srv-100");

        // Children enqueued first; entity order must still win.
        engine
            .enqueue(
                Mutation::Create(Payload::SessionExercise(SessionExercisePatch {
                    id: Some("se-1".into()),
                    session_id: Some("sess-1".into()),
                    exercise_id: Some("ex-1".into()),
                    position: Some(0),
                    ..Default::default()
                })),
                EnqueueOptions::default(),
            )
            .await
            .unwrap();
        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        let report = engine.set_online(true).await.unwrap();
        assert_eq!(report.synced, 2);

        let calls = remote.calls();
        assert_eq!(calls[0], "create sessions sess-1");
        assert_eq!(calls[1], "create session_exercises se-1");

        // The child reached the server with the rewritten parent id.
        let stored = remote.record(EntityKind::SessionExercise, "se-1").unwrap();
        assert_eq!(stored["session_id"], "srv-100");
        assert_eq!(
            engine.server_id(EntityKind::Session, &"sess-1".into()).await.unwrap(),
            Some("srv-100".into())
        );
    }

    #[tokio::test]
    async fn test_child_skipped_while_parent_create_pending() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();

        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();
        engine
            .enqueue(
                Mutation::Create(Payload::SessionExercise(SessionExercisePatch {
                    id: Some("se-1".into()),
                    session_id: Some("sess-1".into()),
                    position: Some(0),
                    ..Default::default()
                })),
                EnqueueOptions::default(),
            )
            .await
            .unwrap();

        // Parent create fails; child must be skipped, not failed.
        remote.fail_next(RemoteError::Rejected("invalid".into()));
        let report = engine.set_online(true).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);

        let ops = engine.pending_operations().await.unwrap();
        let child = ops.iter().find(|op| op.local_id == Some("se-1".into())).unwrap();
        assert_eq!(child.status, OpStatus::Queued);
        assert_eq!(child.retry_count, 0);

        // Parent succeeds on retry; the child drains in the same pass.
        let failed = engine.failed_operations().await.unwrap();
        push_retry_into_past(&engine, &failed[0].id).await;
        let report = engine.process_sync_queue().await.unwrap();
        assert_eq!(report.synced, 2);
        assert!(engine.pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_dependencies_respected() {
        let (engine, _remote) = test_engine();
        engine.set_online(false).await.unwrap();

        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();
        engine
            .enqueue(
                Mutation::Create(Payload::HealthEntry(HealthEntryPatch {
                    id: Some("h-1".into()),
                    metric: Some("bodyweight".into()),
                    value: Some(82.0),
                    ..Default::default()
                })),
                EnqueueOptions {
                    depends_on: vec![RecordRef::new(EntityKind::Session, "sess-1".into())],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ops = engine.pending_operations().await.unwrap();
        let entry = ops.iter().find(|op| op.entity() == EntityKind::HealthEntry).unwrap();
        assert_eq!(entry.depends_on, vec![RecordRef::new(EntityKind::Session, "sess-1".into())]);
    }

    // ========== Failure handling ==========

    #[tokio::test]
    async fn test_network_error_aborts_pass() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();

        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();
        engine
            .enqueue(session_create("sess-2"), EnqueueOptions::default())
            .await
            .unwrap();

        remote.fail_next(RemoteError::Network("connection reset".into()));
        let report = engine.set_online(true).await.unwrap();

        assert!(report.aborted_offline);
        assert_eq!(report.attempted, 1);
        assert!(!engine.is_online());

        // Only one call went out; both operations survive as queued.
        assert_eq!(remote.calls().len(), 1);
        let ops = engine.pending_operations().await.unwrap();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.status == OpStatus::Queued));
    }

    #[tokio::test]
    async fn test_rejection_backs_off_on_schedule() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();
        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        let expected_gaps = [2, 5, 15, 30, 60, 60];
        for (attempt, gap) in expected_gaps.iter().enumerate() {
            remote.fail_next(RemoteError::Rejected("invalid".into()));
            if attempt > 0 {
                let failed = engine.failed_operations().await.unwrap();
                push_retry_into_past(&engine, &failed[0].id).await;
            }
            let before = Utc::now();
            engine.process_sync_queue().await.unwrap();

            let failed = engine.failed_operations().await.unwrap();
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].retry_count, attempt as u32 + 1);

            let scheduled = failed[0].next_retry_at.unwrap();
            let delta = (scheduled - before).num_seconds();
            assert!(
                (delta - gap).abs() <= 1,
                "attempt {}: expected ~{}s gap, got {}s",
                attempt + 1,
                gap,
                delta
            );
        }
    }

    #[tokio::test]
    async fn test_budget_exhaustion_holds_op_for_manual_retry() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();
        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        for attempt in 0..MAX_RETRIES {
            remote.fail_next(RemoteError::Rejected("invalid".into()));
            if attempt > 0 {
                let failed = engine.failed_operations().await.unwrap();
                push_retry_into_past(&engine, &failed[0].id).await;
            }
            engine.process_sync_queue().await.unwrap();
        }

        let failed = engine.failed_operations().await.unwrap();
        assert_eq!(failed[0].retry_count, MAX_RETRIES);
        assert!(failed[0].next_retry_at.is_none());

        // No longer eligible for automatic passes.
        let report = engine.process_sync_queue().await.unwrap();
        assert_eq!(report.attempted, 0);

        // Manual retry restores the budget and succeeds.
        let report = engine.retry_failed().await.unwrap();
        assert_eq!(report.synced, 1);
        assert!(engine.pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_held_without_auto_retry() {
        let (engine, remote) = test_engine();

        // Seed a server-side record, then queue an update for it.
        engine
            .enqueue(set_create("set-1", "se-1", 8), EnqueueOptions::default())
            .await
            .unwrap();
        engine.set_online(false).await.unwrap();
        engine
            .enqueue(
                Mutation::Update {
                    id: "set-1".into(),
                    patch: Payload::Set(SetPatch { reps: Some(9), ..Default::default() }),
                },
                EnqueueOptions::default(),
            )
            .await
            .unwrap();

        remote.fail_next(RemoteError::Conflict("row changed".into()));
        let report = engine.set_online(true).await.unwrap();
        assert_eq!(report.failed, 1);

        let state = engine.state();
        assert!(state.conflict.is_some());
        assert!(state.conflict.unwrap().contains("sets set-1"));

        let failed = engine.failed_operations().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].next_retry_at.is_none());
        assert_eq!(failed[0].retry_count, 0);

        // Held: another pass must not touch it.
        let report = engine.process_sync_queue().await.unwrap();
        assert_eq!(report.attempted, 0);

        // Manual retry clears the conflict and applies the update.
        let report = engine.retry_operation(&failed[0].id).await.unwrap();
        assert_eq!(report.synced, 1);
        assert!(engine.state().conflict.is_none());
        let stored = remote.record(EntityKind::Set, "set-1").unwrap();
        assert_eq!(stored["reps"], 9);
    }

    #[tokio::test]
    async fn test_duplicate_create_treated_as_success() {
        let (engine, remote) = test_engine();
        engine.set_online(false).await.unwrap();
        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        remote.fail_next(RemoteError::Duplicate("unique violation".into()));
        let report = engine.set_online(true).await.unwrap();

        assert_eq!(report.synced, 1);
        assert!(engine.pending_operations().await.unwrap().is_empty());
        assert_eq!(
            engine.server_id(EntityKind::Session, &"sess-1".into()).await.unwrap(),
            Some("sess-1".into())
        );
    }

    // ========== Persistence ==========

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let temp = tempfile::TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::default());

        {
            let local = Arc::new(FileStore::new(temp.path().to_path_buf()));
            let engine = SyncEngine::new("user-1", local, remote.clone());
            engine.set_online(false).await.unwrap();
            engine
                .enqueue(session_create("sess-1"), EnqueueOptions::default())
                .await
                .unwrap();
            engine
                .enqueue(set_create("set-1", "se-1", 8), EnqueueOptions::default())
                .await
                .unwrap();
        }

        let local = Arc::new(FileStore::new(temp.path().to_path_buf()));
        let engine = SyncEngine::new("user-1", local, remote);
        let ops = engine.pending_operations().await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(
            engine.server_id(EntityKind::Session, &"sess-1".into()).await.unwrap(),
            Some("sess-1".into())
        );
    }

    #[tokio::test]
    async fn test_queues_are_scoped_per_user() {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::default());

        let engine_a = SyncEngine::new("user-a", local.clone(), remote.clone());
        let engine_b = SyncEngine::new("user-b", local, remote);
        engine_a.set_online(false).await.unwrap();
        engine_b.set_online(false).await.unwrap();

        engine_a
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        assert_eq!(engine_a.pending_operations().await.unwrap().len(), 1);
        assert!(engine_b.pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_durable_state() {
        let temp = tempfile::TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(FileStore::new(temp.path().to_path_buf()));

        let engine = SyncEngine::new("user-1", local, remote.clone());
        engine.set_online(false).await.unwrap();
        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        engine.clear().await.unwrap();
        assert!(engine.pending_operations().await.unwrap().is_empty());
        assert_eq!(engine.state().queued, 0);

        let local = Arc::new(FileStore::new(temp.path().to_path_buf()));
        let engine = SyncEngine::new("user-1", local, remote);
        assert!(engine.pending_operations().await.unwrap().is_empty());
    }

    // ========== State broadcast ==========

    #[tokio::test]
    async fn test_subscribe_observes_queue_changes() {
        let (engine, _remote) = test_engine();
        let mut rx = engine.subscribe();
        engine.set_online(false).await.unwrap();

        engine
            .enqueue(session_create("sess-1"), EnqueueOptions::default())
            .await
            .unwrap();

        rx.changed().await.unwrap();
        let state = rx.borrow().clone();
        assert_eq!(state.queued, 1);
        assert!(!state.online);
    }

    #[tokio::test]
    async fn test_set_id_mapping_externally() {
        let (engine, _remote) = test_engine();
        engine
            .set_id_mapping(EntityKind::Exercise, "local-ex".into(), "srv-ex".into())
            .await
            .unwrap();
        assert_eq!(
            engine.server_id(EntityKind::Exercise, &"local-ex".into()).await.unwrap(),
            Some("srv-ex".into())
        );
    }
}
