//! Executes deferred tasks against the store and reports outcomes as events.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use deposit_core::{
    DescriptorId, FileSet, IngestStrategy, ResourceStore, Task, TaskHandle, WorkId,
};
use deposit_events::{Event, EventBus};
use deposit_telemetry::Metrics;
use tracing::{debug, info};

use crate::error::{JobError, JobResult};

/// Runs a single task attempt. Every task kind is safe to re-run.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn ResourceStore>,
    ingest: Arc<dyn IngestStrategy>,
    events: EventBus,
    metrics: Metrics,
}

impl JobRunner {
    /// Construct a runner over the shared collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        ingest: Arc<dyn IngestStrategy>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            ingest,
            events,
            metrics,
        }
    }

    /// Execute one attempt of `task`.
    ///
    /// # Errors
    ///
    /// Returns an error when a referenced record cannot be loaded or saved, or
    /// when the ingest strategy fails.
    pub async fn run(&self, task: &Task) -> JobResult<()> {
        match task {
            Task::Ingest {
                descriptor_id,
                notify,
            } => self.ingest(*descriptor_id, *notify).await,
            Task::CopyVisibility { work_id } => self.copy_visibility(*work_id).await,
            Task::InheritPermissions { work_id } => self.inherit_permissions(*work_id).await,
        }
    }

    /// Publish the failure notification for a task that exhausted its attempts.
    pub async fn report_failure(&self, handle: &TaskHandle, task: &Task, error: &JobError) {
        let message = describe(error);
        let event = match task {
            Task::Ingest { descriptor_id, .. } => {
                let descriptor = self.store.find_descriptor(*descriptor_id).await.ok();
                Event::IngestFailed {
                    file_set_id: descriptor.as_ref().map(|d| d.file_set_id.as_uuid()),
                    descriptor_id: descriptor_id.as_uuid(),
                    user_key: descriptor.map(|d| d.user_key),
                    message,
                }
            }
            Task::CopyVisibility { .. } | Task::InheritPermissions { .. } => Event::TaskFailed {
                task_id: handle.id,
                kind: task.kind().to_string(),
                message,
            },
        };
        self.publish(event);
    }

    async fn ingest(&self, descriptor_id: DescriptorId, notify: bool) -> JobResult<()> {
        let descriptor = self
            .store
            .find_descriptor(descriptor_id)
            .await
            .map_err(|source| JobError::store("find_descriptor", source))?;
        let version = self.ingest.ingest_file(&descriptor).await?;
        self.publish(Event::ContentIngested {
            file_set_id: version.file_set_id.as_uuid(),
            relation: version.relation.as_str().to_string(),
            revision_id: version.revision_id,
            user_key: descriptor.user_key,
            notify,
        });
        Ok(())
    }

    async fn copy_visibility(&self, work_id: WorkId) -> JobResult<()> {
        let work = self
            .store
            .find_work(work_id)
            .await
            .map_err(|source| JobError::store("find_work", source))?;
        let updated = self
            .update_members(work_id, |member| {
                if member.visibility == Some(work.visibility) {
                    return false;
                }
                member.visibility = Some(work.visibility);
                true
            })
            .await?;
        info!(work_id = %work_id, updated, visibility = %work.visibility, "visibility copied to members");
        self.publish(Event::VisibilityCopied {
            work_id: work_id.as_uuid(),
            updated,
        });
        Ok(())
    }

    async fn inherit_permissions(&self, work_id: WorkId) -> JobResult<()> {
        let work = self
            .store
            .find_work(work_id)
            .await
            .map_err(|source| JobError::store("find_work", source))?;
        let updated = self
            .update_members(work_id, |member| member.permissions.merge(&work.permissions))
            .await?;
        info!(work_id = %work_id, updated, "permissions inherited by members");
        self.publish(Event::PermissionsInherited {
            work_id: work_id.as_uuid(),
            updated,
        });
        Ok(())
    }

    /// Apply `change` to each distinct member, saving only those it modified.
    async fn update_members<F>(&self, work_id: WorkId, mut change: F) -> JobResult<usize>
    where
        F: FnMut(&mut FileSet) -> bool + Send,
    {
        let members = self
            .store
            .find_members(work_id)
            .await
            .map_err(|source| JobError::store("find_members", source))?;
        let mut seen = HashSet::new();
        let mut updated = 0;
        for mut member in members {
            if !member.id.is_some_and(|id| seen.insert(id)) || !change(&mut member) {
                continue;
            }
            member.date_modified = Some(Utc::now());
            self.store
                .save_file_set(&member)
                .await
                .map_err(|source| JobError::store("save_member", source))?;
            updated += 1;
        }
        debug!(work_id = %work_id, updated, "member updates saved");
        Ok(updated)
    }

    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }
}

fn describe(error: &JobError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
