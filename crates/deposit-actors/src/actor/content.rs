use deposit_core::{CallbackEvent, CallbackSubject, ContentSource, Relation, Task, TaskHandle};
use deposit_events::Event;
use tracing::{info, warn};

use super::{ContentOutcome, FileSetActor};
use crate::error::ActorResult;
use crate::wrapper::ContentWrapper;

impl FileSetActor {
    /// Assign a default label, persist the file set and ingest `source`.
    ///
    /// With `from_url` the payload is ingested in-process and the parent's
    /// visibility and permissions are propagated by deferred tasks; otherwise
    /// ingestion itself is deferred.
    ///
    /// # Errors
    ///
    /// Fails when the descriptor cannot be saved, when in-process ingest
    /// fails, or when the ingest task cannot be enqueued. A failed file set
    /// save is reported as [`ContentOutcome::NotSaved`].
    pub async fn create_content(
        &mut self,
        source: ContentSource,
        relation: Relation,
        from_url: bool,
    ) -> ActorResult<ContentOutcome> {
        let label = ContentWrapper::label_for(&self.file_set, &source);
        self.file_set.assign_default_label(move || label);

        match self.services.store.save_file_set(&self.file_set).await {
            Ok(saved) => self.file_set = saved,
            Err(err) => {
                warn!(error = %err, "file set not saved; content not scheduled");
                return Ok(ContentOutcome::NotSaved(err));
            }
        }

        let descriptor = self
            .wrapper()
            .wrap(&self.file_set, &self.user, source, relation)
            .await?;

        if !from_url {
            let handle = self
                .services
                .queue
                .enqueue(Task::Ingest {
                    descriptor_id: descriptor.id,
                    notify: false,
                })
                .await?;
            info!(descriptor_id = %descriptor.id, task_id = %handle.id, "ingest scheduled");
            return Ok(ContentOutcome::Scheduled(handle));
        }

        let version = self.services.ingest.ingest_file(&descriptor).await?;
        self.services.publish(Event::ContentIngested {
            file_set_id: version.file_set_id.as_uuid(),
            relation: version.relation.as_str().to_string(),
            revision_id: version.revision_id.clone(),
            user_key: self.user.user_key.clone(),
            notify: false,
        });
        let follow_ups = self.propagate_from_parent().await;
        Ok(ContentOutcome::Ingested {
            version,
            follow_ups,
        })
    }

    /// Defer ingest of a new version of `relation` and notify the user when done.
    ///
    /// # Errors
    ///
    /// Fails when the file set has no identifier, the descriptor cannot be
    /// saved, or the task cannot be enqueued.
    pub async fn update_content(
        &mut self,
        source: ContentSource,
        relation: Relation,
    ) -> ActorResult<TaskHandle> {
        let descriptor = self
            .wrapper()
            .wrap(&self.file_set, &self.user, source, relation)
            .await?;
        let handle = self
            .services
            .queue
            .enqueue(Task::Ingest {
                descriptor_id: descriptor.id,
                notify: true,
            })
            .await?;
        info!(descriptor_id = %descriptor.id, task_id = %handle.id, "content update scheduled");
        Ok(handle)
    }

    /// Restore `revision_id` as the newest version of `relation`.
    ///
    /// Returns `false` instead of an error when the revert fails.
    pub async fn revert_content(&mut self, revision_id: &str, relation: Relation) -> bool {
        let Some(file_set_id) = self.file_set.id else {
            warn!(revision_id, "revert skipped; file set not persisted");
            return false;
        };
        match self
            .services
            .ingest
            .revert_to(file_set_id, relation, revision_id, &self.user)
            .await
        {
            Ok(version) => {
                self.services.run_callback(
                    CallbackEvent::AfterRevertContent,
                    CallbackSubject::FileSet(&self.file_set),
                    &self.user,
                    Some(revision_id),
                );
                self.services.publish(Event::ContentReverted {
                    file_set_id: file_set_id.as_uuid(),
                    relation: relation.as_str().to_string(),
                    revision_id: version.revision_id,
                    user_key: self.user.user_key.clone(),
                });
                true
            }
            Err(err) => {
                warn!(file_set_id = %file_set_id, revision_id, error = %err, "revert failed");
                false
            }
        }
    }

    /// Queue visibility and permission propagation from the parent work, if any.
    async fn propagate_from_parent(&self) -> Vec<TaskHandle> {
        let Some(file_set_id) = self.file_set.id else {
            return Vec::new();
        };
        let parent = match self.services.store.find_parent(file_set_id).await {
            Ok(Some(parent)) => parent,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(file_set_id = %file_set_id, error = %err, "parent lookup failed; propagation skipped");
                return Vec::new();
            }
        };

        let mut handles = Vec::with_capacity(2);
        for task in [
            Task::CopyVisibility { work_id: parent.id },
            Task::InheritPermissions { work_id: parent.id },
        ] {
            let kind = task.kind();
            match self.services.queue.enqueue(task).await {
                Ok(handle) => handles.push(handle),
                Err(err) => warn!(work_id = %parent.id, kind, error = %err, "propagation not queued"),
            }
        }
        handles
    }
}
