use chrono::Utc;
use deposit_core::{CallbackEvent, CallbackSubject, FileSetId, FileSetParams, StoreError, Work};
use deposit_events::Event;
use tracing::{debug, info, warn};

use super::{AttachOutcome, FileSetActor};
use crate::error::{ActorError, ActorResult};
use crate::lock::work_key;

/// Reapply attempts after a concurrent writer bumped the work version.
const STALE_RETRIES: usize = 3;

impl FileSetActor {
    /// Append the file set to `work` under the work's lock.
    ///
    /// Inside the lock the work is reloaded from the store, the file set
    /// inherits the work's visibility unless `params` assigned one, and the
    /// member is appended. The first attached member becomes representative
    /// and thumbnail. Attaching the same pair twice appends a duplicate entry.
    /// The `after_create_fileset` callback runs once the lock is released, so
    /// its ordering across concurrent attachments is unspecified.
    ///
    /// On success `work` holds the saved state.
    ///
    /// # Errors
    ///
    /// - [`ActorError::LockTimeout`] when the lock is not acquired in time; the
    ///   member list is not touched.
    /// - [`ActorError::NotFound`] when a persisted work has been deleted.
    /// - [`ActorError::Persistence`] when the file set cannot be saved before
    ///   attachment or the work cannot be reloaded.
    ///
    /// A rejected work save is reported through [`AttachOutcome::work_saved`].
    pub async fn attach_to_work(
        &mut self,
        work: &mut Work,
        params: &FileSetParams,
    ) -> ActorResult<AttachOutcome> {
        let file_set_id = self.ensure_saved().await?;
        let key = work_key(work.id);
        let locks = self.services.locks.clone();
        let work_saved = locks
            .with_lock(&key, || self.attach_locked(work, file_set_id, params))
            .await??;

        let file_set_saved = match self.services.store.save_file_set(&self.file_set).await {
            Ok(saved) => {
                self.file_set = saved;
                true
            }
            Err(err) => {
                warn!(file_set_id = %file_set_id, error = %err, "file set not saved after attach");
                false
            }
        };

        self.services.run_callback(
            CallbackEvent::AfterCreateFileset,
            CallbackSubject::FileSet(&self.file_set),
            &self.user,
            None,
        );
        if work_saved {
            self.services.metrics.inc_attachment();
            self.services.publish(Event::FileSetAttached {
                file_set_id: file_set_id.as_uuid(),
                work_id: work.id.as_uuid(),
            });
            info!(file_set_id = %file_set_id, work_id = %work.id, "file set attached");
        }

        Ok(AttachOutcome {
            work_saved,
            file_set_saved,
        })
    }

    async fn attach_locked(
        &mut self,
        work: &mut Work,
        file_set_id: FileSetId,
        params: &FileSetParams,
    ) -> ActorResult<bool> {
        let mut retries = 0;
        loop {
            let mut current = self.latest_work(work).await?;

            if !params.assigns_visibility() {
                self.file_set.visibility = Some(current.visibility);
            }

            current.member_ids.push(file_set_id);
            if current.representative_id.is_none() {
                current.representative_id = Some(file_set_id);
            }
            if current.thumbnail_id.is_none() {
                current.thumbnail_id = Some(file_set_id);
            }
            current.date_modified = Some(Utc::now());

            match self.services.store.save_work(&current).await {
                Ok(saved) => {
                    debug!(work_id = %saved.id, members = saved.member_ids.len(), version = saved.version, "work saved");
                    *work = saved;
                    return Ok(true);
                }
                Err(StoreError::Stale { found, .. }) if retries < STALE_RETRIES => {
                    retries += 1;
                    debug!(work_id = %current.id, found, retries, "work changed underneath; reapplying");
                }
                Err(err) => {
                    warn!(work_id = %current.id, error = %err, "work not saved; attachment dropped");
                    return Ok(false);
                }
            }
        }
    }

    /// Stored copy of `work`, or the caller's copy when it was never saved.
    async fn latest_work(&self, work: &Work) -> ActorResult<Work> {
        match self.services.store.find_work(work.id).await {
            Ok(stored) => Ok(stored),
            Err(err) if err.is_not_found() && !work.is_persisted() => Ok(work.clone()),
            Err(err) => Err(ActorError::lookup("find_work", err)),
        }
    }

    /// Persist the file set when it has no identifier yet, titling it after
    /// its label when untitled.
    async fn ensure_saved(&mut self) -> ActorResult<FileSetId> {
        if let Some(id) = self.file_set.id {
            return Ok(id);
        }
        if let Some(label) = self.file_set.label.clone() {
            self.file_set.assign_default_label(move || label);
        }
        let saved = self
            .services
            .store
            .save_file_set(&self.file_set)
            .await
            .map_err(|err| ActorError::persistence("save_file_set", err))?;
        let id = saved.id.ok_or(ActorError::Unsaved {
            operation: "attach_to_work",
        })?;
        self.file_set = saved;
        Ok(id)
    }
}
