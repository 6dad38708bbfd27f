use chrono::Utc;
use deposit_core::{CallbackEvent, CallbackSubject, FileSetId, Work, WorkId};
use deposit_events::Event;
use tracing::{debug, info};

use super::FileSetActor;
use crate::error::{ActorError, ActorResult};
use crate::lock::work_key;

impl FileSetActor {
    /// Detach the file set from its parent work, then delete it.
    ///
    /// The deletion runs under the parent work's lock. The parent is saved
    /// only when it referenced the file set as representative or thumbnail,
    /// and always before the deletion.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Unsaved`] for a file set without identifier,
    /// [`ActorError::NotFound`] when the file set or its parent vanished
    /// concurrently, [`ActorError::LockTimeout`] when the parent is locked and
    /// [`ActorError::Persistence`] when a store call fails.
    pub async fn destroy(&mut self) -> ActorResult<()> {
        let file_set_id = self.file_set.id.ok_or(ActorError::Unsaved {
            operation: "destroy",
        })?;

        let parent = self
            .services
            .store
            .find_parent(file_set_id)
            .await
            .map_err(|err| ActorError::persistence("find_parent", err))?;
        let work_id = parent.as_ref().map(|work| work.id);

        match parent {
            Some(parent) => {
                let key = work_key(parent.id);
                let locks = self.services.locks.clone();
                locks
                    .with_lock(&key, || self.detach_and_delete(&parent, file_set_id))
                    .await??;
            }
            None => self.delete(file_set_id).await?,
        }

        self.services.run_callback(
            CallbackEvent::AfterDestroy,
            CallbackSubject::FileSetId(file_set_id),
            &self.user,
            None,
        );
        self.services.publish(Event::FileSetDestroyed {
            file_set_id: file_set_id.as_uuid(),
            work_id: work_id.map(|id| id.as_uuid()),
        });
        info!(file_set_id = %file_set_id, work_id = ?work_id, "file set destroyed");
        Ok(())
    }

    /// Runs under the parent's lock: the store's delete also rewrites the
    /// parent's member list.
    async fn detach_and_delete(&self, parent: &Work, file_set_id: FileSetId) -> ActorResult<()> {
        if parent.representative_id == Some(file_set_id) || parent.thumbnail_id == Some(file_set_id)
        {
            self.unlink(parent.id, file_set_id).await?;
        }
        self.delete(file_set_id).await
    }

    async fn delete(&self, file_set_id: FileSetId) -> ActorResult<()> {
        self.services
            .store
            .delete_file_set(file_set_id)
            .await
            .map_err(|err| ActorError::lookup("delete_file_set", err))
    }

    /// Clear representative and thumbnail references to `file_set_id` on the latest copy of the work.
    async fn unlink(&self, work_id: WorkId, file_set_id: FileSetId) -> ActorResult<()> {
        let mut work = self
            .services
            .store
            .find_work(work_id)
            .await
            .map_err(|err| ActorError::lookup("find_work", err))?;

        let mut changed = false;
        if work.representative_id == Some(file_set_id) {
            work.representative_id = None;
            changed = true;
        }
        if work.thumbnail_id == Some(file_set_id) {
            work.thumbnail_id = None;
            changed = true;
        }
        if !changed {
            return Ok(());
        }

        work.date_modified = Some(Utc::now());
        let saved = self
            .services
            .store
            .save_work(&work)
            .await
            .map_err(|err| ActorError::persistence("save_work", err))?;
        debug!(work_id = %saved.id, version = saved.version, "work references cleared");
        Ok(())
    }
}
