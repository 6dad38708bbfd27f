use chrono::Utc;
use deposit_core::{
    CallbackEvent, CallbackSubject, FileSet, FileSetAttributes, FileSetParams, StoreError,
    ValidationErrors,
};
use tracing::{debug, info};

use super::{FileSetActor, MetadataOutcome};
use crate::error::{ActorError, ActorResult};
use crate::visibility::apply_access;

impl FileSetActor {
    /// Stamp depositor, dates and creator, and apply any explicit access settings.
    ///
    /// Nothing is persisted; the caller saves the file set as part of content
    /// creation or attachment.
    pub fn create_metadata(&mut self, params: &FileSetParams) -> MetadataOutcome {
        let mut draft = self.file_set.clone();
        draft.apply_depositor_metadata(&self.user);
        let now = Utc::now();
        draft.date_uploaded = Some(now);
        draft.date_modified = Some(now);
        draft.creator = vec![self.user.user_key.clone()];

        if params.assigns_visibility()
            && let Err(errors) = apply_access(&mut draft, params, now)
        {
            debug!(%errors, "access settings rejected");
            return MetadataOutcome::Rejected(errors);
        }
        self.file_set = draft;
        MetadataOutcome::Applied
    }

    /// Apply `attributes` on behalf of a user allowed to edit the file set and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Persistence`] when the store fails for a reason
    /// other than validation. Authorization and validation failures are
    /// reported as [`MetadataOutcome::Rejected`].
    pub async fn update_metadata(
        &mut self,
        attributes: &FileSetAttributes,
    ) -> ActorResult<MetadataOutcome> {
        let ability = self.services.abilities.ability_for(&self.user);
        if !ability.can_edit(&self.file_set) {
            let mut errors = ValidationErrors::default();
            errors.add("base", "not authorized to edit");
            info!(user = %self.user.user_key, file_set_id = ?self.file_set.id, "metadata update denied");
            return Ok(MetadataOutcome::Rejected(errors));
        }

        let now = Utc::now();
        let mut draft = self.file_set.clone();
        apply_attributes(&mut draft, attributes);
        if attributes.access.assigns_visibility()
            && let Err(errors) = apply_access(&mut draft, &attributes.access, now)
        {
            return Ok(MetadataOutcome::Rejected(errors));
        }
        if let Err(errors) = draft.validate().into_result() {
            return Ok(MetadataOutcome::Rejected(errors));
        }
        draft.date_modified = Some(now);

        match self.services.store.save_file_set(&draft).await {
            Ok(saved) => self.file_set = saved,
            Err(StoreError::Invalid { errors, .. }) => return Ok(MetadataOutcome::Rejected(errors)),
            Err(err) => return Err(ActorError::persistence("save_file_set", err)),
        }

        self.services.run_callback(
            CallbackEvent::AfterUpdateMetadata,
            CallbackSubject::FileSet(&self.file_set),
            &self.user,
            None,
        );
        Ok(MetadataOutcome::Applied)
    }
}

fn apply_attributes(file_set: &mut FileSet, attributes: &FileSetAttributes) {
    if let Some(title) = &attributes.title {
        file_set.title.clone_from(title);
    }
    if let Some(label) = &attributes.label {
        file_set.label = Some(label.clone());
    }
    if let Some(creator) = &attributes.creator {
        file_set.creator.clone_from(creator);
    }
    if let Some(description) = &attributes.description {
        file_set.description.clone_from(description);
    }
    if let Some(keyword) = &attributes.keyword {
        file_set.keyword.clone_from(keyword);
    }
    if let Some(license) = &attributes.license {
        file_set.license.clone_from(license);
    }
}
