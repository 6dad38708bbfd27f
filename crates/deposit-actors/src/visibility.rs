//! Explicit visibility assignment: embargo, then lease, then plain visibility.

use chrono::{DateTime, Utc};
use deposit_core::{Embargo, FileSet, FileSetParams, Lease, ValidationErrors, Visibility};

/// Apply the access settings in `params` to `file_set`.
///
/// An embargo or lease date must lie after `now`; otherwise the file set is
/// left untouched and the failure is returned.
///
/// # Errors
///
/// Returns the collected validation failures when a date is not in the future.
pub fn apply_access(
    file_set: &mut FileSet,
    params: &FileSetParams,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(release_date) = params.embargo_release_date {
        if release_date <= now {
            errors.add("embargo_release_date", "must be a future date");
            return Err(errors);
        }
        let visibility_during = params
            .visibility_during_embargo
            .unwrap_or(Visibility::Restricted);
        file_set.embargo = Some(Embargo {
            release_date,
            visibility_during,
            visibility_after: params.visibility_after_embargo.unwrap_or(Visibility::Open),
        });
        file_set.lease = None;
        file_set.visibility = Some(visibility_during);
    } else if let Some(expiration_date) = params.lease_expiration_date {
        if expiration_date <= now {
            errors.add("lease_expiration_date", "must be a future date");
            return Err(errors);
        }
        let visibility_during = params.visibility_during_lease.unwrap_or(Visibility::Open);
        file_set.lease = Some(Lease {
            expiration_date,
            visibility_during,
            visibility_after: params
                .visibility_after_lease
                .unwrap_or(Visibility::Restricted),
        });
        file_set.embargo = None;
        file_set.visibility = Some(visibility_during);
    } else if let Some(visibility) = params.visibility {
        file_set.visibility = Some(visibility);
    }
    Ok(())
}
