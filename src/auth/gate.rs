//! Authorization decisions that go beyond ownership scoping.
//!
//! Ownership itself is enforced at the query layer (every task query filters
//! by the requesting user's id); the only elevation in the system is the
//! binary staff flag checked here.

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;

/// Requires the requester to be a staff user.
///
/// Non-staff requesters receive `Forbidden` (403). This is distinct from the
/// `NotFound` used for ownership mismatches: the existence of an admin
/// endpoint is not secret, only the data behind it.
pub fn require_staff(user: &CurrentUser) -> Result<(), AppError> {
    if user.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden("Staff access required".into()))
    }
}
