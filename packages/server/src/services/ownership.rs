//! Owner checks shared by the history, recipe, image and conversation services.

use super::ServiceError;

/// Fail with `denial` unless `caller` is the recorded owner.
pub fn require_owner(owner: i32, caller: i32, denial: ServiceError) -> Result<(), ServiceError> {
    if owner == caller { Ok(()) } else { Err(denial) }
}

/// Unowned artifacts are readable by anyone holding the link; owned ones only by the owner.
pub fn can_read_artifact(owner: Option<i32>, caller: Option<i32>) -> bool {
    match owner {
        None => true,
        Some(owner) => caller == Some(owner),
    }
}

/// An unreferenced artifact may be removed when it is unowned or owned by the deleter.
pub fn can_reclaim(owner: Option<i32>, deleter: i32) -> bool {
    owner.is_none_or(|owner| owner == deleter)
}
