use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use super::repository::RepositoryError;

pub const ID_LENGTH: usize = 10;

const INSERT_ATTEMPTS: usize = 3;

/// Generates a short identifier from the 62-character alphanumeric alphabet.
/// The generator makes no uniqueness promise; the store's unique-id
/// constraint does.
pub fn generate() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Runs `insert` with freshly generated identifiers while the store reports
/// an identity collision, up to a small bound. Any other outcome, success or
/// failure, is returned as-is.
pub fn insert_with_retry<T>(
    mut insert: impl FnMut(String) -> Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    let mut outcome = insert(generate());
    for _ in 1..INSERT_ATTEMPTS {
        match outcome {
            Err(RepositoryError::Conflict) => outcome = insert(generate()),
            other => return other,
        }
    }
    outcome
}
