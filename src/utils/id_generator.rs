//! Run and session identifier generation.
//!
//! Canvas sessions and cascade runs need ids that are unique, sortable by
//! eye, and safe to embed in log lines and file names. Generated ids follow
//! predictable formats for parseability:
//!
//! - Session IDs: `session-{uuid}`
//! - Run IDs: `run-{uuid-prefix}-{suffix}`
//!
//! The run id keeps a short random suffix on top of the UUID prefix so that
//! truncated display forms (first segment only) still rarely collide.

use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

/// Length of the random alphanumeric suffix on run ids.
const RUN_SUFFIX_LEN: usize = 6;

/// Number of UUID hex characters kept in the run id prefix.
const RUN_UUID_PREFIX_LEN: usize = 12;

/// Generator for session and run identifiers.
///
/// # Examples
///
/// ```rust
/// use canvasflow::utils::id_generator::IdGenerator;
///
/// let ids = IdGenerator::new();
/// let run_id = ids.generate_run_id();
/// assert!(run_id.starts_with("run-"));
///
/// let session_id = ids.generate_session_id();
/// assert!(session_id.starts_with("session-"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generate an id for a single cascade run.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(RUN_SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!(
            "run-{}-{}",
            &uuid[..RUN_UUID_PREFIX_LEN],
            suffix.to_lowercase()
        )
    }

    /// Generate an id for a canvas session.
    #[must_use]
    pub fn generate_session_id(&self) -> String {
        format!("session-{}", Uuid::new_v4())
    }
}
