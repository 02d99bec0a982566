//! Generation id allocation

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{AppError, Result};

/// Last millisecond of the year 9999; no clock-derived id can be larger
pub const MAX_GENERATION_ID: i64 = 253_402_300_799_999;

/// Hands out timestamp-derived generation ids.
///
/// Ids are milliseconds since the Unix epoch, bumped past the previous id
/// when two requests land in the same millisecond, so they are unique and
/// strictly increasing for the lifetime of the process.
#[derive(Debug, Default)]
pub struct GenerationIds {
    last: AtomicI64,
}

impl GenerationIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never hand out `id` or anything below it, e.g. the newest id on disk.
    ///
    /// Ids above [`MAX_GENERATION_ID`] are ignored and reported as `false`.
    pub fn advance_past(&self, id: i64) -> bool {
        if id > MAX_GENERATION_ID {
            return false;
        }
        self.last.fetch_max(id, Ordering::SeqCst);
        true
    }

    pub fn next(&self) -> Result<i64> {
        let now = chrono::Utc::now().timestamp_millis();
        let bump = |last: i64| last.checked_add(1).map(|after| now.max(after));

        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, bump)
            .ok()
            .and_then(bump)
            .ok_or_else(|| AppError::Internal("generation id space exhausted".to_string()))
    }
}
