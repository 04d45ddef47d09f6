use std::fmt;

use tzf_rs::DefaultFinder;

use crate::{error::Result, model::Coordinates};

use super::TimezoneIndex;

/// Timezone polygons bundled with `tzf-rs`; no network access.
pub struct TzfIndex {
    finder: DefaultFinder,
}

impl TzfIndex {
    /// Loads the bundled index. Build once and share.
    pub fn new() -> Self {
        Self { finder: DefaultFinder::new() }
    }
}

impl Default for TzfIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TzfIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TzfIndex").finish_non_exhaustive()
    }
}

impl TimezoneIndex for TzfIndex {
    fn zone_at(&self, coordinates: Coordinates) -> Result<Option<String>> {
        if !coordinates.is_valid() {
            return Ok(None);
        }

        let name = self.finder.get_tz_name(coordinates.longitude, coordinates.latitude);
        Ok((!name.is_empty()).then(|| name.to_string()))
    }
}
