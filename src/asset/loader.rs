use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Load lifecycle reported to collaborators.
///
/// `Success`, `Error` and `Empty` are terminal; none of them retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
    /// Parsing succeeded but no triangle carried UV data.
    Empty,
}

impl LoadStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Empty)
    }
}

/// Where the current asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Url(String),
    /// No asset provided; the procedural fallback anchors are used.
    Fallback,
}

impl AssetSource {
    #[must_use]
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            Some(u) if !u.trim().is_empty() => Self::Url(u.to_string()),
            _ => Self::Fallback,
        }
    }

    /// Lowercased file extension of the URL path, ignoring any query or
    /// fragment.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let Self::Url(url) = self else {
            return None;
        };
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (stem, ext) = file.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

/// Handle for one load attempt. Only the most recently issued ticket may
/// commit its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    source: AssetSource,
}

impl LoadTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn source(&self) -> &AssetSource {
        &self.source
    }
}

/// Tracks in-flight loads with a generation counter so that a superseded
/// load's late completion cannot overwrite newer state.
#[derive(Debug, Default)]
pub struct AssetLoader {
    generation: u64,
    in_flight: Option<u64>,
    status: LoadStatus,
}

impl AssetLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.status
    }

    /// Returns `true` while a load is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a new load, superseding any load still in flight.
    pub fn begin(&mut self, source: AssetSource) -> LoadTicket {
        self.generation += 1;
        if let Some(prev) = self.in_flight.replace(self.generation) {
            debug!(superseded = prev, generation = self.generation, "load superseded");
        }
        self.status = LoadStatus::Loading;
        info!(generation = self.generation, ?source, "asset load started");
        LoadTicket {
            generation: self.generation,
            source,
        }
    }

    /// Returns `true` if `ticket` belongs to the load currently in flight.
    #[must_use]
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.in_flight == Some(ticket.generation)
    }

    /// Records the terminal status of `ticket`'s load.
    ///
    /// Returns `false` and leaves state untouched when the ticket is stale.
    pub fn finish(&mut self, ticket: &LoadTicket, status: LoadStatus) -> bool {
        if !self.is_current(ticket) {
            warn!(
                generation = ticket.generation,
                current = ?self.in_flight,
                "discarding stale load result"
            );
            return false;
        }
        debug_assert!(status.is_terminal());
        self.in_flight = None;
        self.status = status;
        info!(generation = ticket.generation, ?status, "asset load finished");
        true
    }
}
