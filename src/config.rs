use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters controlling extraction, classification, view behavior and
/// persistence.
///
/// Every field has a default; a JSON document may override any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decimal places used to merge UV vertices into islands.
    pub uv_merge_decimals: u32,
    /// Decimal places used to match contour edges. Coarser than
    /// `uv_merge_decimals` so near-duplicate seam vertices close into one line.
    pub edge_merge_decimals: u32,
    /// Growth applied to the shell box before the containment test.
    pub containment_epsilon: f64,
    /// Maximum triangles sampled per segment by the radial heuristic.
    pub radial_sample_limit: usize,
    /// Quiet period before a 2D viewport re-fit runs.
    #[serde(with = "millis")]
    pub fit_debounce: Duration,
    /// Storage key of the persisted hotspot document.
    pub hotspot_storage_key: String,
    /// Generic category ids that never become a decal target.
    pub decal_target_exclusions: Vec<String>,
    /// Highlight styling shared by both views.
    pub highlight: HighlightConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uv_merge_decimals: 4,
            edge_merge_decimals: 1,
            containment_epsilon: 1e-3,
            radial_sample_limit: 600,
            fit_debounce: Duration::from_millis(100),
            hotspot_storage_key: "meshsync.hotspots".into(),
            decal_target_exclusions: ["body", "handle", "clasp", "shell", "default", "all"]
                .into_iter()
                .map(String::from)
                .collect(),
            highlight: HighlightConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration document. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns `true` if `id` names a generic category rather than a part.
    #[must_use]
    pub fn is_excluded_target(&self, id: &str) -> bool {
        self.decal_target_exclusions.iter().any(|e| e == id)
    }
}

/// Styling of the selected element in both views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// RGB outline color of the selected element in the pattern view.
    pub outline_color: [f32; 3],
    /// Fill opacity of the selected element in the pattern view.
    pub fill_opacity: f32,
    /// RGB emissive color of the selected segment on the stage.
    pub emissive_color: [f32; 3],
    /// Peak emissive intensity of the pulse.
    pub emissive_intensity: f32,
    /// Duration of one pulse cycle.
    #[serde(with = "millis")]
    pub pulse_period: Duration,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            outline_color: [0.0, 0.6, 1.0],
            fill_opacity: 0.15,
            emissive_color: [0.0, 0.45, 1.0],
            emissive_intensity: 0.6,
            pulse_period: Duration::from_millis(1200),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
