//! The cross-view selection.
//!
//! [`SelectionSynchronizer`] owns the one selected stable id shared by both
//! views and is the only code that writes it. Every change re-styles all
//! elements of both surfaces and, when needed, moves the pattern view to the
//! layer of the new selection. Views and the camera only read the id.

use tracing::{debug, info};

use crate::segment::Layer;
use crate::view::{HighlightSurface, LayeredSurface};

/// The selected stable id, or `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected_id: Option<String>,
}

impl SelectionState {
    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_id.as_deref() == Some(id)
    }
}

/// Effects of a selection change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub selected: Option<String>,
    /// Layer the pattern view was switched to, if it had to move.
    pub layer_switched_to: Option<Layer>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSynchronizer {
    state: SelectionState,
}

impl SelectionSynchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.state.selected_id()
    }

    /// Sets the selection to `id` and applies the side effects to both views.
    ///
    /// Returns `None` without touching either view when `id` is already
    /// selected.
    pub fn select(
        &mut self,
        id: Option<&str>,
        stage: &mut dyn HighlightSurface,
        pattern: &mut dyn LayeredSurface,
    ) -> Option<SelectionChange> {
        if self.state.selected_id.as_deref() == id {
            return None;
        }
        self.state.selected_id = id.map(str::to_string);
        info!(selected = ?id, "selection changed");

        let layer_switched_to = id
            .and_then(|id| pattern.layer_of(id))
            .filter(|&layer| layer != pattern.active_layer());
        if let Some(layer) = layer_switched_to {
            debug!(%layer, "following selection to layer");
            pattern.set_active_layer(layer);
        }

        self.refresh(stage, pattern);
        Some(SelectionChange {
            selected: self.state.selected_id.clone(),
            layer_switched_to,
        })
    }

    /// Re-applies the highlight of the current selection, e.g. after the
    /// views were rebuilt.
    pub fn refresh(&self, stage: &mut dyn HighlightSurface, pattern: &mut dyn LayeredSurface) {
        let selected = self.state.selected_id();
        stage.apply_highlight(selected);
        pattern.apply_highlight(selected);
    }

    /// Re-applies the highlight after both views were rebuilt from a new
    /// asset. `previous_layer` is the layer the selected segment had before
    /// the swap; when the swap moved it to another layer the pattern view
    /// follows. Returns the layer switched to, if any.
    pub fn resync(
        &self,
        previous_layer: Option<Layer>,
        stage: &mut dyn HighlightSurface,
        pattern: &mut dyn LayeredSurface,
    ) -> Option<Layer> {
        let moved_to = self
            .selected_id()
            .and_then(|id| pattern.layer_of(id))
            .filter(|&layer| Some(layer) != previous_layer && layer != pattern.active_layer());
        if let Some(layer) = moved_to {
            debug!(%layer, "selected segment changed layer");
            pattern.set_active_layer(layer);
        }
        self.refresh(stage, pattern);
        moved_to
    }
}
