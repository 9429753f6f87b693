use std::sync::mpsc;

use crate::foundation::error::{EditorError, EditorResult};
use crate::timeline::layer::{LayerModel, PropertyValue};

/// Change notification delivered to [`TimelineEngine::subscribe`] receivers.
///
/// Events carry owned snapshots; subscribers never see engine internals.
#[derive(Clone, Debug, PartialEq)]
pub enum TimelineEvent {
    /// A layer was inserted.
    Added {
        /// Snapshot of the inserted layer.
        layer: LayerModel,
    },
    /// Every layer with `id` was removed.
    Removed {
        /// Id of the removed layer.
        id: String,
    },
    /// One property of a layer changed.
    Updated {
        /// Id of the changed layer.
        id: String,
        /// Property key that changed.
        key: String,
    },
    /// The timeline was emptied.
    Cleared,
}

/// Authoritative, z-ordered collection of timeline layers.
///
/// The engine is the only owner of [`LayerModel`] values. Callers receive clones and observe
/// changes through [`TimelineEvent`]s.
#[derive(Debug, Default)]
pub struct TimelineEngine {
    layers: Vec<LayerModel>,
    subscribers: Vec<mpsc::Sender<TimelineEvent>>,
}

impl TimelineEngine {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a layer and restore z-order. Equal `z_index` values keep insertion order.
    ///
    /// Duplicate ids are accepted and logged; they indicate a caller bug.
    pub fn add_layer(&mut self, layer: LayerModel) {
        if self.layers.iter().any(|l| l.id == layer.id) {
            tracing::warn!(id = %layer.id, "duplicate layer id added to timeline");
        }
        let snapshot = layer.clone();
        self.layers.push(layer);
        self.sort();
        self.emit(TimelineEvent::Added { layer: snapshot });
    }

    /// Remove every layer with `id`. Unknown ids are a no-op.
    pub fn remove_layer(&mut self, id: &str) {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() != before {
            self.emit(TimelineEvent::Removed { id: id.to_string() });
        }
    }

    /// Clone of the first layer with `id`.
    pub fn get_layer(&self, id: &str) -> Option<LayerModel> {
        self.layers.iter().find(|l| l.id == id).cloned()
    }

    /// Layers whose range contains `t`, in ascending z-order.
    pub fn get_active_layers(&self, t: f64) -> Vec<LayerModel> {
        self.layers
            .iter()
            .filter(|l| l.time.contains(t))
            .cloned()
            .collect()
    }

    /// Remove all layers.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.emit(TimelineEvent::Cleared);
    }

    /// Update one property of the layer with `id`.
    pub fn update_property(
        &mut self,
        id: &str,
        key: &str,
        value: PropertyValue,
    ) -> EditorResult<()> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EditorError::validation(format!("unknown layer id '{id}'")))?;
        layer.set_property(key, value)?;
        if key == "z_index" {
            self.sort();
        }
        self.emit(TimelineEvent::Updated {
            id: id.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    /// All layers in z-order.
    pub fn layers(&self) -> &[LayerModel] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Timeline length: the latest layer end, or `0.0` when empty.
    pub fn duration(&self) -> f64 {
        self.layers.iter().map(|l| l.time.end).fold(0.0, f64::max)
    }

    /// Register an observer. Dropped receivers are pruned on the next event.
    pub fn subscribe(&mut self) -> mpsc::Receiver<TimelineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn sort(&mut self) {
        // `sort_by_key` is stable.
        self.layers.sort_by_key(|l| l.z_index);
    }

    fn emit(&mut self, event: TimelineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl FromIterator<LayerModel> for TimelineEngine {
    fn from_iter<I: IntoIterator<Item = LayerModel>>(iter: I) -> Self {
        let mut engine = Self::new();
        for layer in iter {
            engine.add_layer(layer);
        }
        engine
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/engine.rs"]
mod tests;
