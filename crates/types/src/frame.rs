//! Telemetry frame model: frames, groups and datasets
//!
//! A frame is one ingested snapshot of grouped telemetry, as produced by the
//! upstream frame-parsing layer. The engine keeps two live copies (the raw
//! frame as received and a processed frame that may carry synthetic groups),
//! so everything here is plain cloneable data.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::widget::{self, WidgetKind};

/// One ingested snapshot of grouped telemetry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Display title of the dashboard this frame describes.
    #[serde(default)]
    pub title: String,
    /// Ordered groups of datasets.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Actions declared by the frame (transmit buttons, periodic commands).
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Frame {
    /// A frame is processable when it carries at least one group.
    pub fn is_valid(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Structural equality: same group/dataset shape (kinds, counts,
    /// identities), ignoring values and display titles.
    ///
    /// This is what decides whether an incoming frame can be applied as a
    /// value-only update or must trigger a full reconfiguration.
    pub fn equals_structure(&self, other: &Frame) -> bool {
        self.groups.len() == other.groups.len()
            && self
                .groups
                .iter()
                .zip(&other.groups)
                .all(|(a, b)| a.equals_structure(b))
    }

    /// Whether the frame uses features reserved for licensed builds
    /// (3D plot groups, dataset-specific X-axis sources).
    pub fn contains_licensed_features(&self) -> bool {
        self.groups.iter().any(|g| {
            widget::group_widget(g) == Some(WidgetKind::Plot3D)
                || g.datasets.iter().any(|d| d.x_source.is_some())
        })
    }

    /// Find a dataset anywhere in the frame by its identity.
    pub fn find_dataset(&self, unique_id: u32) -> Option<&Dataset> {
        self.groups
            .iter()
            .flat_map(|g| g.datasets.iter())
            .find(|d| d.unique_id == unique_id)
    }
}

/// A named collection of datasets with an optional group-level widget hint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    /// Identifier of the group within its frame.
    #[serde(default)]
    pub group_id: u32,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Raw widget-kind hint (e.g. "plot3d", "gps"); empty means none.
    #[serde(default)]
    pub widget: String,
    /// Ordered member datasets.
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl Group {
    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    /// Shape comparison for structural equality (see [`Frame::equals_structure`]).
    pub fn equals_structure(&self, other: &Group) -> bool {
        self.group_id == other.group_id
            && self.widget == other.widget
            && self.datasets.len() == other.datasets.len()
            && self
                .datasets
                .iter()
                .zip(&other.datasets)
                .all(|(a, b)| a.equals_structure(b))
    }
}

/// A single identified value stream within a group.
///
/// Values travel as text (the wire format does not distinguish numeric from
/// textual channels); numeric consumers go through [`Dataset::numeric_value`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Stable identity, distinct from the dataset's position in the frame.
    /// One namespace serves the registry, the fan-out index and
    /// [`Dataset::x_source`] cross-references.
    pub unique_id: u32,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Latest value as received.
    #[serde(default)]
    pub value: String,
    /// Unit string, display only.
    #[serde(default)]
    pub units: String,
    /// Raw widget-kind hint; also carries field tags such as "lat" or "x".
    #[serde(default)]
    pub widget: String,
    /// Running minimum bound.
    #[serde(default)]
    pub min: f64,
    /// Running maximum bound.
    #[serde(default)]
    pub max: f64,
    /// Whether the dataset feeds a 2D plot.
    #[serde(default)]
    pub graph: bool,
    /// Whether the dataset feeds an FFT widget.
    #[serde(default)]
    pub fft: bool,
    /// Per-widget FFT window size; independent of the global point count.
    #[serde(default)]
    pub fft_samples: usize,
    /// Identity of another dataset acting as this one's X-axis source.
    #[serde(default)]
    pub x_source: Option<u32>,
}

impl Dataset {
    /// Numeric view of the current value; unparsable text reads as zero.
    pub fn numeric_value(&self) -> f64 {
        self.value.trim().parse().unwrap_or(0.0)
    }

    pub fn set_value(&mut self, value: &str) {
        if self.value != value {
            self.value.clear();
            self.value.push_str(value);
        }
    }

    /// Shape comparison for structural equality (see [`Frame::equals_structure`]).
    pub fn equals_structure(&self, other: &Dataset) -> bool {
        self.unique_id == other.unique_id
            && self.widget == other.widget
            && self.graph == other.graph
            && self.fft == other.fft
            && self.fft_samples == other.fft_samples
            && self.x_source == other.x_source
    }
}
