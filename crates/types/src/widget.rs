//! Widget kinds and hint resolution
//!
//! The wire format tags groups and datasets with free-form hint strings;
//! everything downstream works on the closed [`WidgetKind`] enum. Hints
//! resolve through static dispatch tables, so unknown hints simply resolve
//! to nothing and the group/dataset is dropped from the dashboard.

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::frame::{Dataset, Group};

/// The enumerated display type a group or dataset is rendered as.
///
/// Group widgets occupy a whole group; dataset widgets are created once per
/// dataset. Variant order is the declaration order used when building the
/// dense widget index map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    // Group widgets
    DataGrid,
    MultiPlot,
    Accelerometer,
    Gyroscope,
    Gps,
    Plot3D,
    LedPanel,
    Terminal,
    // Dataset widgets
    Plot,
    Bar,
    Gauge,
    Compass,
    Fft,
    Led,
}

impl WidgetKind {
    /// Whether this kind occupies a whole group.
    pub fn is_group_widget(self) -> bool {
        matches!(
            self,
            WidgetKind::DataGrid
                | WidgetKind::MultiPlot
                | WidgetKind::Accelerometer
                | WidgetKind::Gyroscope
                | WidgetKind::Gps
                | WidgetKind::Plot3D
                | WidgetKind::LedPanel
                | WidgetKind::Terminal
        )
    }

    /// Whether this kind is instantiated once per dataset.
    pub fn is_dataset_widget(self) -> bool {
        !self.is_group_widget()
    }
}

/// Raw group hint → group widget kind.
static GROUP_HINTS: Lazy<HashMap<&'static str, WidgetKind>> = Lazy::new(|| {
    HashMap::from([
        ("datagrid", WidgetKind::DataGrid),
        ("multiplot", WidgetKind::MultiPlot),
        ("accelerometer", WidgetKind::Accelerometer),
        ("gyro", WidgetKind::Gyroscope),
        ("gyroscope", WidgetKind::Gyroscope),
        ("gps", WidgetKind::Gps),
        ("map", WidgetKind::Gps),
        ("plot3d", WidgetKind::Plot3D),
        ("led-panel", WidgetKind::LedPanel),
        ("terminal", WidgetKind::Terminal),
    ])
});

/// Raw dataset hint → dataset widget kind.
///
/// Field tags such as "lat" or "x" are intentionally absent: they mark a
/// dataset's role inside a group widget, not a widget of its own.
static DATASET_HINTS: Lazy<HashMap<&'static str, WidgetKind>> = Lazy::new(|| {
    HashMap::from([
        ("bar", WidgetKind::Bar),
        ("gauge", WidgetKind::Gauge),
        ("compass", WidgetKind::Compass),
        ("led", WidgetKind::Led),
    ])
});

/// Resolve a group's widget-kind hint; `None` means no group-level widget.
pub fn group_widget(group: &Group) -> Option<WidgetKind> {
    let hint = group.widget.trim();
    if hint.is_empty() {
        return None;
    }
    let kind = GROUP_HINTS.get(hint.to_ascii_lowercase().as_str()).copied();
    if kind.is_none() {
        debug!("unknown group widget hint '{hint}', group '{}' dropped", group.title);
    }
    kind
}

/// Resolve every dataset-level widget kind a dataset feeds.
///
/// A dataset can simultaneously feed several widgets: its hint may name one
/// (bar, gauge, compass, LED), its `graph` flag adds a plot and its `fft`
/// flag adds an FFT.
pub fn dataset_widgets(dataset: &Dataset) -> Vec<WidgetKind> {
    let mut kinds = Vec::new();
    let hint = dataset.widget.trim();
    if !hint.is_empty() {
        if let Some(kind) = DATASET_HINTS.get(hint.to_ascii_lowercase().as_str()) {
            kinds.push(*kind);
        }
    }
    if dataset.graph {
        kinds.push(WidgetKind::Plot);
    }
    if dataset.fft {
        kinds.push(WidgetKind::Fft);
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_hint_resolution() {
        let mut group = Group {
            widget: "plot3d".to_string(),
            ..Group::default()
        };
        assert_eq!(group_widget(&group), Some(WidgetKind::Plot3D));

        group.widget = "GPS".to_string();
        assert_eq!(group_widget(&group), Some(WidgetKind::Gps));

        group.widget = "map".to_string();
        assert_eq!(group_widget(&group), Some(WidgetKind::Gps));

        group.widget = "something-new".to_string();
        assert_eq!(group_widget(&group), None);

        group.widget = String::new();
        assert_eq!(group_widget(&group), None);
    }

    #[test]
    fn test_dataset_hints_compose_with_flags() {
        let ds = Dataset {
            widget: "gauge".to_string(),
            graph: true,
            fft: true,
            ..Dataset::default()
        };
        let kinds = dataset_widgets(&ds);
        assert_eq!(kinds, vec![WidgetKind::Gauge, WidgetKind::Plot, WidgetKind::Fft]);
    }

    #[test]
    fn test_field_tags_are_not_widgets() {
        for tag in ["lat", "lon", "alt", "x", "y", "z"] {
            let ds = Dataset {
                widget: tag.to_string(),
                ..Dataset::default()
            };
            assert!(dataset_widgets(&ds).is_empty(), "tag {tag} resolved to a widget");
        }
    }

    #[test]
    fn test_group_dataset_widget_split() {
        assert!(WidgetKind::Gps.is_group_widget());
        assert!(WidgetKind::Terminal.is_group_widget());
        assert!(WidgetKind::Plot.is_dataset_widget());
        assert!(WidgetKind::Led.is_dataset_widget());
    }
}
