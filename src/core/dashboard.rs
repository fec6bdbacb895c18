//! Dashboard engine: classification, reconfiguration and the frame hot path
//!
//! One `Dashboard` instance is created by the application's composition root
//! and driven by the run loop: `process_frame` once per incoming frame,
//! `refresh_tick` at a fixed rate, `poll_actions` to drive action timers.
//! The rendering surface only reads, via the accessor methods and the event
//! subscription.
//!
//! The hot path is cheap when only values changed: structural equality is
//! checked against the raw frame, values fan out through the prebuilt index
//! in O(copies), and series buffers take one push per affected sample.
//! Any structural change rebuilds the whole model in one pass.

use std::collections::{BTreeMap, HashSet};
use std::sync::mpsc::Receiver;
use std::time::Instant;

use log::warn;
use teledash_types::{widget, Dataset, Frame, Group, Point3, WidgetKind};

use super::actions::ActionController;
use super::events::{DashboardEvent, EventHub};
use super::fanout::{CopyHandle, FanoutIndex};
use super::series::{
    GpsSeries, LineSeriesView, MultiSeriesView, SeriesStore, INVALID_SAMPLE,
};
use super::transport::{BoxedLicense, BoxedTransport};

/// Default number of samples kept per series.
pub const DEFAULT_POINTS: usize = 100;
/// Default number of decimals shown by value widgets.
pub const DEFAULT_PRECISION: u32 = 2;

/// One row of the action panel model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStatus {
    pub id: usize,
    pub title: String,
    pub icon: String,
    /// True only for a ToggleOnTrigger action whose timer is running.
    pub checked: bool,
}

/// The live dashboard model.
pub struct Dashboard {
    // Settings
    points: usize,
    precision: u32,
    show_action_panel: bool,
    terminal_enabled: bool,

    // Cached license answer from the last reconfiguration
    licensed: bool,

    // Coalesced-refresh and self-heal state
    update_required: bool,
    reprocessing: bool,

    // Frame copies
    raw_frame: Frame,
    processed_frame: Frame,

    // Widget model
    widget_count: usize,
    widget_map: BTreeMap<usize, (WidgetKind, usize)>,
    widget_groups: BTreeMap<WidgetKind, Vec<Group>>,
    widget_datasets: BTreeMap<WidgetKind, Vec<Dataset>>,
    registry: BTreeMap<u32, Dataset>,
    fanout: FanoutIndex,

    // Subsystems
    series: SeriesStore,
    actions: ActionController,
    events: EventHub,

    // Collaborators
    transport: BoxedTransport,
    license: BoxedLicense,
}

impl Dashboard {
    pub fn new(transport: BoxedTransport, license: BoxedLicense) -> Self {
        Self {
            points: DEFAULT_POINTS,
            precision: DEFAULT_PRECISION,
            show_action_panel: true,
            terminal_enabled: false,
            licensed: false,
            update_required: false,
            reprocessing: false,
            raw_frame: Frame::default(),
            processed_frame: Frame::default(),
            widget_count: 0,
            widget_map: BTreeMap::new(),
            widget_groups: BTreeMap::new(),
            widget_datasets: BTreeMap::new(),
            registry: BTreeMap::new(),
            fanout: FanoutIndex::new(),
            series: SeriesStore::new(DEFAULT_POINTS),
            actions: ActionController::new(),
            events: EventHub::new(),
            transport,
            license,
        }
    }

    //--------------------------------------------------------------------
    // Status helpers
    //--------------------------------------------------------------------

    /// Whether the dashboard has anything to show: widgets exist and a
    /// stream is active.
    pub fn available(&self) -> bool {
        self.total_widget_count() > 0 && self.stream_available()
    }

    /// Whether a data stream is currently active.
    pub fn stream_available(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether the held frame is processable.
    pub fn frame_valid(&self) -> bool {
        self.processed_frame.is_valid()
    }

    /// Title of the current frame.
    pub fn title(&self) -> &str {
        &self.processed_frame.title
    }

    /// Whether the point-count selector applies to the current model.
    pub fn points_widget_visible(&self) -> bool {
        self.widget_groups.contains_key(&WidgetKind::MultiPlot)
            || self.widget_groups.contains_key(&WidgetKind::Plot3D)
            || self.widget_datasets.contains_key(&WidgetKind::Plot)
    }

    /// Whether the precision selector applies to the current model.
    pub fn precision_widget_visible(&self) -> bool {
        self.widget_groups.contains_key(&WidgetKind::Accelerometer)
            || self.widget_groups.contains_key(&WidgetKind::Gyroscope)
            || self.widget_groups.contains_key(&WidgetKind::DataGrid)
            || self.widget_datasets.contains_key(&WidgetKind::Bar)
            || self.widget_datasets.contains_key(&WidgetKind::Gauge)
            || self.widget_datasets.contains_key(&WidgetKind::Compass)
    }

    /// Whether the held raw frame uses licensed-only features.
    pub fn contains_licensed_features(&self) -> bool {
        self.raw_frame.contains_licensed_features()
    }

    //--------------------------------------------------------------------
    // Settings
    //--------------------------------------------------------------------

    pub fn points(&self) -> usize {
        self.points
    }

    /// Change the per-series sample count. Reallocates every series sized by
    /// the global point count (plots, multiplots, GPS) and re-trims 3D
    /// trajectories; FFT buffers keep their own sample counts.
    pub fn set_points(&mut self, points: usize) {
        if self.points != points {
            self.points = points;
            self.series.set_points(points);
            self.reallocate_global_series();
            self.events.emit(DashboardEvent::PointsChanged);
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Display-only decimal precision; no buffer impact.
    pub fn set_precision(&mut self, precision: u32) {
        if self.precision != precision {
            self.precision = precision;
            self.events.emit(DashboardEvent::PrecisionChanged);
        }
    }

    pub fn show_action_panel(&self) -> bool {
        self.show_action_panel
    }

    pub fn set_show_action_panel(&mut self, enabled: bool) {
        if self.show_action_panel != enabled {
            self.show_action_panel = enabled;
            self.events.emit(DashboardEvent::ShowActionPanelChanged);
        }
    }

    pub fn terminal_enabled(&self) -> bool {
        self.terminal_enabled
    }

    /// Enable or disable the synthetic terminal widget. Forces a full reset
    /// and reclassification of the held frame.
    pub fn set_terminal_enabled(&mut self, enabled: bool) {
        if self.terminal_enabled != enabled {
            self.terminal_enabled = enabled;
            let frame = self.raw_frame.clone();
            self.reset_data(false);
            if frame.is_valid() {
                self.process_frame(&frame);
            }
        }
        self.events.emit(DashboardEvent::TerminalEnabledChanged);
    }

    //--------------------------------------------------------------------
    // Widget model access
    //--------------------------------------------------------------------

    pub fn total_widget_count(&self) -> usize {
        self.widget_count
    }

    /// Number of widgets of one kind.
    pub fn widget_count_of(&self, kind: WidgetKind) -> usize {
        if kind.is_group_widget() {
            self.widget_groups.get(&kind).map(|v| v.len()).unwrap_or(0)
        } else {
            self.widget_datasets.get(&kind).map(|v| v.len()).unwrap_or(0)
        }
    }

    /// Widget kind at a global window index.
    pub fn widget_type(&self, index: usize) -> Option<WidgetKind> {
        self.widget_map.get(&index).map(|(kind, _)| *kind)
    }

    /// Index of a widget within its kind, given its global window index.
    pub fn relative_index(&self, index: usize) -> Option<usize> {
        self.widget_map.get(&index).map(|(_, relative)| *relative)
    }

    /// The full window-index → (kind, relative-index) map.
    pub fn widget_map(&self) -> &BTreeMap<usize, (WidgetKind, usize)> {
        &self.widget_map
    }

    /// Canonical dataset registry, keyed by identity.
    pub fn datasets(&self) -> &BTreeMap<u32, Dataset> {
        &self.registry
    }

    pub fn dataset(&self, unique_id: u32) -> Option<&Dataset> {
        self.registry.get(&unique_id)
    }

    /// Group behind a group widget. Out-of-range indices are a programmer
    /// error: fatal in debug builds, `None` in release.
    pub fn group_widget(&self, kind: WidgetKind, index: usize) -> Option<&Group> {
        let list = self.widget_groups.get(&kind);
        debug_assert!(
            list.map(|l| index < l.len()).unwrap_or(false),
            "group widget index out of range: {kind:?}[{index}]"
        );
        list.and_then(|l| l.get(index))
    }

    /// Dataset behind a dataset widget; same contract as [`Self::group_widget`].
    pub fn dataset_widget(&self, kind: WidgetKind, index: usize) -> Option<&Dataset> {
        let list = self.widget_datasets.get(&kind);
        debug_assert!(
            list.map(|l| index < l.len()).unwrap_or(false),
            "dataset widget index out of range: {kind:?}[{index}]"
        );
        list.and_then(|l| l.get(index))
    }

    /// Last unmodified frame, as received.
    pub fn raw_frame(&self) -> &Frame {
        &self.raw_frame
    }

    /// Processed frame; may carry synthetic groups (terminal, LED panels are
    /// registered separately).
    pub fn processed_frame(&self) -> &Frame {
        &self.processed_frame
    }

    //--------------------------------------------------------------------
    // Series access
    //--------------------------------------------------------------------

    pub fn plot_data(&self, index: usize) -> Option<LineSeriesView<'_>> {
        self.series.plot_view(index)
    }

    pub fn multiplot_data(&self, index: usize) -> Option<MultiSeriesView<'_>> {
        self.series.multiplot_view(index)
    }

    pub fn fft_data(&self, index: usize) -> Option<&teledash_types::RingBuffer<f64>> {
        self.series.fft_data(index)
    }

    pub fn gps_series(&self, index: usize) -> Option<&GpsSeries> {
        self.series.gps_series(index)
    }

    pub fn plot_data_3d(&self, index: usize) -> Option<&[Point3]> {
        self.series.plot_data_3d(index)
    }

    //--------------------------------------------------------------------
    // Actions
    //--------------------------------------------------------------------

    pub fn action_count(&self) -> usize {
        self.actions.count()
    }

    /// Action panel model: one row per action with its toggle state.
    pub fn actions(&self) -> Vec<ActionStatus> {
        (0..self.actions.count())
            .filter_map(|id| {
                self.actions.get(id).map(|action| ActionStatus {
                    id,
                    title: action.title.clone(),
                    icon: action.icon.clone(),
                    checked: self.actions.is_checked(id),
                })
            })
            .collect()
    }

    /// Trigger an action: apply its timer transition and transmit its
    /// payload through the sink unless transmission is paused.
    ///
    /// `user_triggered` distinguishes explicit UI triggers from the timer's
    /// own ticks; only the former toggle a ToggleOnTrigger timer.
    pub fn activate_action(&mut self, index: usize, user_triggered: bool) {
        if index >= self.actions.count() {
            debug_assert!(false, "action index out of range: {index}");
            return;
        }

        self.actions.apply_trigger(index, user_triggered);

        if let Some(action) = self.actions.get(index) {
            if !self.transport.is_paused() {
                let payload = action.tx_bytes();
                if let Err(err) = self.transport.send(&payload) {
                    warn!("failed to transmit action '{}': {err}", action.title);
                }
            }
        }

        self.events.emit(DashboardEvent::ActionStatusChanged);
    }

    /// Drive action timers; fires every action whose timer came due.
    pub fn poll_actions(&mut self, now: Instant) {
        for index in self.actions.poll(now) {
            self.activate_action(index, false);
        }
    }

    //--------------------------------------------------------------------
    // Notifications
    //--------------------------------------------------------------------

    /// Subscribe to engine notifications.
    pub fn subscribe(&mut self) -> Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Fixed-rate refresh tick. Emits at most one `Updated` per call, and
    /// only when new data arrived since the previous tick.
    pub fn refresh_tick(&mut self) {
        if self.update_required {
            self.update_required = false;
            self.events.emit(DashboardEvent::Updated);
        }
    }

    //--------------------------------------------------------------------
    // Frame ingestion
    //--------------------------------------------------------------------

    /// Process one incoming frame. Called once per frame, in arrival order.
    pub fn process_frame(&mut self, frame: &Frame) {
        if !frame.is_valid() || !self.stream_available() {
            return;
        }

        if !frame.equals_structure(&self.raw_frame) {
            let had_licensed = self.raw_frame.contains_licensed_features();
            self.reconfigure(frame);
            if had_licensed != frame.contains_licensed_features() {
                self.events.emit(DashboardEvent::LicensedFeaturesChanged);
            }
        }

        if !self.apply_frame_values(frame) {
            // Fan-out miss for a known identity: the model is stale. Reset
            // and reprocess this same frame once; a second miss means the
            // frame itself is inconsistent and gets dropped.
            if self.reprocessing {
                warn!("fan-out index still stale after reset, dropping frame");
                return;
            }
            warn!("fan-out index miss, resetting dashboard model");
            self.reprocessing = true;
            self.reset_data(false);
            self.process_frame(frame);
            self.reprocessing = false;
            return;
        }

        self.update_series();
        self.update_required = true;
    }

    /// Clear the whole model, frames and actions.
    pub fn reset_data(&mut self, notify: bool) {
        self.clear_model();
        self.raw_frame = Frame::default();
        self.processed_frame = Frame::default();
        self.actions.clear();

        if notify {
            self.update_required = true;
            self.events.emit(DashboardEvent::Updated);
            self.events.emit(DashboardEvent::DataReset);
            self.events.emit(DashboardEvent::WidgetCountChanged);
            self.events.emit(DashboardEvent::LicensedFeaturesChanged);
        }
    }

    /// React to a transport connection transition (connect, disconnect,
    /// source change). Everything is rebuilt from the next frame.
    pub fn handle_connection_change(&mut self) {
        self.reset_data(true);
    }

    fn clear_model(&mut self) {
        self.series.clear();
        self.widget_count = 0;
        self.widget_map.clear();
        self.widget_groups.clear();
        self.widget_datasets.clear();
        self.registry.clear();
        self.fanout.clear();
    }

    //--------------------------------------------------------------------
    // Reconfiguration
    //--------------------------------------------------------------------

    /// Rebuild the complete widget model from a structurally new frame.
    fn reconfigure(&mut self, frame: &Frame) {
        // One license read per rebuild; the cached value is also what the
        // hot path consults until the next reconfiguration.
        let licensed = self.license.is_licensed();
        self.licensed = licensed;

        self.clear_model();
        self.raw_frame = frame.clone();
        self.processed_frame = frame.clone();

        // The terminal widget has no counterpart in the raw frame, which is
        // why structural equality is always evaluated against the raw copy.
        if self.terminal_enabled {
            self.processed_frame.groups.push(Group {
                group_id: self.processed_frame.groups.len() as u32,
                title: "Console".to_string(),
                widget: "terminal".to_string(),
                datasets: Vec::new(),
            });
        }

        let groups: Vec<Group> = self.processed_frame.groups.clone();
        for group in &groups {
            self.classify_group(group, licensed);
        }

        // Dense widget index map: group kinds first, then dataset kinds,
        // both in declaration order.
        for (kind, list) in &self.widget_groups {
            for relative in 0..list.len() {
                self.widget_map.insert(self.widget_count, (*kind, relative));
                self.widget_count += 1;
            }
        }
        for (kind, list) in &self.widget_datasets {
            for relative in 0..list.len() {
                self.widget_map.insert(self.widget_count, (*kind, relative));
                self.widget_count += 1;
            }
        }

        self.rebuild_fanout();
        self.allocate_series();
        self.actions
            .configure(&frame.actions, self.transport.is_connected());

        self.events.emit(DashboardEvent::WidgetCountChanged);
        self.events.emit(DashboardEvent::ActionStatusChanged);
    }

    /// Classify one group and its datasets into the widget collections.
    fn classify_group(&mut self, group: &Group, licensed: bool) {
        match widget::group_widget(group) {
            // Unlicensed 3D plots are redirected to a multiplot fallback;
            // the processed frame record follows so the redirect is stable.
            Some(WidgetKind::Plot3D) if !licensed => {
                let mut fallback = group.clone();
                fallback.title = format!("{} (Fallback)", group.title);
                fallback.widget = "multiplot".to_string();
                if let Some(record) = self
                    .processed_frame
                    .groups
                    .iter_mut()
                    .find(|g| g.group_id == group.group_id)
                {
                    record.title = fallback.title.clone();
                    record.widget = fallback.widget.clone();
                }
                self.widget_groups
                    .entry(WidgetKind::MultiPlot)
                    .or_default()
                    .push(fallback);
            }
            Some(kind) => {
                self.widget_groups.entry(kind).or_default().push(group.clone());

                // Motion sensor groups also feed a multiplot, and a 3D plot
                // when licensed.
                if kind == WidgetKind::Accelerometer {
                    self.widget_groups
                        .entry(WidgetKind::MultiPlot)
                        .or_default()
                        .push(group.clone());
                    if licensed {
                        self.widget_groups
                            .entry(WidgetKind::Plot3D)
                            .or_default()
                            .push(group.clone());
                    }
                }
                if kind == WidgetKind::Gyroscope {
                    self.widget_groups
                        .entry(WidgetKind::MultiPlot)
                        .or_default()
                        .push(group.clone());
                }
            }
            None => {}
        }

        // Datasets: upsert the registry, register widgets, and collect LED
        // datasets into a synthetic per-group panel.
        let mut led_panel = Group {
            group_id: group.group_id,
            title: format!("LED Panel ({})", group.title),
            widget: "led-panel".to_string(),
            datasets: Vec::new(),
        };

        for dataset in &group.datasets {
            match self.registry.get_mut(&dataset.unique_id) {
                None => {
                    self.registry.insert(dataset.unique_id, dataset.clone());
                }
                Some(existing) => {
                    let min = existing.min.min(dataset.min);
                    let max = existing.max.max(dataset.max);
                    *existing = dataset.clone();
                    existing.min = min;
                    existing.max = max;
                }
            }

            for kind in widget::dataset_widgets(dataset) {
                if kind == WidgetKind::Led {
                    led_panel.datasets.push(dataset.clone());
                } else {
                    self.widget_datasets
                        .entry(kind)
                        .or_default()
                        .push(dataset.clone());
                }
            }
        }

        if !led_panel.datasets.is_empty() {
            self.widget_groups
                .entry(WidgetKind::LedPanel)
                .or_default()
                .push(led_panel);
        }
    }

    /// Record a handle for every live dataset copy. Runs only after all
    /// collections reached their final size.
    fn rebuild_fanout(&mut self) {
        self.fanout.clear();

        for (kind, list) in &self.widget_groups {
            for (group_index, group) in list.iter().enumerate() {
                for (slot, dataset) in group.datasets.iter().enumerate() {
                    self.fanout.register(
                        dataset.unique_id,
                        CopyHandle::GroupDataset {
                            kind: *kind,
                            group: group_index,
                            slot,
                        },
                    );
                }
            }
        }

        for (kind, list) in &self.widget_datasets {
            for (slot, dataset) in list.iter().enumerate() {
                self.fanout.register(
                    dataset.unique_id,
                    CopyHandle::WidgetDataset { kind: *kind, slot },
                );
            }
        }

        for &unique_id in self.registry.keys() {
            self.fanout.register(unique_id, CopyHandle::Registry);
        }
    }

    /// Allocate every series family from the current widget counts.
    fn allocate_series(&mut self) {
        let gps_count = self.widget_count_of(WidgetKind::Gps);
        let plot3d_count = self.widget_count_of(WidgetKind::Plot3D);

        let plots = self
            .widget_datasets
            .get(&WidgetKind::Plot)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        self.series
            .configure_plots(plots, &self.registry, self.licensed);

        let multiplots = self
            .widget_groups
            .get(&WidgetKind::MultiPlot)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        self.series.configure_multiplots(multiplots);

        let ffts = self
            .widget_datasets
            .get(&WidgetKind::Fft)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        self.series.configure_ffts(ffts);

        self.series.configure_gps(gps_count);
        self.series.configure_plots_3d(plot3d_count);
    }

    /// Reallocate the families sized by the global point count.
    fn reallocate_global_series(&mut self) {
        let gps_count = self.widget_count_of(WidgetKind::Gps);

        let plots = self
            .widget_datasets
            .get(&WidgetKind::Plot)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        self.series
            .configure_plots(plots, &self.registry, self.licensed);

        let multiplots = self
            .widget_groups
            .get(&WidgetKind::MultiPlot)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        self.series.configure_multiplots(multiplots);

        self.series.configure_gps(gps_count);
        self.series.trim_plots_3d();
    }

    //--------------------------------------------------------------------
    // Hot path
    //--------------------------------------------------------------------

    /// Fan the frame's values out to every live copy. Returns false on a
    /// fan-out miss (stale model).
    fn apply_frame_values(&mut self, frame: &Frame) -> bool {
        for group in &frame.groups {
            for dataset in &group.datasets {
                let Some(handles) = self.fanout.copies(dataset.unique_id) else {
                    return false;
                };
                for &handle in handles {
                    apply_to_copy(
                        handle,
                        dataset.unique_id,
                        &dataset.value,
                        &mut self.widget_groups,
                        &mut self.widget_datasets,
                        &mut self.registry,
                    );
                }
            }
        }
        true
    }

    /// Push the new samples into every affected series buffer.
    fn update_series(&mut self) {
        // Reallocate lazily if a widget count drifted from its buffers.
        let gps_count = self.widget_count_of(WidgetKind::Gps);
        let fft_count = self.widget_count_of(WidgetKind::Fft);
        let plot_count = self.widget_count_of(WidgetKind::Plot);
        let multi_count = self.widget_count_of(WidgetKind::MultiPlot);
        let plot3d_count = self.widget_count_of(WidgetKind::Plot3D);

        if self.series.gps_count() != gps_count {
            self.series.configure_gps(gps_count);
        }
        if self.series.fft_count() != fft_count {
            let ffts = self
                .widget_datasets
                .get(&WidgetKind::Fft)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            self.series.configure_ffts(ffts);
        }
        if self.series.plot_count() != plot_count {
            let plots = self
                .widget_datasets
                .get(&WidgetKind::Plot)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            self.series
                .configure_plots(plots, &self.registry, self.licensed);
        }
        if self.series.multiplot_count() != multi_count {
            let multiplots = self
                .widget_groups
                .get(&WidgetKind::MultiPlot)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            self.series.configure_multiplots(multiplots);
        }
        if self.series.plot3d_count() != plot3d_count {
            self.series.configure_plots_3d(plot3d_count);
        }

        // GPS: one sample per field per group per frame; missing fields
        // carry the invalid sentinel.
        if let Some(groups) = self.widget_groups.get(&WidgetKind::Gps) {
            for (index, group) in groups.iter().enumerate() {
                let mut lat = INVALID_SAMPLE;
                let mut lon = INVALID_SAMPLE;
                let mut alt = INVALID_SAMPLE;
                for dataset in &group.datasets {
                    let value = dataset.numeric_value();
                    match dataset.widget.as_str() {
                        "lat" => lat = value,
                        "lon" => lon = value,
                        "alt" => alt = value,
                        _ => {}
                    }
                }
                self.series.push_gps(index, lat, lon, alt);
            }
        }

        // FFT: one push per FFT dataset.
        if let Some(list) = self.widget_datasets.get(&WidgetKind::Fft) {
            for (index, dataset) in list.iter().enumerate() {
                self.series.push_fft(index, dataset.numeric_value());
            }
        }

        // Plots. Two independent guard sets keep each Y buffer and each
        // X-source buffer advancing at most once per frame, even when one
        // dataset serves both roles.
        let mut y_moved: HashSet<u32> = HashSet::new();
        let mut x_moved: HashSet<u32> = HashSet::new();
        let mut sample_axis_moved = false;

        if let Some(list) = self.widget_datasets.get(&WidgetKind::Plot) {
            for dataset in list {
                if y_moved.insert(dataset.unique_id) {
                    self.series
                        .push_y(dataset.unique_id, dataset.numeric_value());
                }

                match dataset.x_source {
                    Some(source) if self.licensed && self.registry.contains_key(&source) => {
                        if x_moved.insert(source) {
                            let value = self.registry[&source].numeric_value();
                            self.series.push_x(source, value);
                        }
                    }
                    _ => {
                        if !sample_axis_moved {
                            sample_axis_moved = true;
                            self.series.advance_sample_axis();
                        }
                    }
                }
            }
        }

        // Multiplots: one Y sample per member dataset; the shared X axis is
        // the sample-index axis, advanced once per frame.
        if let Some(groups) = self.widget_groups.get(&WidgetKind::MultiPlot) {
            if !groups.is_empty() && !sample_axis_moved {
                sample_axis_moved = true;
                self.series.advance_sample_axis();
            }
            for (index, group) in groups.iter().enumerate() {
                for (slot, dataset) in group.datasets.iter().enumerate() {
                    self.series
                        .push_multiplot(index, slot, dataset.numeric_value());
                }
            }
        }

        // 3D trajectories: compose a point from tagged fields.
        if let Some(groups) = self.widget_groups.get(&WidgetKind::Plot3D) {
            for (index, group) in groups.iter().enumerate() {
                let mut point = Point3::default();
                for dataset in &group.datasets {
                    let value = dataset.numeric_value();
                    match dataset.widget.to_ascii_lowercase().as_str() {
                        "x" => point.x = value,
                        "y" => point.y = value,
                        "z" => point.z = value,
                        _ => {}
                    }
                }
                self.series.push_point_3d(index, point);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn fanout_mut(&mut self) -> &mut FanoutIndex {
        &mut self.fanout
    }
}

/// Write a value into one live dataset copy.
fn apply_to_copy(
    handle: CopyHandle,
    unique_id: u32,
    value: &str,
    widget_groups: &mut BTreeMap<WidgetKind, Vec<Group>>,
    widget_datasets: &mut BTreeMap<WidgetKind, Vec<Dataset>>,
    registry: &mut BTreeMap<u32, Dataset>,
) {
    match handle {
        CopyHandle::Registry => {
            if let Some(dataset) = registry.get_mut(&unique_id) {
                dataset.set_value(value);
            }
        }
        CopyHandle::GroupDataset { kind, group, slot } => {
            if let Some(dataset) = widget_groups
                .get_mut(&kind)
                .and_then(|groups| groups.get_mut(group))
                .and_then(|group| group.datasets.get_mut(slot))
            {
                dataset.set_value(value);
            }
        }
        CopyHandle::WidgetDataset { kind, slot } => {
            if let Some(dataset) = widget_datasets
                .get_mut(&kind)
                .and_then(|list| list.get_mut(slot))
            {
                dataset.set_value(value);
            }
        }
    }
}

/// Compute a "nice" interval for dividing a value range into readable axis
/// steps (0.1/0.2/0.5/1/2/5/10 ladder), adjusted so the interval divides the
/// range evenly.
pub fn smart_interval(min: f64, max: f64, multiplier: f64) -> f64 {
    let range = (max - min).abs();
    if range == 0.0 {
        return 1.0;
    }

    let magnitude = range.log10().ceil() as i32;
    let scale = 10f64.powi(-magnitude) * 10.0;
    let normalized_range = (range * scale).ceil() / scale;
    let mut step = (normalized_range * multiplier).max(0.0001);

    if step < 1.0 {
        step = if step <= 0.1 {
            0.1
        } else if step <= 0.2 {
            0.2
        } else if step <= 0.5 {
            0.5
        } else {
            1.0
        };
    } else {
        let base = 10f64.powf(step.log10().floor());
        let normalized = step / base;
        step = if normalized <= 1.0 {
            base
        } else if normalized <= 2.0 {
            2.0 * base
        } else if normalized <= 5.0 {
            5.0 * base
        } else {
            10.0 * base
        };
    }

    if range % step != 0.0 {
        step = range / (range / step).ceil();
    }

    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{LicenseGate, TransportError, TransportSink};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use teledash_types::{Action, TimerMode};

    #[derive(Default)]
    struct MockState {
        connected: bool,
        paused: bool,
        sent: Vec<Vec<u8>>,
    }

    struct MockTransport(Rc<RefCell<MockState>>);

    impl TransportSink for MockTransport {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            let mut state = self.0.borrow_mut();
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            state.sent.push(bytes.to_vec());
            Ok(())
        }

        fn is_paused(&self) -> bool {
            self.0.borrow().paused
        }

        fn is_connected(&self) -> bool {
            self.0.borrow().connected
        }
    }

    struct StaticLicense(bool);

    impl LicenseGate for StaticLicense {
        fn is_licensed(&self) -> bool {
            self.0
        }
    }

    fn dashboard(licensed: bool) -> (Dashboard, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState {
            connected: true,
            ..MockState::default()
        }));
        let dash = Dashboard::new(
            Box::new(MockTransport(Rc::clone(&state))),
            Box::new(StaticLicense(licensed)),
        );
        (dash, state)
    }

    fn dataset(id: u32, widget: &str, value: f64) -> Dataset {
        Dataset {
            unique_id: id,
            title: format!("Channel {id}"),
            value: value.to_string(),
            widget: widget.to_string(),
            ..Dataset::default()
        }
    }

    fn plot_dataset(id: u32, value: f64) -> Dataset {
        Dataset {
            graph: true,
            ..dataset(id, "", value)
        }
    }

    fn group(id: u32, widget: &str, datasets: Vec<Dataset>) -> Group {
        Group {
            group_id: id,
            title: format!("Group {id}"),
            widget: widget.to_string(),
            datasets,
        }
    }

    fn frame(groups: Vec<Group>) -> Frame {
        Frame {
            title: "Test Dashboard".to_string(),
            groups,
            actions: Vec::new(),
        }
    }

    fn plot_frame(value: f64) -> Frame {
        frame(vec![group(0, "", vec![plot_dataset(1, value)])])
    }

    fn count_events(rx: &Receiver<DashboardEvent>, wanted: DashboardEvent) -> usize {
        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            if event == wanted {
                count += 1;
            }
        }
        count
    }

    #[test]
    fn test_value_only_updates_do_not_reconfigure() {
        let (mut dash, _) = dashboard(false);
        let events = dash.subscribe();

        dash.process_frame(&plot_frame(1.0));
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 1);

        dash.process_frame(&plot_frame(2.0));
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 0);
        assert_eq!(dash.dataset(1).unwrap().numeric_value(), 2.0);

        // Any shape change reconfigures.
        let mut wider = plot_frame(3.0);
        wider.groups[0].datasets.push(plot_dataset(2, 4.0));
        dash.process_frame(&wider);
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 1);
    }

    #[test]
    fn test_accelerometer_registrations() {
        let accel = frame(vec![group(
            0,
            "accelerometer",
            vec![
                dataset(1, "x", 0.1),
                dataset(2, "y", 0.2),
                dataset(3, "z", 0.3),
            ],
        )]);

        let (mut dash, _) = dashboard(false);
        dash.process_frame(&accel);
        assert_eq!(dash.widget_count_of(WidgetKind::Accelerometer), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::MultiPlot), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::Plot3D), 0);

        let (mut dash, _) = dashboard(true);
        dash.process_frame(&accel);
        assert_eq!(dash.widget_count_of(WidgetKind::Accelerometer), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::MultiPlot), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::Plot3D), 1);
    }

    #[test]
    fn test_gyroscope_also_feeds_multiplot() {
        let gyro = frame(vec![group(
            0,
            "gyroscope",
            vec![dataset(1, "x", 0.0), dataset(2, "y", 0.0)],
        )]);
        let (mut dash, _) = dashboard(false);
        dash.process_frame(&gyro);
        assert_eq!(dash.widget_count_of(WidgetKind::Gyroscope), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::MultiPlot), 1);
    }

    #[test]
    fn test_unlicensed_plot3d_falls_back_to_multiplot() {
        let plot3d = frame(vec![group(
            0,
            "plot3d",
            vec![
                dataset(1, "x", 1.0),
                dataset(2, "y", 2.0),
                dataset(3, "z", 3.0),
            ],
        )]);

        let (mut dash, _) = dashboard(false);
        let events = dash.subscribe();
        dash.process_frame(&plot3d);

        assert_eq!(dash.widget_count_of(WidgetKind::Plot3D), 0);
        assert_eq!(dash.widget_count_of(WidgetKind::MultiPlot), 1);
        let fallback = dash.group_widget(WidgetKind::MultiPlot, 0).unwrap();
        assert!(fallback.title.ends_with("(Fallback)"));
        assert_eq!(dash.processed_frame().groups[0].widget, "multiplot");

        // The redirect must be stable: the same raw frame again is a
        // value-only update.
        count_events(&events, DashboardEvent::WidgetCountChanged);
        dash.process_frame(&plot3d);
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 0);

        // Licensed builds keep the 3D widget.
        let (mut dash, _) = dashboard(true);
        dash.process_frame(&plot3d);
        assert_eq!(dash.widget_count_of(WidgetKind::Plot3D), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::MultiPlot), 0);
    }

    #[test]
    fn test_registry_merges_min_max_and_adopts_latest_value() {
        let mut first = dataset(7, "bar", 5.0);
        first.min = 0.0;
        first.max = 10.0;
        let mut second = dataset(7, "bar", 8.0);
        second.min = -5.0;
        second.max = 3.0;

        let (mut dash, _) = dashboard(false);
        dash.process_frame(&frame(vec![
            group(0, "", vec![first]),
            group(1, "", vec![second]),
        ]));

        let merged = dash.dataset(7).unwrap();
        assert_eq!(merged.min, -5.0);
        assert_eq!(merged.max, 10.0);
        assert_eq!(merged.numeric_value(), 8.0);
    }

    #[test]
    fn test_widget_map_is_dense() {
        let (mut dash, _) = dashboard(false);
        dash.process_frame(&frame(vec![
            group(
                0,
                "accelerometer",
                vec![
                    dataset(1, "x", 0.0),
                    dataset(2, "y", 0.0),
                    dataset(3, "z", 0.0),
                ],
            ),
            group(
                1,
                "gps",
                vec![dataset(4, "lat", 0.0), dataset(5, "lon", 0.0)],
            ),
            group(
                2,
                "",
                vec![
                    plot_dataset(6, 0.0),
                    dataset(7, "gauge", 0.0),
                    dataset(8, "led", 0.0),
                ],
            ),
        ]));

        // accelerometer + multiplot + gps + led panel + plot + gauge
        let total = dash.total_widget_count();
        assert_eq!(total, 6);

        let mut seen = HashSet::new();
        for index in 0..total {
            let kind = dash.widget_type(index).expect("dense index missing");
            let relative = dash.relative_index(index).unwrap();
            assert!(relative < dash.widget_count_of(kind));
            assert!(seen.insert((kind, relative)), "duplicate pair at {index}");
        }
        assert!(dash.widget_type(total).is_none());

        // Every (kind, relative) pair resolves back to a unique index.
        for kind in [
            WidgetKind::Accelerometer,
            WidgetKind::MultiPlot,
            WidgetKind::Gps,
            WidgetKind::LedPanel,
            WidgetKind::Plot,
            WidgetKind::Gauge,
        ] {
            for relative in 0..dash.widget_count_of(kind) {
                assert!(seen.contains(&(kind, relative)));
            }
        }
    }

    #[test]
    fn test_led_datasets_collect_into_panel() {
        let (mut dash, _) = dashboard(false);
        dash.process_frame(&frame(vec![group(
            0,
            "",
            vec![dataset(1, "led", 1.0), dataset(2, "led", 0.0)],
        )]));

        assert_eq!(dash.widget_count_of(WidgetKind::LedPanel), 1);
        assert_eq!(dash.widget_count_of(WidgetKind::Led), 0);
        let panel = dash.group_widget(WidgetKind::LedPanel, 0).unwrap();
        assert_eq!(panel.dataset_count(), 2);
        assert!(panel.title.starts_with("LED Panel"));
    }

    #[test]
    fn test_gps_missing_altitude_pushes_sentinel() {
        let (mut dash, _) = dashboard(false);
        dash.process_frame(&frame(vec![group(
            0,
            "gps",
            vec![dataset(1, "lat", 10.5), dataset(2, "lon", -3.25)],
        )]));

        let series = dash.gps_series(0).unwrap();
        assert_eq!(series.latitudes.latest(), Some(10.5));
        assert_eq!(series.longitudes.latest(), Some(-3.25));
        assert!(series.altitudes.latest().unwrap().is_nan());
    }

    #[test]
    fn test_point_count_bounds_plot_history() {
        let (mut dash, _) = dashboard(false);
        dash.set_points(5);

        for value in 1..=7 {
            dash.process_frame(&plot_frame(value as f64));
        }

        let view = dash.plot_data(0).unwrap();
        assert_eq!(view.y.capacity(), 6);
        let values: Vec<f64> = view.y.iter().copied().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(view.x.len(), view.y.len());
    }

    #[test]
    fn test_set_points_reallocates_series() {
        let (mut dash, _) = dashboard(false);
        dash.process_frame(&plot_frame(1.0));
        assert_eq!(dash.plot_data(0).unwrap().y.capacity(), DEFAULT_POINTS + 1);

        let events = dash.subscribe();
        dash.set_points(10);
        assert_eq!(dash.plot_data(0).unwrap().y.capacity(), 11);
        assert_eq!(count_events(&events, DashboardEvent::PointsChanged), 1);
    }

    #[test]
    fn test_desync_self_heals_exactly_once() {
        let (mut dash, _) = dashboard(false);
        let events = dash.subscribe();
        dash.process_frame(&plot_frame(1.0));
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 1);

        // Simulate a stale model: the fan-out index lost its entries.
        dash.fanout_mut().clear();
        dash.process_frame(&plot_frame(9.0));

        // Exactly one recovery rebuild, and the frame's values landed.
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 1);
        assert_eq!(dash.dataset(1).unwrap().numeric_value(), 9.0);
    }

    #[test]
    fn test_refresh_tick_coalesces_updates() {
        let (mut dash, _) = dashboard(false);
        let events = dash.subscribe();

        dash.process_frame(&plot_frame(1.0));
        dash.process_frame(&plot_frame(2.0));
        dash.process_frame(&plot_frame(3.0));
        assert_eq!(count_events(&events, DashboardEvent::Updated), 0);

        dash.refresh_tick();
        assert_eq!(count_events(&events, DashboardEvent::Updated), 1);

        dash.refresh_tick();
        assert_eq!(count_events(&events, DashboardEvent::Updated), 0);
    }

    #[test]
    fn test_invalid_or_streamless_frames_are_ignored() {
        let (mut dash, state) = dashboard(false);
        let events = dash.subscribe();

        dash.process_frame(&Frame::default());
        assert_eq!(dash.total_widget_count(), 0);
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 0);

        state.borrow_mut().connected = false;
        dash.process_frame(&plot_frame(1.0));
        assert_eq!(dash.total_widget_count(), 0);
        assert!(!dash.available());
    }

    #[test]
    fn test_terminal_group_is_synthetic_and_stable() {
        let (mut dash, _) = dashboard(false);
        dash.set_terminal_enabled(true);
        dash.process_frame(&plot_frame(1.0));

        assert_eq!(dash.widget_count_of(WidgetKind::Terminal), 1);
        assert_eq!(dash.raw_frame().groups.len(), 1);
        assert_eq!(dash.processed_frame().groups.len(), 2);

        // Structural equality runs against the raw frame, so the synthetic
        // group must not force a rebuild on every frame.
        let events = dash.subscribe();
        dash.process_frame(&plot_frame(2.0));
        assert_eq!(count_events(&events, DashboardEvent::WidgetCountChanged), 0);
    }

    #[test]
    fn test_x_source_dataset_advances_both_axes_once() {
        // Dataset 2 is displayed as its own Y series and serves as dataset
        // 1's X axis: per frame its Y buffer and its X buffer each advance
        // exactly once.
        let mut fed = plot_dataset(1, 10.0);
        fed.x_source = Some(2);
        let source = plot_dataset(2, 20.0);

        let (mut dash, _) = dashboard(true);
        dash.process_frame(&frame(vec![group(0, "", vec![fed, source])]));

        let fed_view = dash.plot_data(0).unwrap();
        assert_eq!(fed_view.y.latest(), Some(10.0));
        assert_eq!(fed_view.x.latest(), Some(20.0));
        // Second-newest X sample is still the prefill: one push only.
        let len = fed_view.x.len();
        assert_eq!(fed_view.x.get(len - 2), Some(0.0));

        let source_view = dash.plot_data(1).unwrap();
        assert_eq!(source_view.y.latest(), Some(20.0));
        let len = source_view.y.len();
        assert_eq!(source_view.y.get(len - 2), Some(0.0));
    }

    #[test]
    fn test_unlicensed_x_source_uses_sample_axis() {
        let mut fed = plot_dataset(1, 10.0);
        fed.x_source = Some(2);
        let source = plot_dataset(2, 20.0);

        let (mut dash, _) = dashboard(false);
        dash.process_frame(&frame(vec![group(0, "", vec![fed, source])]));

        let view = dash.plot_data(0).unwrap();
        // Sample axis, not the source's values.
        assert_eq!(view.x.latest(), Some((DEFAULT_POINTS + 1) as f64));
    }

    #[test]
    fn test_action_toggle_and_timer_fire() {
        let mut poll = Action {
            title: "Poll".to_string(),
            tx_data: "POLL".to_string(),
            eol: "\n".to_string(),
            timer_mode: TimerMode::ToggleOnTrigger,
            timer_interval_ms: 50,
            ..Action::default()
        };
        poll.icon = "refresh".to_string();

        let mut telemetry = plot_frame(1.0);
        telemetry.actions.push(poll);

        let (mut dash, state) = dashboard(false);
        dash.process_frame(&telemetry);
        assert_eq!(dash.action_count(), 1);
        assert!(!dash.actions()[0].checked);

        // User trigger: transmits and starts the timer.
        dash.activate_action(0, true);
        assert_eq!(state.borrow().sent, vec![b"POLL\n".to_vec()]);
        assert!(dash.actions()[0].checked);

        // Timer fire: transmits without toggling.
        let t0 = Instant::now();
        dash.poll_actions(t0);
        dash.poll_actions(t0 + Duration::from_millis(60));
        assert_eq!(state.borrow().sent.len(), 2);
        assert!(dash.actions()[0].checked);

        // Second user trigger: transmits and stops the timer.
        dash.activate_action(0, true);
        assert_eq!(state.borrow().sent.len(), 3);
        assert!(!dash.actions()[0].checked);

        dash.poll_actions(t0 + Duration::from_millis(500));
        assert_eq!(state.borrow().sent.len(), 3);
    }

    #[test]
    fn test_paused_transport_suppresses_transmission() {
        let mut telemetry = plot_frame(1.0);
        telemetry.actions.push(Action {
            title: "Ping".to_string(),
            tx_data: "PING".to_string(),
            ..Action::default()
        });

        let (mut dash, state) = dashboard(false);
        dash.process_frame(&telemetry);

        state.borrow_mut().paused = true;
        dash.activate_action(0, true);
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_out_of_range_action_index_is_a_no_op_in_release() {
        let (mut dash, state) = dashboard(false);
        dash.process_frame(&plot_frame(1.0));
        if cfg!(debug_assertions) {
            return;
        }
        dash.activate_action(42, true);
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_connection_change_resets_everything() {
        let (mut dash, _) = dashboard(false);
        let events = dash.subscribe();
        dash.process_frame(&plot_frame(1.0));
        assert!(dash.available());

        dash.handle_connection_change();
        assert_eq!(dash.total_widget_count(), 0);
        assert_eq!(dash.action_count(), 0);
        assert!(!dash.frame_valid());
        assert!(count_events(&events, DashboardEvent::DataReset) == 1);
    }

    #[test]
    fn test_visibility_helpers() {
        let (mut dash, _) = dashboard(false);
        assert!(!dash.points_widget_visible());
        assert!(!dash.precision_widget_visible());

        dash.process_frame(&frame(vec![group(
            0,
            "",
            vec![plot_dataset(1, 0.0), dataset(2, "gauge", 0.0)],
        )]));
        assert!(dash.points_widget_visible());
        assert!(dash.precision_widget_visible());
    }

    #[test]
    fn test_smart_interval_ladder() {
        assert_eq!(smart_interval(0.0, 100.0, 0.2), 20.0);
        assert_eq!(smart_interval(0.0, 1.0, 0.2), 0.2);
        assert_eq!(smart_interval(5.0, 5.0, 0.2), 1.0);
        assert!(smart_interval(-50.0, 50.0, 0.2) > 0.0);
    }
}
