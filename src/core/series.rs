//! Series buffer store: bounded history for every widget that plots data
//!
//! One family of buffers per widget kind that needs history. Buffers are
//! reallocated wholesale whenever the point count or the corresponding
//! widget count changes; they are never resized incrementally. The store
//! owns the buffers, the dashboard decides when to push, the rendering
//! surface only reads through the view types.

use std::collections::{BTreeMap, HashMap};

use teledash_types::{Dataset, Group, Point3, RingBuffer};

/// Sentinel for samples that were never observed (e.g. a GPS frame without
/// an altitude field).
pub const INVALID_SAMPLE: f64 = f64::NAN;

/// Which X axis a plot reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XAxisRef {
    /// The shared sample-index axis.
    Samples,
    /// A dataset-specific axis fed by another dataset's values.
    Source(u32),
}

/// One registered 2D plot: an X-axis reference plus the identity whose
/// values fill the Y buffer.
#[derive(Debug, Clone, Copy)]
pub struct PlotSeries {
    pub x: XAxisRef,
    pub y_id: u32,
}

/// Y buffers for one multiplot group; the X axis is the shared
/// sample-index axis.
#[derive(Debug, Clone)]
pub struct MultiSeries {
    pub ys: Vec<RingBuffer<f64>>,
}

/// Parallel position history for one GPS widget.
#[derive(Debug, Clone)]
pub struct GpsSeries {
    pub latitudes: RingBuffer<f64>,
    pub longitudes: RingBuffer<f64>,
    pub altitudes: RingBuffer<f64>,
}

impl GpsSeries {
    fn new(capacity: usize) -> Self {
        let mut series = Self {
            latitudes: RingBuffer::new(capacity),
            longitudes: RingBuffer::new(capacity),
            altitudes: RingBuffer::new(capacity),
        };
        series.latitudes.fill(INVALID_SAMPLE);
        series.longitudes.fill(INVALID_SAMPLE);
        series.altitudes.fill(INVALID_SAMPLE);
        series
    }
}

/// Read-only view of one plot's paired axes.
pub struct LineSeriesView<'a> {
    pub x: &'a RingBuffer<f64>,
    pub y: &'a RingBuffer<f64>,
}

/// Read-only view of one multiplot's shared X axis and member Y buffers.
pub struct MultiSeriesView<'a> {
    pub x: &'a RingBuffer<f64>,
    pub ys: &'a [RingBuffer<f64>],
}

/// Owner of every series buffer family.
pub struct SeriesStore {
    points: usize,
    sample_axis: RingBuffer<f64>,
    next_sample: f64,
    x_axes: HashMap<u32, RingBuffer<f64>>,
    y_axes: HashMap<u32, RingBuffer<f64>>,
    plots: Vec<PlotSeries>,
    multiplots: Vec<MultiSeries>,
    ffts: Vec<RingBuffer<f64>>,
    gps: Vec<GpsSeries>,
    plots_3d: Vec<Vec<Point3>>,
}

impl SeriesStore {
    pub fn new(points: usize) -> Self {
        let mut store = Self {
            points,
            sample_axis: RingBuffer::new(points + 1),
            next_sample: 0.0,
            x_axes: HashMap::new(),
            y_axes: HashMap::new(),
            plots: Vec::new(),
            multiplots: Vec::new(),
            ffts: Vec::new(),
            gps: Vec::new(),
            plots_3d: Vec::new(),
        };
        store.reset_sample_axis();
        store
    }

    /// Per-series sample count N; buffers hold N + 1 samples.
    pub fn points(&self) -> usize {
        self.points
    }

    /// Change the point-count setting. The caller is responsible for
    /// reallocating the affected families afterwards.
    pub fn set_points(&mut self, points: usize) {
        self.points = points;
    }

    /// Drop all buffers and release their memory.
    pub fn clear(&mut self) {
        self.x_axes.clear();
        self.y_axes.clear();
        self.plots.clear();
        self.multiplots.clear();
        self.ffts.clear();
        self.gps.clear();
        self.plots_3d.clear();
        self.plots.shrink_to_fit();
        self.multiplots.shrink_to_fit();
        self.ffts.shrink_to_fit();
        self.gps.shrink_to_fit();
        self.plots_3d.shrink_to_fit();
        self.reset_sample_axis();
    }

    fn reset_sample_axis(&mut self) {
        self.sample_axis = RingBuffer::new(self.points + 1);
        self.sample_axis.fill_range(0.0, 1.0);
        self.next_sample = (self.points + 1) as f64;
    }

    //--------------------------------------------------------------------
    // Allocation (called on reconfiguration and point-count changes)
    //--------------------------------------------------------------------

    /// Allocate plot axes. `plots` is the ordered plot-widget dataset list;
    /// `registry` resolves X-axis sources; `licensed` gates source axes.
    pub fn configure_plots(
        &mut self,
        plots: &[Dataset],
        registry: &BTreeMap<u32, Dataset>,
        licensed: bool,
    ) {
        self.x_axes.clear();
        self.y_axes.clear();
        self.plots.clear();
        self.reset_sample_axis();

        for dataset in plots {
            let mut y = RingBuffer::new(self.points + 1);
            y.fill(0.0);
            self.y_axes.insert(dataset.unique_id, y);

            let x = match dataset.x_source {
                Some(source) if licensed && registry.contains_key(&source) => {
                    self.x_axes.entry(source).or_insert_with(|| {
                        let mut x = RingBuffer::new(self.points + 1);
                        x.fill(0.0);
                        x
                    });
                    XAxisRef::Source(source)
                }
                _ => XAxisRef::Samples,
            };

            self.plots.push(PlotSeries {
                x,
                y_id: dataset.unique_id,
            });
        }
    }

    /// Allocate one Y buffer per member dataset for each multiplot group.
    pub fn configure_multiplots(&mut self, groups: &[Group]) {
        self.multiplots.clear();
        self.multiplots.shrink_to_fit();
        for group in groups {
            let ys = group
                .datasets
                .iter()
                .map(|_| {
                    let mut y = RingBuffer::new(self.points + 1);
                    y.fill(0.0);
                    y
                })
                .collect();
            self.multiplots.push(MultiSeries { ys });
        }
    }

    /// Allocate FFT buffers sized by each widget's own sample count.
    pub fn configure_ffts(&mut self, datasets: &[Dataset]) {
        self.ffts.clear();
        self.ffts.shrink_to_fit();
        for dataset in datasets {
            self.ffts.push(RingBuffer::new(dataset.fft_samples.max(1)));
        }
    }

    /// Allocate GPS histories, pre-filled with the invalid sentinel.
    pub fn configure_gps(&mut self, count: usize) {
        self.gps.clear();
        self.gps.shrink_to_fit();
        for _ in 0..count {
            self.gps.push(GpsSeries::new(self.points + 1));
        }
    }

    /// Allocate empty 3D trajectories.
    pub fn configure_plots_3d(&mut self, count: usize) {
        self.plots_3d.clear();
        self.plots_3d.shrink_to_fit();
        self.plots_3d.resize(count, Vec::new());
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    pub fn multiplot_count(&self) -> usize {
        self.multiplots.len()
    }

    pub fn fft_count(&self) -> usize {
        self.ffts.len()
    }

    pub fn gps_count(&self) -> usize {
        self.gps.len()
    }

    pub fn plot3d_count(&self) -> usize {
        self.plots_3d.len()
    }

    //--------------------------------------------------------------------
    // Hot-path pushes (one call per affected buffer per frame)
    //--------------------------------------------------------------------

    /// Advance the shared sample-index axis by one sample.
    pub fn advance_sample_axis(&mut self) {
        self.sample_axis.push(self.next_sample);
        self.next_sample += 1.0;
    }

    /// Push a Y sample for the plot fed by `unique_id`.
    pub fn push_y(&mut self, unique_id: u32, value: f64) {
        if let Some(y) = self.y_axes.get_mut(&unique_id) {
            y.push(value);
        }
    }

    /// Push an X sample into a dataset-specific axis.
    pub fn push_x(&mut self, source: u32, value: f64) {
        if let Some(x) = self.x_axes.get_mut(&source) {
            x.push(value);
        }
    }

    pub fn push_fft(&mut self, index: usize, value: f64) {
        if let Some(fft) = self.ffts.get_mut(index) {
            fft.push(value);
        }
    }

    /// Push one position sample; absent fields carry [`INVALID_SAMPLE`].
    pub fn push_gps(&mut self, index: usize, lat: f64, lon: f64, alt: f64) {
        if let Some(series) = self.gps.get_mut(index) {
            series.latitudes.push(lat);
            series.longitudes.push(lon);
            series.altitudes.push(alt);
        }
    }

    pub fn push_multiplot(&mut self, index: usize, slot: usize, value: f64) {
        if let Some(series) = self.multiplots.get_mut(index) {
            if let Some(y) = series.ys.get_mut(slot) {
                y.push(value);
            }
        }
    }

    /// Append a trajectory point, dropping the oldest beyond the point
    /// count.
    pub fn push_point_3d(&mut self, index: usize, point: Point3) {
        if let Some(trajectory) = self.plots_3d.get_mut(index) {
            trajectory.push(point);
            let max_points = self.points.max(1);
            if trajectory.len() > max_points {
                let excess = trajectory.len() - max_points;
                trajectory.drain(..excess);
            }
        }
    }

    /// Re-trim every trajectory after a point-count change.
    pub fn trim_plots_3d(&mut self) {
        let max_points = self.points.max(1);
        for trajectory in &mut self.plots_3d {
            if trajectory.len() > max_points {
                let excess = trajectory.len() - max_points;
                trajectory.drain(..excess);
            }
        }
    }

    //--------------------------------------------------------------------
    // Read-only access for the rendering surface
    //--------------------------------------------------------------------

    pub fn plot_view(&self, index: usize) -> Option<LineSeriesView<'_>> {
        let plot = self.plots.get(index)?;
        let x = match plot.x {
            XAxisRef::Samples => &self.sample_axis,
            XAxisRef::Source(source) => self.x_axes.get(&source).unwrap_or(&self.sample_axis),
        };
        let y = self.y_axes.get(&plot.y_id)?;
        Some(LineSeriesView { x, y })
    }

    pub fn multiplot_view(&self, index: usize) -> Option<MultiSeriesView<'_>> {
        let series = self.multiplots.get(index)?;
        Some(MultiSeriesView {
            x: &self.sample_axis,
            ys: &series.ys,
        })
    }

    pub fn fft_data(&self, index: usize) -> Option<&RingBuffer<f64>> {
        self.ffts.get(index)
    }

    pub fn gps_series(&self, index: usize) -> Option<&GpsSeries> {
        self.gps.get(index)
    }

    pub fn plot_data_3d(&self, index: usize) -> Option<&[Point3]> {
        self.plots_3d.get(index).map(|v| v.as_slice())
    }
}
