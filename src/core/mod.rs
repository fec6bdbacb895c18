//! Core engine for teledash

mod actions;
mod dashboard;
mod events;
mod fanout;
mod series;
mod transport;

pub use actions::ActionController;
pub use dashboard::{
    smart_interval, ActionStatus, Dashboard, DEFAULT_POINTS, DEFAULT_PRECISION,
};
pub use events::{DashboardEvent, EventHub};
pub use fanout::{CopyHandle, FanoutIndex};
pub use series::{
    GpsSeries, LineSeriesView, MultiSeriesView, SeriesStore, XAxisRef, INVALID_SAMPLE,
};
pub use transport::{BoxedLicense, BoxedTransport, LicenseGate, TransportError, TransportSink};
