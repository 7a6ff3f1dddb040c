//! Clinical report pipeline: text wrapping, page layout, chart rendering,
//! composition and PDF output

pub mod chart;
pub mod compose;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod wrap;

pub use chart::{render_evolution_chart, RenderedChart, CHART_HEIGHT_PX, CHART_WIDTH_PX};
pub use compose::{ComposedReport, ReportComposer, ReportInput};
pub use error::{ReportError, ReportResult};
pub use layout::{DocumentPlan, PageCursor, PageLayout};
pub use wrap::wrap_text;
