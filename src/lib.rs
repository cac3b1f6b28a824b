//! View-state engine for interactive data grids.
//!
//! Given an in-memory dataset and column definitions, keeps filter, sort,
//! selection and column layout state, and derives the rows and column
//! geometry a renderer should draw.

pub mod column;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod row;
pub mod rownumber;
pub mod selection;
pub mod sort;
pub mod value;
pub mod view;

pub use column::{ColumnDef, ColumnGeometry, ColumnKind, ColumnModel, FilterKind, Pin};
pub use config::GridConfig;
pub use error::{GridError, Outcome};
pub use filter::{FilterState, FilterValue};
pub use row::{Dataset, Row, RowId};
pub use selection::SelectionModel;
pub use sort::{SortDirection, SortKey, SortKeys};
pub use value::CellValue;
pub use view::{derive_view, GridAction, GridListener, GridState, GridView, RenderedRow, ViewCoordinator};
