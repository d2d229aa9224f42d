//! Materialized views for tesseradb
//!
//! Views group and sort records by user-supplied closures and keep the
//! result materialized across commits. Filtered views carve ordered subsets
//! out of a parent view, and mappings project a view's groups into a stable
//! section/row shape for consumers.

pub mod filtered;
pub mod grouping;
pub mod handle;
pub mod mappings;
pub mod view;

pub use filtered::FilteredView;
pub use grouping::{Filtering, Grouping, Sorting};
pub use handle::ViewHandle;
pub use mappings::Mappings;
pub use view::View;
