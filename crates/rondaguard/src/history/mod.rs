//! Read-side consumers of the round history.

mod filter;
mod report;
mod view;

pub use filter::{Facets, RoundFilter, StatusFilter};
pub use report::{Summary, Tally};
pub use view::HistoryView;
