pub mod filter;
pub mod paging;

pub use filter::{starts_with, ComparisonOperator, Filter};
pub use paging::{collect_all, first, for_each_page, PagedQuery};
