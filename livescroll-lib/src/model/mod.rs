//! Grid data model

mod column;
mod page;
mod row;
mod sort;
mod value;

pub use column::*;
pub use page::*;
pub use row::*;
pub use sort::*;
pub use value::*;
