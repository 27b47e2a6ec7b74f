mod assoc;
mod result_set;
mod row;

pub use assoc::{AssocNode, PairValue};
pub use result_set::{CursorState, ResultSet, RowIter, RowNormalizer};
pub use row::Row;
