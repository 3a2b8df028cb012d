mod row;
mod table;

pub use row::{Occupant, Row};
pub use table::SlotTable;
