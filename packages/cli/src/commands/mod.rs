pub mod check;
pub mod convert;

pub use check::{check, CheckArgs};
pub use convert::{convert, ConvertArgs};
