mod command;
mod document;
mod editor;
mod history;
mod normalize;
mod ops;
mod query;
mod selection;
mod storage;

pub use crate::command::*;
pub use crate::document::*;
pub use crate::editor::*;
pub use crate::history::*;
pub use crate::ops::*;
pub use crate::query::*;
pub use crate::selection::*;
pub use crate::storage::*;
