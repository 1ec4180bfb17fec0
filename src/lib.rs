//! Core library for the gradebook-merge command line application.
//!
//! The engine normalises imported sheets ([`normalize`]), classifies their
//! columns ([`classify`]), keeps the category → column index bookkeeping
//! consistent across edits ([`category`], [`edit`]), links students between
//! two rosters ([`matcher`]) and plans and applies merges ([`merge`]). Every
//! engine operation is a pure function returning new values. File adapters
//! live under [`io`] and the file-level workflows used by the binary under
//! [`sync`].

pub mod category;
pub mod classify;
pub mod edit;
pub mod error;
pub mod io;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod sync;

pub use category::{CategoryDocument, CategoryIndexMap};
pub use classify::{ClassifierRules, ColumnClassifier};
pub use error::{MergeError, Result};
pub use matcher::{IdentityIndex, MatchType, StudentMatch};
pub use merge::{MergeDecision, apply, plan};
pub use model::{CategoryId, CellValue, Dataset, Record};
pub use normalize::{RawRow, SheetInput, normalize};
