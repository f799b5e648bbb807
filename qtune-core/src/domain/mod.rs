//! Domain types shared by the search engine and the runner.

pub mod param;
pub mod trial;

pub use param::{Assignment, ParamValue};
pub use trial::{StageResult, Trial};
