//! Various utilities

pub mod logging;
pub mod path_util;
