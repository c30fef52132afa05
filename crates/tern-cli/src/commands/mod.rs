//! CLI command implementations

pub(crate) mod alter;
pub(crate) mod clear_lock;
pub(crate) mod common;
pub(crate) mod drop;
pub(crate) mod migrate;
pub(crate) mod rollback;
pub(crate) mod seed;
pub(crate) mod status;
pub(crate) mod truncate;
