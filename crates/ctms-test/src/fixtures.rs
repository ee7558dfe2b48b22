//! rstest fixtures

#[cfg(feature = "testcontainers")]
pub mod testcontainers;

use crate::tree::SqlTree;
use rstest::fixture;

/// Empty deployment tree in a fresh temporary directory.
#[fixture]
pub fn sql_tree() -> SqlTree {
	SqlTree::new()
}
