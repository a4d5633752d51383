//! Shared test utilities for integration tests
//!
//! Provides common fixture creation and helper functions
//! used across multiple test files.

use assert_fs::prelude::*;

/// The update fixture from the original tool's regression suite: six call
/// sites with placeholder IDs, two per stamp variant, starting on line 2.
pub const SIX_ZERO_SITES: &str = r#" // this is line 1
	break; case __LINE__: TRICE8_1( id(0), "msg:value=%d\n", -1  ); // no stamp
	break; case __LINE__: TRICE8_1( id(0), "msg:value=%d\n", -1  ); // no stamp
	break; case __LINE__: TRICE8_1( Id(0), "msg:value=%d\n", -1  ); // 16-bit stamp
	break; case __LINE__: TRICE8_1( Id(0), "msg:value=%d\n", -1  ); // 16-bit stamp
	break; case __LINE__: TRICE8_1( ID(0), "msg:value=%d\n", -1  ); // 32-bit stamp
	break; case __LINE__: TRICE8_1( ID(0), "msg:value=%d\n", -1  ); // 32-bit stamp
"#;

/// Create a project directory holding a single source file.
pub fn fixture_with(name: &str, body: &str) -> assert_fs::TempDir {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child(name).write_str(body).expect("write source");
    tmp
}

/// Read a catalog artifact back as parsed JSON.
pub fn read_json(tmp: &assert_fs::TempDir, name: &str) -> serde_json::Value {
    let raw = std::fs::read_to_string(tmp.path().join(name)).expect("read artifact");
    serde_json::from_str(&raw).expect("parse artifact")
}
