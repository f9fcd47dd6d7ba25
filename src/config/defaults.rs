//! Default values for configuration fields, used by serde and educe.

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn src() -> PathBuf {
        "src/schemas".into()
    }

    pub fn out() -> PathBuf {
        "schemas".into()
    }
}

// ============================================================================
// [watch] Section Defaults
// ============================================================================

pub mod watch {
    pub fn interval_ms() -> u64 {
        250
    }

    pub fn debounce_ms() -> u64 {
        50
    }
}
