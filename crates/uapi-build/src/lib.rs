//! Build configuration for builduapi.
//!
//! This crate provides:
//! - Configuration format (`builduapi.toml`)
//! - Front-end argument construction
//! - Modified header overlay collection
//!
//! # Example
//!
//! ```toml
//! # builduapi.toml
//! input = "uapi.c"
//! output = "include/uapi.h"
//!
//! [headers]
//! original = "kernel-headers/linux-4.3.5"
//! modified = "kernel-headers/modified"
//!
//! [compiler]
//! target = "x86_64"
//! defines = ["__KERNEL_STRICT_NAMES"]
//! ```

mod config;
mod error;
mod overlay;

pub use config::{BuildConfig, CompilerConfig, HeaderConfig, Target};
pub use error::{BuildError, Result};
pub use overlay::{collect_overlays, VirtualFile};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_config() {
        let toml = r#"
input = "uapi.c"
output = "uapi.h"
        "#;

        let config: BuildConfig = toml::from_str(toml).expect("Failed to parse config");
        assert_eq!(config.input.as_deref(), Some(std::path::Path::new("uapi.c")));
        assert!(config.headers.modified.is_none());
        assert!(config.compiler.defines.is_empty());
    }
}
