//! Build configuration types (builduapi.toml format).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{BuildError, Result};

/// Root build configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Translation unit including every header to convert.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Generated header.
    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub headers: HeaderConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Header directories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Original (unmodified) header tree, searched with `-I`.
    #[serde(default)]
    pub original: Option<PathBuf>,

    /// Modified header tree overlaid onto the original one.
    #[serde(default)]
    pub modified: Option<PathBuf>,
}

/// Front-end compiler settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// ABI the layout assertions are computed for.
    #[serde(default)]
    pub target: Target,

    /// C standard (e.g. "c11").
    #[serde(default)]
    pub std: Option<String>,

    /// Additional include directories, searched after the original headers.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Preprocessor definitions.
    #[serde(default)]
    pub defines: Vec<String>,

    /// Additional compiler flags.
    #[serde(default)]
    pub cflags: Vec<String>,
}

/// Target ABI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// 32-bit x86.
    #[default]
    #[serde(rename = "x86")]
    X86,
    /// 64-bit x86.
    #[serde(rename = "x86_64")]
    X86_64,
    /// x86-64 with 32-bit pointers.
    #[serde(rename = "x32")]
    X32,
}

impl Target {
    /// Compiler switch selecting this target.
    pub fn flag(self) -> &'static str {
        match self {
            Target::X86 => "-m32",
            Target::X86_64 => "-m64",
            Target::X32 => "-mx32",
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "x86" | "m32" => Ok(Target::X86),
            "x86_64" | "x64" | "m64" => Ok(Target::X86_64),
            "x32" | "mx32" => Ok(Target::X32),
            _ => Err(format!("unknown target `{s}` (expected x86, x86_64 or x32)")),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::X86 => "x86",
            Target::X86_64 => "x86_64",
            Target::X32 => "x32",
        })
    }
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BuildConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Original header directory; the current directory when unset.
    pub fn original_headers(&self) -> PathBuf {
        self.headers
            .original
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Check that the input and the original header directory exist.
    pub fn validate(&self) -> Result<()> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| BuildError::Validation("no input translation unit given".to_string()))?;
        if !input.is_file() {
            return Err(BuildError::InputNotFound(input.clone()));
        }
        if self.output.is_none() {
            return Err(BuildError::Validation("no output header given".to_string()));
        }

        let original = self.original_headers();
        if !original.is_dir() {
            return Err(BuildError::Validation(format!(
                "include path {} not found",
                original.display()
            )));
        }
        Ok(())
    }

    /// Arguments passed to the front-end, in order: language, target,
    /// standard, include paths (original headers first), defines, flags.
    pub fn clang_args(&self) -> Vec<String> {
        let mut args = vec!["-x".to_string(), "c".to_string()];
        args.push(self.compiler.target.flag().to_string());

        if let Some(std) = &self.compiler.std {
            args.push(format!("-std={std}"));
        }

        args.push(format!("-I{}", self.original_headers().display()));
        for include in &self.compiler.includes {
            args.push(format!("-I{include}"));
        }

        for define in &self.compiler.defines {
            args.push(format!("-D{define}"));
        }

        args.extend(self.compiler.cflags.iter().cloned());
        args
    }
}
