//! Target CPU architectures and their on-device ABI directories

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Canonical ABI directory names used inside `lib/` of an application package
pub mod abi {
    pub const ARMEABI: &str = "armeabi";
    pub const ARMEABI_V7A: &str = "armeabi-v7a";
    pub const ARM64_V8A: &str = "arm64-v8a";
    pub const X86: &str = "x86";
    pub const X86_64: &str = "x86_64";
    pub const MIPS: &str = "mips";
}

/// Target CPU architecture of a native library
///
/// The set of supported architectures is closed: anything the parser does
/// not recognize is carried as [`CpuType::Other`] and has no ABI directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CpuType {
    Arm,
    Armv7,
    Arm64,
    X86,
    X86_64,
    Mips,
    Other(String),
}

impl CpuType {
    /// Every architecture that has an ABI directory
    pub const SUPPORTED: [CpuType; 6] = [
        CpuType::Arm,
        CpuType::Armv7,
        CpuType::Arm64,
        CpuType::X86,
        CpuType::X86_64,
        CpuType::Mips,
    ];

    /// Parse a cpu tag such as `arm64` or `X86_64`. Never fails.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "arm" => Self::Arm,
            "armv7" => Self::Armv7,
            "arm64" => Self::Arm64,
            "x86" => Self::X86,
            "x86_64" => Self::X86_64,
            "mips" => Self::Mips,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    /// The on-device ABI directory for this architecture, if it has one
    #[must_use]
    pub fn abi_directory(&self) -> Option<&'static str> {
        match self {
            Self::Arm => Some(abi::ARMEABI),
            Self::Armv7 => Some(abi::ARMEABI_V7A),
            Self::Arm64 => Some(abi::ARM64_V8A),
            Self::X86 => Some(abi::X86),
            Self::X86_64 => Some(abi::X86_64),
            Self::Mips => Some(abi::MIPS),
            Self::Other(_) => None,
        }
    }

    /// Tag used in configuration files and on the command line
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Arm => "arm",
            Self::Armv7 => "armv7",
            Self::Arm64 => "arm64",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Mips => "mips",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for CpuType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CpuType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_table() {
        assert_eq!(CpuType::Arm.abi_directory(), Some("armeabi"));
        assert_eq!(CpuType::Armv7.abi_directory(), Some("armeabi-v7a"));
        assert_eq!(CpuType::Arm64.abi_directory(), Some("arm64-v8a"));
        assert_eq!(CpuType::X86.abi_directory(), Some("x86"));
        assert_eq!(CpuType::X86_64.abi_directory(), Some("x86_64"));
        assert_eq!(CpuType::Mips.abi_directory(), Some("mips"));
        assert_eq!(CpuType::Other("riscv64".into()).abi_directory(), None);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(CpuType::parse("ARM64"), CpuType::Arm64);
        assert_eq!(CpuType::parse(" x86_64 "), CpuType::X86_64);
        assert_eq!(CpuType::parse("Armv7"), CpuType::Armv7);
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let cpu = CpuType::parse("mips64");
        assert_eq!(cpu, CpuType::Other("mips64".into()));
        assert_eq!(cpu.to_string(), "mips64");
    }
}
