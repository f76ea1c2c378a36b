//! CPU architecture types and utilities.

use std::{fmt, str::FromStr};

/// CPU architecture of a bundle target.
///
/// The architecture selects which runtime build is downloaded; the launcher
/// stub and user files are architecture independent.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_runtime::bundler::Arch;
///
/// let arch: Arch = "aarch64".parse().unwrap();
/// assert_eq!(arch, Arch::AArch64);
/// ```
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub enum Arch {
    /// x86 / i686 (32-bit) - Legacy 32-bit Intel
    #[serde(rename = "x86")]
    X86,
    /// x86_64 / AMD64 (64-bit) - Most common desktop/server architecture
    #[serde(rename = "x86_64")]
    X86_64,
    /// 32-bit ARM (hard-float) - Raspberry Pi and embedded ARM
    #[serde(rename = "arm")]
    Arm,
    /// AArch64 / ARM64 (64-bit) - Apple Silicon, modern ARM devices
    #[serde(rename = "aarch64")]
    AArch64,
    /// RISC-V (64-bit)
    #[serde(rename = "riscv64")]
    Riscv64,
}

impl Arch {
    /// Every supported architecture, in declaration order.
    pub const ALL: [Arch; 5] = [
        Arch::X86,
        Arch::X86_64,
        Arch::Arm,
        Arch::AArch64,
        Arch::Riscv64,
    ];

    /// Name used in configuration files, folder names and artifact names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Arm => "arm",
            Arch::AArch64 => "aarch64",
            Arch::Riscv64 => "riscv64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Arch::ALL
            .into_iter()
            .find(|arch| arch.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown architecture: {s}"))
    }
}
