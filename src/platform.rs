use std::fmt;

use crate::exec::Executor;

/// Oldest macOS major release the provisioning flow supports.
pub const MINIMUM_MACOS_MAJOR: u32 = 12;

/// Detected operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Apple macOS, the supported family.
    MacOs,
    /// Linux (unsupported for provisioning, used by the test suite).
    Linux,
    /// Anything else.
    Other,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    /// Apple silicon.
    Arm64,
    /// Intel.
    X86_64,
    /// Any other architecture, by its Rust name.
    Other(String),
}

impl Arch {
    fn from_rust_arch(arch: &str) -> Self {
        match arch {
            "aarch64" => Self::Arm64,
            "x86_64" => Self::X86_64,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the architecture has Homebrew bottles and app builds.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Arm64 | Self::X86_64)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arm64 => write!(f, "arm64"),
            Self::X86_64 => write!(f, "x86_64"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// OS product version (e.g. `14.4.1`), when it could be determined.
    pub version: Option<String>,
    /// CPU architecture.
    pub arch: Arch,
    /// Base name of the login shell from `$SHELL` (e.g. `zsh`).
    pub shell: Option<String>,
}

impl Platform {
    /// Detect the current platform.
    ///
    /// The macOS product version comes from `sw_vers`, run through
    /// `executor`; on other systems it is left empty.
    pub fn detect(executor: &dyn Executor) -> Self {
        let os = Self::detect_os();
        let version = if os == Os::MacOs {
            executor
                .run("sw_vers", &["-productVersion"])
                .ok()
                .map(|r| r.stdout.trim().to_string())
                .filter(|v| !v.is_empty())
        } else {
            None
        };
        let shell = std::env::var("SHELL")
            .ok()
            .as_deref()
            .and_then(shell_name)
            .map(String::from);

        Self {
            os,
            version,
            arch: Arch::from_rust_arch(std::env::consts::ARCH),
            shell,
        }
    }

    /// Create a platform with explicit values (for testing).
    #[must_use]
    pub fn new(os: Os, version: Option<&str>, arch: Arch, shell: Option<&str>) -> Self {
        Self {
            os,
            version: version.map(String::from),
            arch,
            shell: shell.map(String::from),
        }
    }

    /// Whether this is the supported OS family.
    #[must_use]
    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOs
    }

    /// Major component of the OS version (`14` for `14.4.1`).
    #[must_use]
    pub fn major_version(&self) -> Option<u32> {
        self.version
            .as_deref()
            .and_then(|v| v.split('.').next())
            .and_then(|major| major.parse().ok())
    }

    /// Whether the login shell is zsh.
    #[must_use]
    pub fn uses_zsh(&self) -> bool {
        self.shell.as_deref() == Some("zsh")
    }

    fn detect_os() -> Os {
        if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Other
        }
    }
}

/// Extract the shell's base name from a `$SHELL` value.
fn shell_name(shell: &str) -> Option<&str> {
    shell.rsplit('/').next().filter(|name| !name.is_empty())
}
