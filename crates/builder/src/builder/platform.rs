//! Host platform capabilities.
//!
//! Every OS-dependent choice (archive flavour, CMake generator, build driver,
//! executable suffix, default tool locations) is answered here once.

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Linux,
    MacOs,
}

impl HostOs {
    /// The OS this binary was compiled for.
    pub fn current() -> Result<Self> {
        if cfg!(target_os = "windows") {
            Ok(Self::Windows)
        } else if cfg!(target_os = "linux") {
            Ok(Self::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Self::MacOs)
        } else {
            bail!("Unsupported host OS: {}", std::env::consts::OS)
        }
    }
}

/// Native build driver run after CMake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildDriver {
    /// Visual Studio solution builder.
    MsBuild,
    /// Parallel `make install`.
    Make,
}

impl BuildDriver {
    /// Program name looked up on the search path.
    pub fn program(self) -> &'static str {
        match self {
            Self::MsBuild => "MSBuild",
            Self::Make => "make",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub os: HostOs,
    /// Short platform name used in the distribution directory name.
    pub name: &'static str,
    /// Suffix identifying this host's GNU Arm Embedded Toolchain archive.
    pub gnu_archive_suffix: &'static str,
    pub exe_suffix: &'static str,
    pub generator: &'static str,
    pub generator_args: &'static [&'static str],
    pub driver: BuildDriver,
    /// Install locations searched for CMake when it is not on `PATH`.
    pub cmake_locations: &'static [&'static str],
}

impl Platform {
    pub fn host() -> Result<Self> {
        Ok(Self::for_os(HostOs::current()?))
    }

    pub fn for_os(os: HostOs) -> Self {
        match os {
            HostOs::Windows => Self {
                os,
                name: "win32",
                gnu_archive_suffix: "-win32.zip",
                exe_suffix: ".exe",
                generator: "Visual Studio 14 2015 Win64",
                generator_args: &["-Thost=x64"],
                driver: BuildDriver::MsBuild,
                cmake_locations: &["c:\\program files\\cmake\\bin"],
            },
            HostOs::Linux => Self {
                os,
                name: "linux",
                gnu_archive_suffix: "-linux.tar.bz2",
                exe_suffix: "",
                generator: "Unix Makefiles",
                generator_args: &[],
                driver: BuildDriver::Make,
                cmake_locations: &[],
            },
            HostOs::MacOs => Self {
                os,
                name: "darwin",
                gnu_archive_suffix: "-mac.tar.bz2",
                exe_suffix: "",
                generator: "Unix Makefiles",
                generator_args: &[],
                driver: BuildDriver::Make,
                cmake_locations: &["/Applications/CMake.app/Contents/bin"],
            },
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }

    /// Append the executable suffix to a tool name.
    pub fn exe(&self, name: &str) -> String {
        format!("{name}{}", self.exe_suffix)
    }
}
