//! CMake configure and native build driver invocation.

use super::platform::{BuildDriver, Platform};
use crate::error::Fatal;
use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Command;

/// Inputs to the LLVM configure step.
#[derive(Debug, Clone)]
pub struct ConfigureOptions<'a> {
    pub platform: &'a Platform,
    pub source_dir: &'a Path,
    pub install_dir: &'a Path,
    pub triple: &'a str,
    pub targets: &'a str,
    /// Build with clang and libc++ instead of the default host compiler.
    pub clang: bool,
}

/// CMake arguments (without the program itself) for configuring LLVM.
pub fn configure_args(opts: &ConfigureOptions<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-G".into(), opts.platform.generator.into()];
    args.extend(opts.platform.generator_args.iter().map(OsString::from));
    args.push("-Wno-dev".into());
    args.push(define("CMAKE_BUILD_TYPE", "Release"));
    args.push(define("CMAKE_CROSSCOMPILING", "True"));
    args.push(define("CMAKE_INSTALL_PREFIX", opts.install_dir));
    args.push(define("CMAKE_PREFIX_PATH", opts.install_dir));
    args.push(define("LLVM_INCLUDE_TESTS", "OFF"));
    args.push(define("LLVM_INCLUDE_EXAMPLES", "OFF"));
    args.push(define("CLANG_INCLUDE_DOCS", "OFF"));
    args.push(define("LLVM_TARGETS_TO_BUILD", opts.targets));
    args.push(define("LLVM_DEFAULT_TARGET_TRIPLE", opts.triple));
    if opts.clang {
        args.push(define("CMAKE_CXX_FLAGS", "-std=c++11 -stdlib=libc++"));
    }
    args.push(opts.source_dir.into());
    args
}

fn define(key: &str, value: impl AsRef<OsStr>) -> OsString {
    let mut arg = OsString::from(format!("-D{key}="));
    arg.push(value);
    arg
}

/// Native build command run in the configured build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

pub fn build_command(platform: &Platform, jobs: usize) -> BuildCommand {
    let args = match platform.driver {
        BuildDriver::MsBuild => ["LLVM.sln", "/t:Build", "/p:Configuration=Release", "/m"]
            .map(String::from)
            .to_vec(),
        BuildDriver::Make => vec!["install".to_string(), format!("-j{jobs}")],
    };
    BuildCommand {
        program: platform.driver.program(),
        args,
    }
}

/// Run `program` in `dir`, turning a non-zero exit into [`Fatal`].
pub fn run<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    dir: &Path,
    env: &[(&str, &str)],
) -> Result<()> {
    let display = program.display().to_string();
    log::debug!(
        "running {display} {:?} in {}",
        args.iter().map(AsRef::as_ref).collect::<Vec<&OsStr>>(),
        dir.display()
    );

    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .envs(env.iter().copied())
        .status()
        .with_context(|| format!("Failed to run {display}"))?;

    if status.success() {
        return Ok(());
    }
    Err(match status.code() {
        Some(code) => Fatal::CommandFailed {
            program: display,
            code,
        },
        None => Fatal::CommandKilled { program: display },
    }
    .into())
}
