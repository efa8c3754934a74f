//! ARM bare-metal LLVM toolchain builder.

pub mod builder;
pub mod config;
pub mod error;
