//! Shared fixtures: a scratch tree and fake upstream download pages.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use toolchain_builder::builder::fetch::Fetch;
use toolchain_builder::builder::layout::Layout;
use toolchain_builder::builder::merge::GNU_BINARIES;
use toolchain_builder::builder::platform::{HostOs, Platform};
use toolchain_builder::builder::stages::Session;
use toolchain_builder::builder::tools::Tools;
use toolchain_builder::config::Config;

pub const TRIPLE: &str = "arm-none-eabi";
pub const GNU_ROOT: &str = "gcc-arm-none-eabi-9-2019-q4-major";
pub const GNU_FILE: &str = "gcc-arm-none-eabi-9-2019-q4-major-linux.tar.bz2";
pub const LLVM_ROOT: &str = "llvm-9.0.0";
pub const LLVM_FILES: [&str; 3] = [
    "llvm-9.0.0.src.tar.xz",
    "cfe-9.0.0.src.tar.xz",
    "lld-9.0.0.src.tar.xz",
];

const ARM_PAGE: &str =
    "https://developer.arm.com/open-source/gnu-toolchain/gnu-rm/downloads";
const LLVM_PAGE: &str = "http://releases.llvm.org/download.html";

/// Serves canned bodies by URL and counts every request.
pub struct MockFetch {
    bodies: Rc<HashMap<String, Vec<u8>>>,
    calls: Rc<Cell<usize>>,
}

impl Fetch for MockFetch {
    fn open(&self, url: &str) -> anyhow::Result<Box<dyn Read>> {
        self.calls.set(self.calls.get() + 1);
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {url}"))?;
        Ok(Box::new(Cursor::new(body.clone())))
    }
}

/// Test environment with a temp root and a fake upstream.
pub struct TestEnv {
    pub tmp: TempDir,
    pub archives: HashMap<String, Vec<u8>>,
    bodies: Rc<HashMap<String, Vec<u8>>>,
    calls: Rc<Cell<usize>>,
}

impl TestEnv {
    pub fn new() -> Self {
        let gnu = gnu_toolchain_archive();
        let llvm: Vec<Vec<u8>> = ["llvm-9.0.0", "cfe-9.0.0", "lld-9.0.0"]
            .iter()
            .map(|stem| llvm_source_archive(stem))
            .collect();

        let gnu_url = format!(
            "https://developer.arm.com/-/media/Files/downloads/gnu-rm/9-2019q4/{GNU_FILE}?revision=abc&la=en"
        );
        let mut bodies = HashMap::new();
        bodies.insert(ARM_PAGE.to_string(), arm_page().into_bytes());
        bodies.insert(LLVM_PAGE.to_string(), llvm_page().into_bytes());
        bodies.insert(gnu_url, gnu.clone());

        let mut archives = HashMap::new();
        archives.insert(GNU_FILE.to_string(), gnu);
        for (file, bytes) in LLVM_FILES.iter().zip(llvm) {
            bodies.insert(format!("http://releases.llvm.org/9.0.0/{file}"), bytes.clone());
            archives.insert((*file).to_string(), bytes);
        }

        Self {
            tmp: TempDir::new().unwrap(),
            archives,
            bodies: Rc::new(bodies),
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn platform() -> Platform {
        Platform::for_os(HostOs::Linux)
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.root(), TRIPLE, &Self::platform())
    }

    /// A fresh run context over the shared tree and upstream.
    pub fn session(&self, tools: Tools) -> Session {
        let fetch = MockFetch {
            bodies: Rc::clone(&self.bodies),
            calls: Rc::clone(&self.calls),
        };
        Session::new(
            Config::default(),
            self.layout(),
            Self::platform(),
            tools,
            Box::new(fetch),
        )
    }

    /// Requests served so far.
    pub fn fetches(&self) -> usize {
        self.calls.get()
    }

    /// Write an executable shell script under the root.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

fn arm_page() -> String {
    format!(
        "<html>\n\
         <a href=\"/-/media/Files/downloads/gnu-rm/9-2019q4/gcc-arm-none-eabi-9-2019-q4-major-win32.zip?revision=abc&amp;la=en\">Windows</a>\n\
         <a class=\"dl\" href=\"/-/media/Files/downloads/gnu-rm/9-2019q4/{GNU_FILE}?revision=abc&amp;la=en\">Linux x86_64</a>\n\
         <a href=\"/-/media/Files/downloads/gnu-rm/9-2019q4/gcc-arm-none-eabi-9-2019-q4-major-mac.tar.bz2?revision=abc&amp;la=en\">Mac OS X</a>\n\
         </html>\n"
    )
}

fn llvm_page() -> String {
    let mut page = String::from("<html>\n<h1>Download LLVM 9.0.0</h1>\n");
    for file in LLVM_FILES {
        page.push_str(&format!("<li><a href=\"9.0.0/{file}\">{file}</a> (.sig)</li>\n"));
    }
    page.push_str("<li><a href=\"8.0.0/llvm-8.0.0.src.tar.xz\">old</a></li>\n</html>\n");
    page
}

fn tar_bytes(files: &[(String, String)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, path, body.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

fn gnu_toolchain_archive() -> Vec<u8> {
    let mut files = vec![
        (format!("{GNU_ROOT}/{TRIPLE}/include/stdio.h"), "stdio".to_string()),
        (format!("{GNU_ROOT}/{TRIPLE}/include/c++/9.2.1/algorithm"), "algorithm".to_string()),
        (format!("{GNU_ROOT}/{TRIPLE}/lib/libc.a"), "libc".to_string()),
        (format!("{GNU_ROOT}/lib/gcc/{TRIPLE}/9.2.1/crtbegin.o"), "crtbegin".to_string()),
        (format!("{GNU_ROOT}/lib/gcc/{TRIPLE}/9.2.1/libgcc.a"), "libgcc".to_string()),
    ];
    for name in GNU_BINARIES.iter().chain(&["gcc", "g++"]) {
        files.push((format!("{GNU_ROOT}/bin/{TRIPLE}-{name}"), (*name).to_string()));
    }

    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(&tar_bytes(&files)).unwrap();
    encoder.finish().unwrap()
}

fn llvm_source_archive(stem: &str) -> Vec<u8> {
    let files = vec![
        (format!("{stem}.src/CMakeLists.txt"), format!("project({stem})")),
        (format!("{stem}.src/tools/CMakeLists.txt"), String::new()),
    ];
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(&tar_bytes(&files)).unwrap();
    encoder.finish().unwrap()
}
