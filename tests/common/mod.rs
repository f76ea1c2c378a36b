//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use kodegen_bundler_runtime::bundler::{
    Error, OperatingSystem, Result, RuntimeResolver, Target, archive,
    archive::ArchiveFormat,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory wrapping the runtime inside vendor archives.
pub const WRAPPER: &str = "jdk-17.0.9+9-jre";

pub fn write(path: &Path, contents: impl AsRef<[u8]>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Relative paths of every file below `dir`, sorted, `/`-separated.
pub fn files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    names.sort();
    names
}

/// Builds a vendor-shaped runtime archive for `os` inside `dir`.
///
/// Linux and Windows archives hold `<wrapper>/{bin,lib,man}`; macOS
/// archives hold a bundle skeleton with the runtime under `Contents/Home`.
pub async fn runtime_archive(dir: &Path, os: OperatingSystem) -> PathBuf {
    let tree = dir.join(format!("tree-{os}"));
    let wrapper = tree.join(WRAPPER);
    let home = match os {
        OperatingSystem::MacOs => {
            write(&wrapper.join("Contents/Info.plist"), "<plist>vendor</plist>");
            write(&wrapper.join("Contents/MacOS/libjli.dylib"), "jli");
            write(&wrapper.join("Contents/_CodeSignature/CodeResources"), "sig");
            wrapper.join("Contents/Home")
        }
        _ => wrapper.clone(),
    };
    write(&home.join("bin/java"), "#!/bin/sh\necho java\n");
    write(&home.join("lib/modules"), "modules");
    write(&home.join("man/man1/java.1"), "manual");
    write(&home.join("release"), "JAVA_VERSION=\"17.0.9\"");

    let format = match os {
        OperatingSystem::Windows => ArchiveFormat::Zip,
        _ => ArchiveFormat::TarGz,
    };
    let archive = dir.join(format!("OpenJDK17U-jre_{os}.{}", format.extension()));
    archive::create(format, &tree, &archive).await.unwrap();
    archive
}

/// Resolver serving prepared archives.
///
/// Targets without an archive are unsupported; targets listed in `broken`
/// fail with a transfer error.
#[derive(Default)]
pub struct FakeResolver {
    pub archives: HashMap<Target, PathBuf>,
    pub broken: Vec<Target>,
}

impl RuntimeResolver for FakeResolver {
    async fn resolve(&self, version: u32, target: Target) -> Result<PathBuf> {
        if self.broken.contains(&target) {
            return Err(Error::TransferFailure(format!("{target}: connection reset")));
        }
        self.archives
            .get(&target)
            .cloned()
            .ok_or(Error::UnsupportedTarget { version, target })
    }
}

/// Project directory with an application jar, a config file next to it and
/// launcher stubs under `jcup/launchers`.
pub struct Project {
    pub temp: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(&root.join("app.jar"), "PK jar bytes");
        write(&root.join("README.txt"), "read me");
        write(&root.join("jcup/launchers/unix-launcher"), "#!/bin/sh\n");
        write(&root.join("jcup/launchers/macos-launcher"), "macho launcher");
        write(&root.join("jcup/launchers/windows-launcher.exe"), "MZ stub");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn base(&self) -> PathBuf {
        self.root().join("jcup")
    }

    pub fn fixtures(&self) -> PathBuf {
        let dir = self.root().join("fixtures");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

/// Extracts an artifact into a fresh directory and returns it.
pub async fn unpack(artifact: &Path, into: &Path) -> PathBuf {
    let format = archive::probe_path(artifact).unwrap();
    archive::extract(format, artifact, into).await.unwrap();
    into.to_path_buf()
}
