//! macOS `.app` bundle layout.
//!
//! Runtime archives for macOS already ship as a bundle skeleton with the
//! actual runtime under `Contents/Home`. The archive is extracted straight
//! into `<name>.app`, then reshaped:
//!
//! ```text
//! <name>.app/Contents/
//! ├── Info.plist                 synthesized, replaces the vendor one
//! ├── MacOS/<name>               launcher stub
//! └── Resources/
//!     ├── runtime/               formerly Contents/Home
//!     ├── icons.icns
//!     ├── vmargs.txt
//!     └── ...                    includes
//! ```

use super::BundlePaths;
use crate::bail;
use crate::bundler::{BundleSpec, Result, archive::ArchiveFormat, utils::fs};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

pub(super) const PACKAGE_FORMAT: ArchiveFormat = ArchiveFormat::TarGz;

pub(super) const PRUNE: &[&str] = &[
    "Contents/Resources/runtime/man",
    "Contents/Resources/runtime/docs",
    "Contents/_CodeSignature",
];

/// File name referenced by `CFBundleIconFile`.
pub(super) const ICON_FILE: &str = "icons.icns";

const INFO_PLIST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple Computer//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>CFBundleGetInfoString</key>
  <string>{{name}}</string>
  <key>CFBundleExecutable</key>
  <string>{{name}}</string>
  <key>CFBundleIdentifier</key>
  <string>{{id}}</string>
  <key>CFBundleName</key>
  <string>{{name}}</string>
  <key>CFBundleIconFile</key>
  <string>{{icon}}</string>
  <key>CFBundleShortVersionString</key>
  <string>1.0</string>
  <key>CFBundleInfoDictionaryVersion</key>
  <string>6.0</string>
  <key>CFBundlePackageType</key>
  <string>APPL</string>
  <key>IFMajorVersion</key>
  <integer>0</integer>
  <key>IFMinorVersion</key>
  <integer>1</integer>
  <key>NSHighResolutionCapable</key>
  <true/>
</dict>
</plist>
"#;

#[derive(Serialize)]
struct PlistData<'a> {
    name: &'a str,
    id: &'a str,
    icon: &'a str,
}

pub(super) fn paths(target_dir: &Path, name: &str) -> BundlePaths {
    let root = target_dir.join(format!("{name}.app"));
    let contents = root.join("Contents");
    let resources = contents.join("Resources");
    let runtime = resources.join("runtime");
    let launcher = contents.join("MacOS").join(name);
    BundlePaths {
        target_dir: target_dir.to_path_buf(),
        extract_dir: root.clone(),
        icon: resources.join(ICON_FILE),
        executables: vec![launcher.clone(), runtime.join("bin/java")],
        launcher,
        runtime_dir: runtime,
        resources_dir: resources,
        root,
    }
}

pub(super) async fn reshape(paths: &BundlePaths, spec: &BundleSpec) -> Result<()> {
    let contents = paths.root.join("Contents");
    let home = contents.join("Home");
    if !home.is_dir() {
        bail!(
            "runtime archive has no Contents/Home directory under {}",
            paths.root.display()
        );
    }

    fs::create_dir_all(&contents.join("MacOS"), false).await?;
    fs::create_dir_all(&paths.resources_dir, false).await?;
    fs::move_path(&home, &paths.runtime_dir).await?;

    fs::write_file(&contents.join("Info.plist"), render_info_plist(spec)?).await
}

/// Renders `Info.plist` for `spec`.
pub(super) fn render_info_plist(spec: &BundleSpec) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_template_string("Info.plist", INFO_PLIST_TEMPLATE)?;
    Ok(handlebars.render(
        "Info.plist",
        &PlistData {
            name: &spec.executable_name,
            id: &spec.executable_id,
            icon: ICON_FILE,
        },
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> BundleSpec {
        BundleSpec {
            executable_name: "My App".into(),
            executable_id: "com.example.my-app".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_info_plist_substitutes_name_and_id() {
        let plist = render_info_plist(&spec()).unwrap();
        assert!(plist.contains("<key>CFBundleExecutable</key>\n  <string>My App</string>"));
        assert!(plist.contains("<string>com.example.my-app</string>"));
        assert!(plist.contains("<string>icons.icns</string>"));
        assert!(!plist.contains("{{"));
    }

    #[test]
    fn test_info_plist_escapes_markup() {
        let spec = BundleSpec {
            executable_name: "Tom & Jerry".into(),
            executable_id: "com.example.tj".into(),
            ..Default::default()
        };
        let plist = render_info_plist(&spec).unwrap();
        assert!(plist.contains("Tom &amp; Jerry"));
    }

    #[tokio::test]
    async fn test_reshape_moves_home_into_resources() {
        let temp = tempfile::tempdir().unwrap();
        let paths = paths(temp.path(), "My App");
        let contents = paths.root.join("Contents");
        std::fs::create_dir_all(contents.join("Home/bin")).unwrap();
        std::fs::write(contents.join("Home/bin/java"), b"java").unwrap();
        std::fs::write(contents.join("Info.plist"), b"vendor").unwrap();

        reshape(&paths, &spec()).await.unwrap();

        assert!(!contents.join("Home").exists());
        assert!(paths.runtime_dir.join("bin/java").is_file());
        assert!(contents.join("MacOS").is_dir());
        let plist = std::fs::read_to_string(contents.join("Info.plist")).unwrap();
        assert!(plist.contains("com.example.my-app"));
    }

    #[tokio::test]
    async fn test_reshape_requires_home() {
        let temp = tempfile::tempdir().unwrap();
        let paths = paths(temp.path(), "MyApp");
        std::fs::create_dir_all(paths.root.join("Contents")).unwrap();
        assert!(reshape(&paths, &spec()).await.is_err());
    }
}
