//! JSON configuration file.
//!
//! The file lives at `jcup/config.json` by default. Every field has a
//! default, so a partial file is accepted and rewritten with the missing
//! fields filled in. Field names are snake_case; the camelCase names of
//! older configs are still read.

use crate::bundler::{
    Arch, BundleSpec, IncludeMap, LauncherSet, OperatingSystem, RuntimeSettings, Settings,
    SettingsBuilder, TargetGroup, TargetSettings, Workspace,
};
use crate::error::{CliError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "jcup/config.json";

const GITIGNORE: &str = "*\n!.gitignore\n!config.json\n";

/// Outcome of [`Config::load_or_init`].
#[derive(Debug)]
pub enum ConfigLoad {
    /// The file existed and was parsed.
    Loaded(Config),
    /// The file was missing; defaults were written to this path.
    WroteDefaults(PathBuf),
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Launcher name, also the artifact name prefix.
    #[serde(alias = "executableName")]
    pub executable_name: String,

    /// Reverse domain identifier (macOS `CFBundleIdentifier`).
    #[serde(alias = "executableId")]
    pub executable_id: String,

    /// Source image for the application icon, if any.
    #[serde(alias = "appIconPath")]
    pub app_icon_path: Option<PathBuf>,

    /// Arguments handed to the runtime.
    #[serde(alias = "vmArgs")]
    pub vm_args: String,

    /// Major runtime version.
    #[serde(alias = "javaVersion")]
    pub runtime_version: u32,

    /// `jre` or `jdk`.
    pub runtime_image_type: String,

    /// Base URL of the runtime listing API.
    pub runtime_api_base: String,

    /// Source → destination map copied into every bundle, in file order.
    #[serde(alias = "mainInclude")]
    pub main_include: IndexMap<String, String>,

    /// Directory holding the launcher stubs.
    pub launchers_dir: PathBuf,

    /// Verify downloaded runtimes against the listed checksum.
    pub verify_checksums: bool,

    /// Target matrix.
    #[serde(alias = "toCreate")]
    pub to_create: Vec<TargetBlock>,
}

/// One block of the target matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetBlock {
    /// Operating systems of the block.
    #[serde(alias = "operatingSystems")]
    pub operating_systems: Vec<OperatingSystem>,

    /// Architectures built for each operating system.
    pub architectures: Vec<Arch>,

    /// Arguments placed before [`Config::vm_args`].
    #[serde(alias = "extraVmArgs")]
    pub extra_vm_args: Option<String>,

    /// Extra files, copied after [`Config::main_include`].
    #[serde(alias = "extraInclude")]
    pub extra_include: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let runtime = RuntimeSettings::default();
        Self {
            executable_name: "MyApp".into(),
            executable_id: "com.example.myapp".into(),
            app_icon_path: None,
            vm_args: "-Xms1M -jar app.jar".into(),
            runtime_version: runtime.version,
            runtime_image_type: runtime.image_type,
            runtime_api_base: runtime.api_base,
            main_include: [("app.jar".to_string(), "app.jar".to_string())].into(),
            launchers_dir: PathBuf::from("jcup/launchers"),
            verify_checksums: runtime.verify_checksums,
            to_create: default_matrix(),
        }
    }
}

fn default_matrix() -> Vec<TargetBlock> {
    use OperatingSystem::*;

    let block = |operating_systems: Vec<OperatingSystem>, architectures: Vec<Arch>| TargetBlock {
        operating_systems,
        architectures,
        ..Default::default()
    };

    vec![
        block(vec![Windows, MacOs], vec![Arch::X86]),
        block(
            vec![LinuxGlibc, LinuxMusl, Windows, MacOs],
            vec![Arch::X86_64],
        ),
        block(vec![LinuxGlibc, LinuxMusl, MacOs], vec![Arch::AArch64]),
        block(vec![LinuxGlibc], vec![Arch::Arm]),
    ]
}

impl Config {
    /// Reads the config at `path`, or writes defaults there if it is missing.
    ///
    /// When defaults are written, a `.gitignore` is placed beside the file so
    /// that only the config itself is tracked. An existing config is
    /// rewritten with missing fields filled in; a failed rewrite is only
    /// logged.
    pub async fn load_or_init(path: &Path) -> Result<ConfigLoad> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::write_defaults(path).await?;
            return Ok(ConfigLoad::WroteDefaults(path.to_path_buf()));
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| config_error(path, e))?;
        let config: Config = serde_json::from_str(&contents)?;

        match config.save(path).await {
            Ok(()) => log::debug!("Rewrote {} with any missing fields", path.display()),
            Err(e) => log::warn!("Unable to rewrite config, ignoring: {}", e),
        }

        Ok(ConfigLoad::Loaded(config))
    }

    async fn write_defaults(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| config_error(parent, e))?;
        }
        Config::default().save(path).await?;

        let gitignore = path.with_file_name(".gitignore");
        tokio::fs::write(&gitignore, GITIGNORE)
            .await
            .map_err(|e| config_error(&gitignore, e))?;
        Ok(())
    }

    /// Writes the config as pretty JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json + "\n")
            .await
            .map_err(|e| config_error(path, e))?;
        Ok(())
    }

    /// Builds pipeline settings.
    ///
    /// The bundler's folders live beside the config file; relative include
    /// sources, the icon and the launcher directory resolve against the
    /// directory that contains that folder. `only`, when non-empty, keeps
    /// only the listed operating systems in the matrix.
    pub fn to_settings(&self, config_path: &Path, only: &[OperatingSystem]) -> Result<Settings> {
        let base_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let project_root = match base_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let workspace = Workspace::new(project_root, base_dir);
        let launchers = LauncherSet::from_dir(&workspace.resolve_source(&self.launchers_dir));

        let matrix = self
            .to_create
            .iter()
            .map(|block| block.to_group(only))
            .filter(|group| !group.operating_systems.is_empty())
            .collect();

        let settings = SettingsBuilder::new()
            .bundle_spec(BundleSpec {
                executable_name: self.executable_name.clone(),
                executable_id: self.executable_id.clone(),
                vm_args: self.vm_args.clone(),
                includes: include_map(&self.main_include),
            })
            .runtime(RuntimeSettings {
                version: self.runtime_version,
                image_type: self.runtime_image_type.clone(),
                api_base: self.runtime_api_base.clone(),
                verify_checksums: self.verify_checksums,
            })
            .icon_source(self.app_icon_path.clone())
            .launchers(launchers)
            .workspace(workspace)
            .matrix(matrix)
            .build()?;
        Ok(settings)
    }
}

impl TargetBlock {
    fn to_group(&self, only: &[OperatingSystem]) -> TargetGroup {
        TargetGroup {
            operating_systems: self
                .operating_systems
                .iter()
                .copied()
                .filter(|os| only.is_empty() || only.contains(os))
                .collect(),
            architectures: self.architectures.clone(),
            settings: TargetSettings {
                extra_vm_args: self.extra_vm_args.clone(),
                extra_includes: include_map(&self.extra_include),
            },
        }
    }
}

fn include_map(entries: &IndexMap<String, String>) -> IncludeMap {
    entries
        .iter()
        .map(|(source, destination)| (PathBuf::from(source), PathBuf::from(destination)))
        .collect()
}

fn config_error(path: &Path, e: std::io::Error) -> CliError {
    CliError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
