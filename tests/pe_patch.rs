mod common;

use common::{FakeResolver, Project, runtime_archive, unpack};
use kodegen_bundler_runtime::bundler::icon::ICO_SIZES;
use kodegen_bundler_runtime::bundler::icon::pe::{
    self, PeLayout, RT_GROUP_ICON, RT_ICON, ResourceId,
};
use kodegen_bundler_runtime::bundler::{
    AppIcon, Arch, BundleSpec, Bundler, LauncherSet, OperatingSystem, SettingsBuilder, Target,
    TargetGroup, Workspace,
};

const OPTIONAL_HEADER: usize = 0x80 + 24;
const TEXT: &[u8] = b"\x48\x83\xec\x28\xe8\x00\x00\x00\x00\x48\x83\xc4\x28\xc3 launcher";
const OVERLAY: &[u8] = b"appended payload that must survive";

fn put(bytes: &mut [u8], at: usize, value: &[u8]) {
    bytes[at..at + value.len()].copy_from_slice(value);
}

/// PE32+ launcher with a single `.text` section, no resources and an overlay.
fn launcher() -> Vec<u8> {
    let mut bytes = vec![0u8; 0x400];
    put(&mut bytes, 0, b"MZ");
    put(&mut bytes, 0x3c, &0x80u32.to_le_bytes());
    put(&mut bytes, 0x80, b"PE\0\0");
    put(&mut bytes, 0x84, &0x8664u16.to_le_bytes());
    put(&mut bytes, 0x86, &1u16.to_le_bytes());
    put(&mut bytes, 0x94, &240u16.to_le_bytes());
    put(&mut bytes, 0x96, &0x22u16.to_le_bytes());

    put(&mut bytes, OPTIONAL_HEADER, &0x20bu16.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 24, &0x1_4000_0000u64.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 32, &0x1000u32.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 36, &0x200u32.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 56, &0x2000u32.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 60, &0x200u32.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 68, &3u16.to_le_bytes());
    put(&mut bytes, OPTIONAL_HEADER + 108, &16u32.to_le_bytes());

    let section = OPTIONAL_HEADER + 240;
    put(&mut bytes, section, b".text");
    put(&mut bytes, section + 8, &(TEXT.len() as u32).to_le_bytes());
    put(&mut bytes, section + 12, &0x1000u32.to_le_bytes());
    put(&mut bytes, section + 16, &0x200u32.to_le_bytes());
    put(&mut bytes, section + 20, &0x200u32.to_le_bytes());
    put(&mut bytes, section + 36, &0x6000_0020u32.to_le_bytes());
    put(&mut bytes, 0x200, TEXT);

    bytes.extend_from_slice(OVERLAY);
    bytes
}

fn icon() -> AppIcon {
    let source = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        48,
        48,
        image::Rgba([10, 120, 220, 255]),
    ));
    AppIcon::from_image(&source).unwrap()
}

fn assert_patched(original: &[u8], patched: &[u8], icons: usize) {
    let layout = PeLayout::parse(patched).unwrap();
    assert_eq!(layout.sections.len(), 2);
    assert_eq!(&patched[..0x80], &original[..0x80]);
    assert_eq!(&patched[0x200..0x400], &original[0x200..0x400]);
    assert!(patched.ends_with(OVERLAY));

    let tree = pe::read_resources(&layout, patched).unwrap();
    let icon_table = tree.get_directory(&ResourceId::Id(RT_ICON)).unwrap();
    assert_eq!(icon_table.entries().len(), icons);
    let group_table = tree.get_directory(&ResourceId::Id(RT_GROUP_ICON)).unwrap();
    assert!(group_table.get_directory(&ResourceId::Id(1)).is_some());
}

#[test]
fn test_patch_keeps_code_and_overlay() {
    let original = launcher();
    let icons = icon().resources().unwrap();

    let patched = pe::patch_image(&original, &icons).unwrap();
    assert_patched(&original, &patched, icons.len());
}

#[tokio::test]
async fn test_windows_bundle_embeds_icon_in_launcher() {
    let project = Project::new();
    std::fs::write(
        project.base().join("launchers/windows-launcher.exe"),
        launcher(),
    )
    .unwrap();
    let icon_path = project.root().join("icon.png");
    image::RgbaImage::from_pixel(48, 48, image::Rgba([10, 120, 220, 255]))
        .save(&icon_path)
        .unwrap();

    let target = Target::new(OperatingSystem::Windows, Arch::X86_64);
    let mut resolver = FakeResolver::default();
    resolver.archives.insert(
        target,
        runtime_archive(&project.fixtures(), OperatingSystem::Windows).await,
    );
    let settings = SettingsBuilder::new()
        .launchers(LauncherSet::from_dir(&project.base().join("launchers")))
        .workspace(Workspace::new(project.root(), project.base()))
        .bundle_spec(BundleSpec {
            executable_name: "MyApp".into(),
            vm_args: "-jar app.jar".into(),
            includes: [("app.jar".into(), "app.jar".into())].into(),
            ..Default::default()
        })
        .icon_source(Some(icon_path))
        .target_group(TargetGroup {
            operating_systems: vec![OperatingSystem::Windows],
            architectures: vec![Arch::X86_64],
            ..Default::default()
        })
        .build()
        .unwrap();

    let summary = Bundler::new(settings, resolver).run().await.unwrap();
    let out = unpack(&summary.artifacts[0].path, &project.root().join("out")).await;

    let patched = std::fs::read(out.join("MyApp.exe")).unwrap();
    assert_patched(&launcher(), &patched, ICO_SIZES.len());

    // The stub itself is never modified; only the copy inside the bundle.
    assert_eq!(
        std::fs::read(project.base().join("launchers/windows-launcher.exe")).unwrap(),
        launcher()
    );
}
