use propsi::export::{Arch, Convention, Linkage, Os, Overrides, ResolveError, Target};
use propsi::ExportProfile;

fn target(os: Os, arch: Arch) -> Target {
    Target { os, arch }
}

fn shared(target: Target) -> Result<ExportProfile, ResolveError> {
    ExportProfile::resolve(target, Overrides::SHARED)
}

// ═══════════════════════════════════════════════════════════════════
//  Platform ladder
// ═══════════════════════════════════════════════════════════════════

#[test]
fn windows_x86_exports_stdcall() {
    let p = shared(target(Os::Windows, Arch::X86)).unwrap();
    assert_eq!(p.linkage, Linkage::DllExport);
    assert_eq!(p.convention, Convention::Stdcall);
}

#[test]
fn windows_x64_exports_c() {
    let p = shared(target(Os::Windows, Arch::X86_64)).unwrap();
    assert_eq!(p.linkage, Linkage::DllExport);
    assert_eq!(p.convention, Convention::C);
}

#[test]
fn unix_like_targets_use_default_visibility() {
    for os in [Os::Apple, Os::Unix] {
        for arch in [Arch::X86_64, Arch::Aarch64, Arch::Arm] {
            let p = shared(target(os, arch)).unwrap();
            assert_eq!(p.linkage, Linkage::Visible, "{os:?}/{arch:?}");
            assert_eq!(p.convention, Convention::C, "{os:?}/{arch:?}");
        }
    }
}

#[test]
fn freestanding_powerpc_is_plain_c() {
    let p = shared(target(Os::Freestanding, Arch::PowerPc)).unwrap();
    assert_eq!(p.linkage, Linkage::PlainC);
    assert_eq!(p.convention, Convention::C);
}

#[test]
fn other_freestanding_targets_are_rejected() {
    for arch in [Arch::X86, Arch::Aarch64, Arch::Other] {
        assert_eq!(
            shared(target(Os::Freestanding, arch)).unwrap_err(),
            ResolveError::UnsupportedPlatform
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Overrides
// ═══════════════════════════════════════════════════════════════════

#[test]
fn cdecl_overrides_windows_x86_stdcall() {
    let overrides = Overrides { cdecl: true, ..Overrides::SHARED };
    let p = ExportProfile::resolve(target(Os::Windows, Arch::X86), overrides).unwrap();
    assert_eq!(p.convention, Convention::C);
    assert_eq!(p.linkage, Linkage::DllExport);
}

#[test]
fn stdcall_needs_x86() {
    let overrides = Overrides { stdcall: true, ..Overrides::SHARED };
    assert_eq!(
        ExportProfile::resolve(target(Os::Unix, Arch::X86_64), overrides).unwrap_err(),
        ResolveError::StdcallRequiresX86
    );
    let p = ExportProfile::resolve(target(Os::Unix, Arch::X86), overrides).unwrap();
    assert_eq!(p.convention, Convention::Stdcall);
}

#[test]
fn both_conventions_conflict() {
    let overrides = Overrides { cdecl: true, stdcall: true, ..Overrides::SHARED };
    assert_eq!(
        ExportProfile::resolve(target(Os::Windows, Arch::X86), overrides).unwrap_err(),
        ResolveError::ConflictingConventions
    );
}

#[test]
fn extern_c_only_drops_export_annotation() {
    let overrides = Overrides { extern_c_only: true, ..Overrides::SHARED };
    let p = ExportProfile::resolve(target(Os::Windows, Arch::X86_64), overrides).unwrap();
    assert_eq!(p.linkage, Linkage::PlainC);
    assert!(p.unmangled());
}

#[test]
fn without_export_symbols_functions_stay_mangled() {
    let p = ExportProfile::resolve(target(Os::Unix, Arch::X86_64), Overrides::default()).unwrap();
    assert_eq!(p.linkage, Linkage::Mangled);
    assert!(!p.unmangled());
}

#[test]
fn active_profile_resolves_for_this_build() {
    let p = ExportProfile::resolve(Target::CURRENT, Overrides::ACTIVE).unwrap();
    assert_eq!(p, ExportProfile::ACTIVE);
}
