//! Symbol export and calling-convention selection.
//!
//! Resolution happens entirely at compile time from the target and the
//! cargo features below. Precedence mirrors the usual C header ladder:
//! Windows, then Apple, then other Unix, then freestanding PowerPC; any
//! other target is refused.
//!
//! | feature          | effect                                                  |
//! |------------------|---------------------------------------------------------|
//! | `export-symbols` | unmangled C symbols (default)                           |
//! | `export-cdecl`   | force the C calling convention                          |
//! | `export-stdcall` | force `stdcall` (32-bit x86 only)                       |
//! | `extern-c-only`  | unmangled symbols, profile reports plain C linkage      |
//!
//! [`ExportProfile::resolve`] is a `const fn` over an explicit
//! [`Target`], so every platform combination can be checked from tests;
//! [`ExportProfile::ACTIVE`] is the profile of the current build.

use serde::{Deserialize, Serialize};

#[cfg(not(any(
    target_os = "windows",
    unix,
    target_arch = "powerpc",
    target_arch = "powerpc64"
)))]
compile_error!("no export profile for this target: expected Windows, Apple, Unix or PowerPC");

#[cfg(all(feature = "export-cdecl", feature = "export-stdcall"))]
compile_error!("features `export-cdecl` and `export-stdcall` are mutually exclusive");

#[cfg(all(feature = "export-stdcall", not(target_arch = "x86")))]
compile_error!("feature `export-stdcall` requires a 32-bit x86 target");

// ── export_fn! ──────────────────────────────────────────────────────
//
// Wraps a boundary function in the ABI chosen for this build. The ABI
// string must be a literal, hence one definition per convention.

#[cfg(any(
    feature = "export-stdcall",
    all(target_os = "windows", target_arch = "x86", not(feature = "export-cdecl"))
))]
macro_rules! export_fn {
    (
        $(#[$meta:meta])*
        pub unsafe fn $name:ident($($arg:ident : $ty:ty),* $(,)?) $(-> $ret:ty)? $body:block
    ) => {
        $(#[$meta])*
        #[cfg_attr(
            any(feature = "export-symbols", feature = "extern-c-only"),
            unsafe(no_mangle)
        )]
        pub unsafe extern "stdcall" fn $name($($arg: $ty),*) $(-> $ret)? $body
    };
}

#[cfg(not(any(
    feature = "export-stdcall",
    all(target_os = "windows", target_arch = "x86", not(feature = "export-cdecl"))
)))]
macro_rules! export_fn {
    (
        $(#[$meta:meta])*
        pub unsafe fn $name:ident($($arg:ident : $ty:ty),* $(,)?) $(-> $ret:ty)? $body:block
    ) => {
        $(#[$meta])*
        #[cfg_attr(
            any(feature = "export-symbols", feature = "extern-c-only"),
            unsafe(no_mangle)
        )]
        pub unsafe extern "C" fn $name($($arg: $ty),*) $(-> $ret)? $body
    };
}

/// Convention `export_fn!` applied in this build.
const APPLIED_CONVENTION: Convention = if cfg!(any(
    feature = "export-stdcall",
    all(target_os = "windows", target_arch = "x86", not(feature = "export-cdecl"))
)) {
    Convention::Stdcall
} else {
    Convention::C
};

// ── Profile model ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Os {
    Windows,
    Apple,
    /// Any other Unix.
    Unix,
    /// Bare metal or an unrecognised OS.
    Freestanding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arch {
    X86,
    X86_64,
    Aarch64,
    Arm,
    PowerPc,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub os: Os,
    pub arch: Arch,
}

impl Target {
    pub const CURRENT: Target = Target {
        os: if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_vendor = "apple") {
            Os::Apple
        } else if cfg!(unix) {
            Os::Unix
        } else {
            Os::Freestanding
        },
        arch: if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "x86_64") {
            Arch::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else if cfg!(target_arch = "arm") {
            Arch::Arm
        } else if cfg!(any(target_arch = "powerpc", target_arch = "powerpc64")) {
            Arch::PowerPc
        } else {
            Arch::Other
        },
    };
}

/// Build-time switches, one per cargo feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Overrides {
    pub export_symbols: bool,
    pub cdecl: bool,
    pub stdcall: bool,
    pub extern_c_only: bool,
}

impl Overrides {
    pub const ACTIVE: Overrides = Overrides {
        export_symbols: cfg!(feature = "export-symbols"),
        cdecl: cfg!(feature = "export-cdecl"),
        stdcall: cfg!(feature = "export-stdcall"),
        extern_c_only: cfg!(feature = "extern-c-only"),
    };

    /// Shared-library defaults: exported symbols, no overrides.
    pub const SHARED: Overrides = Overrides {
        export_symbols: true,
        cdecl: false,
        stdcall: false,
        extern_c_only: false,
    };
}

/// How a boundary symbol is made visible to the linker, as the platform
/// ladder names it.
///
/// `export_fn!` emits every variant except `Mangled` identically, as an
/// unmangled `pub extern` function; rustc exports those from a `cdylib` on
/// every target. `DllExport`, `Visible` and `PlainC` therefore record the
/// target's C-header linkage and do not change the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// C linkage, exported from the DLL.
    DllExport,
    /// C linkage, default ELF/Mach-O visibility.
    Visible,
    /// C linkage with no export annotation.
    PlainC,
    /// Rust-mangled; the functions are only reachable through the rlib.
    Mangled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Convention {
    C,
    Stdcall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    UnsupportedPlatform,
    ConflictingConventions,
    StdcallRequiresX86,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UnsupportedPlatform => "unsupported platform",
            Self::ConflictingConventions => "both cdecl and stdcall requested",
            Self::StdcallRequiresX86 => "stdcall requested on a non-x86 target",
        })
    }
}

impl std::error::Error for ResolveError {}

/// Linkage and calling convention of every boundary function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProfile {
    pub linkage: Linkage,
    pub convention: Convention,
}

impl ExportProfile {
    pub const fn resolve(target: Target, overrides: Overrides) -> Result<Self, ResolveError> {
        if overrides.cdecl && overrides.stdcall {
            return Err(ResolveError::ConflictingConventions);
        }

        // Platform ladder: (linkage when exporting, native convention).
        let (exported, native) = match (target.os, target.arch) {
            (Os::Windows, Arch::X86) => (Linkage::DllExport, Convention::Stdcall),
            (Os::Windows, _) => (Linkage::DllExport, Convention::C),
            (Os::Apple, _) | (Os::Unix, _) => (Linkage::Visible, Convention::C),
            (Os::Freestanding, Arch::PowerPc) => (Linkage::PlainC, Convention::C),
            (Os::Freestanding, _) => return Err(ResolveError::UnsupportedPlatform),
        };

        let convention = if overrides.stdcall {
            if !matches!(target.arch, Arch::X86) {
                return Err(ResolveError::StdcallRequiresX86);
            }
            Convention::Stdcall
        } else if overrides.cdecl {
            Convention::C
        } else {
            native
        };

        let linkage = if overrides.extern_c_only {
            Linkage::PlainC
        } else if overrides.export_symbols {
            exported
        } else {
            Linkage::Mangled
        };

        Ok(Self { linkage, convention })
    }

    pub const ACTIVE: ExportProfile = match Self::resolve(Target::CURRENT, Overrides::ACTIVE) {
        Ok(profile) => profile,
        Err(ResolveError::UnsupportedPlatform) => panic!("no export profile for this target"),
        Err(ResolveError::ConflictingConventions) => panic!("conflicting calling conventions"),
        Err(ResolveError::StdcallRequiresX86) => panic!("stdcall requires x86"),
    };

    /// Whether boundary functions carry unmangled C symbols.
    pub const fn unmangled(self) -> bool {
        !matches!(self.linkage, Linkage::Mangled)
    }
}

const _: () = assert!(
    matches!(
        (ExportProfile::ACTIVE.convention, APPLIED_CONVENTION),
        (Convention::C, Convention::C) | (Convention::Stdcall, Convention::Stdcall)
    ),
    "export profile disagrees with the ABI export_fn! applied"
);

const _: () = assert!(
    ExportProfile::ACTIVE.unmangled()
        == cfg!(any(feature = "export-symbols", feature = "extern-c-only")),
    "export profile disagrees with the symbol mangling export_fn! applied"
);

// ── Freestanding PowerPC ────────────────────────────────────────────

/// Assertion handler for targets without a C runtime: `void __assert(const
/// char *error)`. Halts.
#[cfg(all(
    feature = "freestanding-assert",
    any(target_arch = "powerpc", target_arch = "powerpc64")
))]
#[unsafe(no_mangle)]
pub extern "C" fn __assert(_error: *const std::ffi::c_char) -> ! {
    loop {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(os: Os, arch: Arch) -> Target {
        Target { os, arch }
    }

    #[test]
    fn active_profile_matches_applied_abi() {
        assert_eq!(ExportProfile::ACTIVE.convention, APPLIED_CONVENTION);
        assert_eq!(
            ExportProfile::resolve(Target::CURRENT, Overrides::ACTIVE),
            Ok(ExportProfile::ACTIVE)
        );
    }

    #[test]
    fn exported_linkages_share_one_symbol_form() {
        // Every exported linkage is emitted as the same unmangled symbol.
        for (os, arch, overrides) in [
            (Os::Windows, Arch::X86_64, Overrides::SHARED),
            (Os::Unix, Arch::Aarch64, Overrides::SHARED),
            (Os::Windows, Arch::X86_64, Overrides { extern_c_only: true, ..Overrides::SHARED }),
        ] {
            let profile = ExportProfile::resolve(target(os, arch), overrides).unwrap();
            assert_ne!(profile.linkage, Linkage::Mangled);
            assert!(profile.unmangled());
        }
    }

    #[test]
    fn contradictory_overrides_fail() {
        let both = Overrides { cdecl: true, stdcall: true, ..Overrides::SHARED };
        assert_eq!(
            ExportProfile::resolve(target(Os::Windows, Arch::X86), both),
            Err(ResolveError::ConflictingConventions)
        );
    }
}
