//! Host runtime version and the capability flags derived from it.
//!
//! Version-dependent behavior is resolved once into [`Capabilities`] so the
//! hook itself never branches on version numbers.

use interpose_proto::HookEra;
use semver::Version;

/// The host runtime the hook is installed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub version: Version,
    pub windows: bool,
}

impl RuntimeInfo {
    #[must_use]
    pub fn new(version: Version, windows: bool) -> Self {
        Self { version, windows }
    }

    /// Parse a host version string such as `v16.17.0` or `20.11.1`.
    ///
    /// Pre-release and build suffixes are accepted; missing minor/patch
    /// components default to zero.
    pub fn parse(version: &str, windows: bool) -> Result<Self, semver::Error> {
        let trimmed = version.trim().trim_start_matches('v');
        let parsed = match Version::parse(trimmed) {
            Ok(v) => v,
            Err(err) => {
                let mut parts = trimmed.split('.');
                let major = parts.next().and_then(|p| p.parse().ok());
                let minor = parts.next().map_or(Some(0), |p| p.parse().ok());
                match (major, minor, parts.next()) {
                    (Some(major), Some(minor), None) => Version::new(major, minor, 0),
                    _ => return Err(err),
                }
            }
        };
        Ok(Self::new(parsed, windows))
    }

    /// Resolve this runtime into its capability table.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_runtime(self)
    }
}

/// When marking must prepend `file:` so the host accepts the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSchemePolicy {
    /// Never add a scheme.
    Never,
    /// Add unless the identifier already uses `file:`.
    UnlessFile,
    /// Add unless the identifier uses `file:` or `node:`.
    UnlessFileOrBuiltin,
}

impl FileSchemePolicy {
    /// Whether an identifier with the given scheme (without the colon)
    /// needs the `file:` prefix.
    #[must_use]
    pub fn needs_prefix(&self, scheme: &str) -> bool {
        match self {
            Self::Never => false,
            Self::UnlessFile => scheme != "file",
            Self::UnlessFileOrBuiltin => scheme != "file" && scheme != "node",
        }
    }
}

/// One row of the version table. Rows are checked in order; the first match
/// wins.
struct PolicyRow {
    major: u64,
    minor_from: u64,
    policy: FileSchemePolicy,
}

/// Exact-major rows. Majors below 18 not listed here use `UnlessFile`.
const FILE_SCHEME_TABLE: &[PolicyRow] = &[
    PolicyRow {
        major: 16,
        minor_from: 17,
        policy: FileSchemePolicy::UnlessFileOrBuiltin,
    },
    PolicyRow {
        major: 17,
        minor_from: 0,
        policy: FileSchemePolicy::UnlessFile,
    },
];

/// Capability flags for one host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Host calls `load` instead of `getSource`/`getFormat`.
    pub has_modern_load_hook: bool,
    /// Host can list a module's exports without evaluating it.
    pub supports_native_enumeration: bool,
    /// Scheme prefixing policy for marked identifiers.
    pub file_scheme: FileSchemePolicy,
    /// Host runs on Windows.
    pub windows: bool,
}

impl Capabilities {
    #[must_use]
    pub fn for_runtime(runtime: &RuntimeInfo) -> Self {
        let major = runtime.version.major;
        let minor = runtime.version.minor;

        let file_scheme = FILE_SCHEME_TABLE
            .iter()
            .find(|row| row.major == major && minor >= row.minor_from)
            .map_or(
                if major < 18 {
                    FileSchemePolicy::UnlessFile
                } else {
                    FileSchemePolicy::Never
                },
                |row| row.policy,
            );

        Self {
            has_modern_load_hook: major >= 17 || (major == 16 && minor >= 12),
            supports_native_enumeration: major >= 20 || (major == 18 && minor >= 19),
            file_scheme,
            windows: runtime.windows,
        }
    }

    /// Whether unmarking should undo scheme prefixes added while marking.
    #[must_use]
    pub fn normalizes_scheme(&self) -> bool {
        self.file_scheme != FileSchemePolicy::Never
    }

    /// Which hook generation to expose.
    #[must_use]
    pub fn era(&self) -> HookEra {
        if self.has_modern_load_hook {
            HookEra::Modern
        } else {
            HookEra::Legacy
        }
    }
}
