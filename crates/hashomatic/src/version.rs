//! Version information for hashomatic.

/// hashomatic version from Cargo.toml
pub const HASHOMATIC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version information reported by the health check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    pub hashomatic: &'static str,
    /// Build identifier supplied by the packaging pipeline, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            hashomatic: HASHOMATIC_VERSION,
            build: None,
        }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build(mut self, build: String) -> Self {
        self.build = Some(build);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_info_has_crate_version() {
        let info = VersionInfo::new();
        assert_eq!(info.hashomatic, HASHOMATIC_VERSION);
        assert!(info.build.is_none());
    }

    #[test]
    fn version_info_serializes_minimal() {
        let info = VersionInfo {
            hashomatic: "0.1.0",
            build: None,
        };
        insta::assert_json_snapshot!(info, @r#"
        {
          "hashomatic": "0.1.0"
        }
        "#);
    }

    #[test]
    fn version_info_serializes_build() {
        let info = VersionInfo {
            hashomatic: "0.1.0",
            build: None,
        }
        .with_build("abc123".to_string());
        insta::assert_json_snapshot!(info, @r#"
        {
          "hashomatic": "0.1.0",
          "build": "abc123"
        }
        "#);
    }
}
