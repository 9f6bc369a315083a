use serde::{de, Deserialize, Deserializer, Serialize};

/// Environment variable names consulted as fallbacks.
pub mod names {
    /// Babel's own build mode: `BABEL_ENV`
    pub const BABEL_ENV: &str = "BABEL_ENV";

    /// General build mode: `NODE_ENV`
    pub const NODE_ENV: &str = "NODE_ENV";

    /// Project root override: `EXPO_PROJECT_ROOT`
    pub const PROJECT_ROOT: &str = "EXPO_PROJECT_ROOT";
}

/// The bundler that invoked the transpiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bundler {
    Metro,
    Webpack,
}

impl Bundler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bundler::Metro => "metro",
            Bundler::Webpack => "webpack",
        }
    }
}

/// Bundlers leave `bundler` blank when they don't set it; treat that as unset
/// so the caller name can still decide.
fn blank_bundler_as_none<'de, D>(deserializer: D) -> Result<Option<Bundler>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some("metro") => Ok(Some(Bundler::Metro)),
        Some("webpack") => Ok(Some(Bundler::Webpack)),
        Some(other) => Err(de::Error::unknown_variant(other, &["metro", "webpack"])),
    }
}

/// Metadata a bundler passes along with every transform call.
///
/// Every field is optional; bundlers fill in what they know. Fields the
/// resolver does not understand are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallerContext {
    #[serde(deserialize_with = "blank_bundler_as_none")]
    pub bundler: Option<Bundler>,
    /// Name of the invoking tool, e.g. `babel-loader`.
    pub name: Option<String>,
    pub platform: Option<String>,
    pub project_root: Option<String>,
    pub is_react_server: Option<bool>,
    pub is_dev: Option<bool>,
    #[serde(rename = "isHMREnabled")]
    pub is_hmr_enabled: Option<bool>,
    pub is_server: Option<bool>,
    pub is_node_module: Option<bool>,
    pub supports_react_compiler: Option<bool>,
    pub preserve_env_vars: Option<bool>,
    pub async_routes: Option<bool>,
    pub base_url: Option<String>,
    /// Router root, relative to the project root unless absolute.
    pub router_root: Option<String>,
}

impl CallerContext {
    /// Parse the JSON object a bundler hands over.
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Snapshot of the process variables the resolver falls back on.
///
/// Passed explicitly so resolution stays a pure function of its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub babel_env: Option<String>,
    pub node_env: Option<String>,
    pub project_root: Option<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current process environment. Variables with non UTF-8 names
    /// are skipped; non UTF-8 values are converted lossily.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            Some((key, value.to_string_lossy().into_owned()))
        }))
    }

    /// Build from arbitrary key/value pairs; unrelated keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut env = Self::default();
        for (key, value) in vars {
            match key.as_ref() {
                names::BABEL_ENV => env.babel_env = Some(value.into()),
                names::NODE_ENV => env.node_env = Some(value.into()),
                names::PROJECT_ROOT => env.project_root = Some(value.into()),
                _ => {}
            }
        }
        env
    }

    pub fn with_babel_env(mut self, value: impl Into<String>) -> Self {
        self.babel_env = Some(value.into());
        self
    }

    pub fn with_node_env(mut self, value: impl Into<String>) -> Self {
        self.node_env = Some(value.into());
        self
    }

    pub fn with_project_root(mut self, value: impl Into<String>) -> Self {
        self.project_root = Some(value.into());
        self
    }

    /// True when either build-mode variable equals `mode`.
    pub(crate) fn mode_is(&self, mode: &str) -> bool {
        self.babel_env.as_deref() == Some(mode) || self.node_env.as_deref() == Some(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bundler_caller_json() {
        let caller = CallerContext::from_json(
            r#"{"name":"metro","bundler":"metro","platform":"ios","isDev":true,
                "isHMREnabled":true,"projectRoot":"/proj","routerRoot":"src/app",
                "somethingElse":42}"#,
        )
        .unwrap();
        assert_eq!(caller.bundler, Some(Bundler::Metro));
        assert_eq!(caller.platform.as_deref(), Some("ios"));
        assert_eq!(caller.is_dev, Some(true));
        assert_eq!(caller.is_hmr_enabled, Some(true));
        assert_eq!(caller.project_root.as_deref(), Some("/proj"));
        assert_eq!(caller.router_root.as_deref(), Some("src/app"));
        assert_eq!(caller.is_server, None);
    }

    #[test]
    fn rejects_unknown_bundler() {
        assert!(CallerContext::from_json(r#"{"bundler":"rollup"}"#).is_err());
        assert!(CallerContext::from_json(r#"{"bundler":7}"#).is_err());
    }

    #[test]
    fn blank_bundler_reads_as_unset() {
        let caller = CallerContext::from_json(r#"{"bundler":"","name":"babel-loader"}"#).unwrap();
        assert_eq!(caller.bundler, None);
        let caller = CallerContext::from_json(r#"{"bundler":null}"#).unwrap();
        assert_eq!(caller.bundler, None);
        let caller = CallerContext::from_json(r#"{"bundler":"webpack"}"#).unwrap();
        assert_eq!(caller.bundler, Some(Bundler::Webpack));
    }

    #[cfg(unix)]
    #[test]
    fn from_process_tolerates_non_utf8_variables() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let unrelated = "CALLER_CONTEXT_RESOLVER_TEST_BYTES";
        std::env::set_var(unrelated, OsString::from_vec(vec![0x66, 0xff, 0x6f]));
        let env = Environment::from_process();
        std::env::remove_var(unrelated);
        assert_eq!(env.babel_env, std::env::var(names::BABEL_ENV).ok());
    }

    #[test]
    fn environment_from_vars_picks_known_keys() {
        let env = Environment::from_vars([
            ("NODE_ENV", "production"),
            ("EXPO_PROJECT_ROOT", "/work"),
            ("HOME", "/root"),
        ]);
        assert_eq!(
            env,
            Environment::new()
                .with_node_env("production")
                .with_project_root("/work")
        );
        assert!(env.mode_is("production"));
        assert!(!env.mode_is("development"));
    }
}
