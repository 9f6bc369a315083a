use std::path::{Component, Path, PathBuf};

use crate::context::{Bundler, CallerContext, Environment};

// =========================
// Caller lookups
// =========================

/// Caller names of tools that drive the transpiler through webpack's `babel-loader`:
/// `babel-loader` itself, and the custom loader name used by Next.js 11.
const WEBPACK_CALLER_NAMES: [&str; 2] = ["babel-loader", "next-babel-turbo-loader"];

/// Route root used when the caller does not name one.
pub const DEFAULT_ROUTER_ROOT: &str = "./app";

/// Empty strings count as unset, matching how bundlers leave fields blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Determine which bundler is being used.
pub fn resolve_bundler(caller: Option<&CallerContext>) -> Option<Bundler> {
    let caller = caller?;
    if let Some(bundler) = caller.bundler {
        return Some(bundler);
    }
    if present(&caller.name).is_some_and(|name| WEBPACK_CALLER_NAMES.contains(&name)) {
        tracing::trace!(name = ?caller.name, "inferred webpack from caller name");
        return Some(Bundler::Webpack);
    }
    // Anything else is assumed to be Metro.
    Some(Bundler::Metro)
}

/// Target platform; webpack builds are always web.
pub fn resolve_platform(caller: Option<&CallerContext>) -> Option<String> {
    let ctx = caller?;
    if let Some(platform) = present(&ctx.platform) {
        return Some(platform.to_string());
    }
    if resolve_bundler(caller) == Some(Bundler::Webpack) {
        return Some("web".to_string());
    }
    // unknown
    ctx.platform.clone()
}

pub fn resolve_project_root(caller: Option<&CallerContext>, env: &Environment) -> Option<String> {
    let caller = caller?;
    if let Some(root) = present(&caller.project_root) {
        return Some(root.to_string());
    }
    tracing::trace!(root = ?env.project_root, "project root from environment");
    env.project_root.clone()
}

/// If bundling for a react-server target.
pub fn resolve_is_react_server(caller: Option<&CallerContext>) -> bool {
    caller.and_then(|c| c.is_react_server).unwrap_or(false)
}

pub fn resolve_is_dev(caller: Option<&CallerContext>, env: &Environment) -> bool {
    match caller.and_then(|c| c.is_dev) {
        Some(is_dev) => is_dev,
        None => env.mode_is("development"),
    }
}

/// Not the negation of [`resolve_is_dev`]: with no explicit flag and no
/// build-mode variables set, both report `false`.
pub fn resolve_is_prod(caller: Option<&CallerContext>, env: &Environment) -> bool {
    match caller.and_then(|c| c.is_dev) {
        Some(is_dev) => !is_dev,
        None => env.mode_is("production"),
    }
}

pub fn resolve_is_fast_refresh_enabled(caller: Option<&CallerContext>, env: &Environment) -> bool {
    let Some(ctx) = caller else {
        return false;
    };
    ctx.is_hmr_enabled.unwrap_or(false)
        && !ctx.is_server.unwrap_or(false)
        && !ctx.is_node_module.unwrap_or(false)
        && resolve_is_dev(caller, env)
}

pub fn resolve_is_node_module(caller: Option<&CallerContext>) -> bool {
    caller.and_then(|c| c.is_node_module).unwrap_or(false)
}

pub fn resolve_base_url(caller: Option<&CallerContext>) -> String {
    caller.and_then(|c| c.base_url.clone()).unwrap_or_default()
}

pub fn resolve_react_compiler_support(caller: Option<&CallerContext>) -> bool {
    caller.and_then(|c| c.supports_react_compiler).unwrap_or(false)
}

pub fn resolve_is_server(caller: Option<&CallerContext>) -> bool {
    caller.and_then(|c| c.is_server).unwrap_or(false)
}

/// Absolute directory holding the app's routes.
///
/// The join is folded lexically and drops any trailing slash, so `app/` and
/// `app` resolve to the same string.
pub fn resolve_router_app_root(caller: Option<&CallerContext>, env: &Environment) -> String {
    let root_module = caller
        .and_then(|c| c.router_root.as_deref())
        .unwrap_or(DEFAULT_ROUTER_ROOT);
    if Path::new(root_module).is_absolute() {
        return root_module.to_string();
    }
    let project_root = resolve_project_root(caller, env)
        .filter(|root| !root.is_empty())
        .unwrap_or_else(|| "/".to_string());
    join_normalized(&project_root, root_module)
}

pub fn resolve_inline_env_vars_enabled(caller: Option<&CallerContext>, env: &Environment) -> bool {
    let is_webpack = resolve_bundler(caller) == Some(Bundler::Webpack);
    let preserve_env_vars = caller.and_then(|c| c.preserve_env_vars).unwrap_or(false);
    // Dev builds get env vars from the serializer; servers read them at runtime.
    !resolve_is_node_module(caller)
        && !is_webpack
        && !resolve_is_dev(caller, env)
        && !resolve_is_server(caller)
        && !preserve_env_vars
}

pub fn resolve_async_routes(caller: Option<&CallerContext>, env: &Environment) -> bool {
    if resolve_is_server(caller) {
        return false;
    }
    let is_prod = resolve_is_prod(caller, env);
    if is_prod && resolve_platform(caller).as_deref() != Some("web") {
        tracing::debug!("async routes disabled for native production build");
        return false;
    }
    caller.and_then(|c| c.async_routes).unwrap_or(false)
}

/// Join `rel` onto `base` and fold `.`/`..` segments lexically.
fn join_normalized(base: &str, rel: &str) -> String {
    let mut out = PathBuf::new();
    for component in Path::new(base).join(rel).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        ".".to_string()
    } else {
        out.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn caller(json: &str) -> CallerContext {
        CallerContext::from_json(json).unwrap()
    }

    #[test]
    fn absent_caller_degrades_to_defaults() {
        let env = Environment::new();
        assert_eq!(resolve_bundler(None), None);
        assert_eq!(resolve_platform(None), None);
        assert_eq!(resolve_project_root(None, &env), None);
        assert!(!resolve_is_react_server(None));
        assert!(!resolve_is_dev(None, &env));
        assert!(!resolve_is_prod(None, &env));
        assert!(!resolve_is_fast_refresh_enabled(None, &env));
        assert!(!resolve_is_node_module(None));
        assert_eq!(resolve_base_url(None), "");
        assert!(!resolve_react_compiler_support(None));
        assert!(!resolve_is_server(None));
        assert_eq!(resolve_router_app_root(None, &env), "/app");
        assert!(!resolve_async_routes(None, &env));
    }

    #[test]
    fn bundler_inference() {
        let explicit = caller(r#"{"bundler":"metro","name":"babel-loader"}"#);
        assert_eq!(resolve_bundler(Some(&explicit)), Some(Bundler::Metro));

        for name in ["babel-loader", "next-babel-turbo-loader"] {
            let c = CallerContext { name: Some(name.into()), ..Default::default() };
            assert_eq!(resolve_bundler(Some(&c)), Some(Bundler::Webpack));
        }

        let blank = caller(r#"{"bundler":"","name":"babel-loader"}"#);
        assert_eq!(resolve_bundler(Some(&blank)), Some(Bundler::Webpack));
        assert_eq!(resolve_platform(Some(&blank)).as_deref(), Some("web"));

        let other = caller(r#"{"name":"metro-transformer"}"#);
        assert_eq!(resolve_bundler(Some(&other)), Some(Bundler::Metro));
        assert_eq!(resolve_bundler(Some(&CallerContext::default())), Some(Bundler::Metro));
    }

    #[test]
    fn platform_falls_back_to_web_for_webpack() {
        let webpack = caller(r#"{"name":"babel-loader"}"#);
        assert_eq!(resolve_platform(Some(&webpack)).as_deref(), Some("web"));

        let explicit = caller(r#"{"name":"babel-loader","platform":"ios"}"#);
        assert_eq!(resolve_platform(Some(&explicit)).as_deref(), Some("ios"));

        let metro = caller(r#"{"bundler":"metro"}"#);
        assert_eq!(resolve_platform(Some(&metro)), None);

        let blank = caller(r#"{"bundler":"metro","platform":""}"#);
        assert_eq!(resolve_platform(Some(&blank)).as_deref(), Some(""));
    }

    #[test]
    fn project_root_prefers_caller_then_env() {
        let env = Environment::new().with_project_root("/from-env");
        let explicit = caller(r#"{"projectRoot":"/proj"}"#);
        assert_eq!(resolve_project_root(Some(&explicit), &env).as_deref(), Some("/proj"));

        let blank = caller(r#"{"projectRoot":""}"#);
        assert_eq!(resolve_project_root(Some(&blank), &env).as_deref(), Some("/from-env"));
        assert_eq!(resolve_project_root(Some(&blank), &Environment::new()), None);
    }

    #[test]
    fn dev_and_prod_from_environment() {
        let c = CallerContext::default();
        let dev = Environment::new().with_babel_env("development");
        assert!(resolve_is_dev(Some(&c), &dev));
        assert!(!resolve_is_prod(Some(&c), &dev));

        let prod = Environment::new().with_node_env("production");
        assert!(!resolve_is_dev(Some(&c), &prod));
        assert!(resolve_is_prod(Some(&c), &prod));

        // Contradictory variables: each check only looks for its own mode.
        let both = Environment::new()
            .with_babel_env("development")
            .with_node_env("production");
        assert!(resolve_is_dev(Some(&c), &both));
        assert!(resolve_is_prod(Some(&c), &both));

        let unset = Environment::new();
        assert!(!resolve_is_dev(Some(&c), &unset));
        assert!(!resolve_is_prod(Some(&c), &unset));
    }

    #[test]
    fn explicit_is_dev_overrides_environment() {
        let env = Environment::new().with_node_env("production");
        let c = caller(r#"{"isDev":true}"#);
        assert!(resolve_is_dev(Some(&c), &env));
        assert!(!resolve_is_prod(Some(&c), &env));
    }

    #[test]
    fn fast_refresh_requires_dev_client_app_code() {
        let env = Environment::new();
        let on = caller(r#"{"isHMREnabled":true,"isDev":true}"#);
        assert!(resolve_is_fast_refresh_enabled(Some(&on), &env));

        let server = caller(r#"{"isHMREnabled":true,"isDev":true,"isServer":true}"#);
        assert!(!resolve_is_fast_refresh_enabled(Some(&server), &env));

        let dep = caller(r#"{"isHMREnabled":true,"isDev":true,"isNodeModule":true}"#);
        assert!(!resolve_is_fast_refresh_enabled(Some(&dep), &env));

        let prod = caller(r#"{"isHMREnabled":true,"isDev":false}"#);
        assert!(!resolve_is_fast_refresh_enabled(Some(&prod), &env));

        let no_hmr = caller(r#"{"isDev":true}"#);
        assert!(!resolve_is_fast_refresh_enabled(Some(&no_hmr), &env));
    }

    #[test]
    fn router_app_root() {
        let env = Environment::new();
        let absolute = caller(r#"{"routerRoot":"/abs/app","projectRoot":"/proj"}"#);
        assert_eq!(resolve_router_app_root(Some(&absolute), &env), "/abs/app");

        let default = caller(r#"{"projectRoot":"/proj"}"#);
        assert_eq!(resolve_router_app_root(Some(&default), &env), "/proj/app");

        let trailing = caller(r#"{"routerRoot":"app/","projectRoot":"/proj"}"#);
        assert_eq!(resolve_router_app_root(Some(&trailing), &env), "/proj/app");

        let nested = caller(r#"{"routerRoot":"../shared/./routes","projectRoot":"/work/proj"}"#);
        assert_eq!(resolve_router_app_root(Some(&nested), &env), "/work/shared/routes");

        let from_env = Environment::new().with_project_root("/env-root");
        let unrooted = caller(r#"{"routerRoot":"src/app"}"#);
        assert_eq!(resolve_router_app_root(Some(&unrooted), &from_env), "/env-root/src/app");
        assert_eq!(resolve_router_app_root(Some(&unrooted), &env), "/src/app");
    }

    #[test]
    fn join_normalized_folds_segments() {
        assert_eq!(join_normalized("/", "./app"), "/app");
        assert_eq!(join_normalized("/", "../../app"), "/app");
        assert_eq!(join_normalized("proj", "../../app"), "../app");
        assert_eq!(join_normalized("proj", ".."), ".");
    }

    #[test]
    fn inline_env_vars_only_for_production_app_code() {
        let env = Environment::new();
        let prod = caller(r#"{"isDev":false,"isServer":false,"isNodeModule":false}"#);
        assert!(resolve_inline_env_vars_enabled(Some(&prod), &env));

        let preserved = caller(
            r#"{"isDev":false,"isServer":false,"isNodeModule":false,"preserveEnvVars":true}"#,
        );
        assert!(!resolve_inline_env_vars_enabled(Some(&preserved), &env));

        let webpack = caller(r#"{"isDev":false,"name":"babel-loader"}"#);
        assert!(!resolve_inline_env_vars_enabled(Some(&webpack), &env));

        let server = caller(r#"{"isDev":false,"isServer":true}"#);
        assert!(!resolve_inline_env_vars_enabled(Some(&server), &env));

        let dev = caller(r#"{"isDev":true}"#);
        assert!(!resolve_inline_env_vars_enabled(Some(&dev), &env));

        let dep = caller(r#"{"isDev":false,"isNodeModule":true}"#);
        assert!(!resolve_inline_env_vars_enabled(Some(&dep), &env));
    }

    #[test]
    fn async_routes_rules() {
        let env = Environment::new();
        let server = caller(r#"{"isServer":true,"asyncRoutes":true,"platform":"web","isDev":true}"#);
        assert!(!resolve_async_routes(Some(&server), &env));

        let native_prod = caller(r#"{"isServer":false,"platform":"ios","isDev":false,"asyncRoutes":true}"#);
        assert!(!resolve_async_routes(Some(&native_prod), &env));

        let web_prod = caller(r#"{"platform":"web","isDev":false,"asyncRoutes":true}"#);
        assert!(resolve_async_routes(Some(&web_prod), &env));

        let native_dev = caller(r#"{"platform":"android","isDev":true,"asyncRoutes":true}"#);
        assert!(resolve_async_routes(Some(&native_dev), &env));

        let unset = caller(r#"{"platform":"web","isDev":false}"#);
        assert!(!resolve_async_routes(Some(&unset), &env));
    }
}
