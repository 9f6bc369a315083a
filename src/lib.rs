pub mod errors;
pub mod context;
pub mod engine;     // individual caller lookups
pub mod functions;  // lookups addressable by name
pub mod probe;

use serde::Serialize;
use serde_json::Value;
use errors::{Result, ResolveError};
use functions::Registry;

pub use context::{Bundler, CallerContext, Environment};
pub use probe::{has_module, ModuleProbe};

/// Every decision derived from one caller, as handed to downstream transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCaller {
    pub bundler: Option<Bundler>,
    pub platform: Option<String>,
    pub project_root: Option<String>,
    pub is_react_server: bool,
    pub is_dev: bool,
    pub is_prod: bool,
    pub is_fast_refresh_enabled: bool,
    pub is_node_module: bool,
    pub base_url: String,
    pub react_compiler: bool,
    pub is_server: bool,
    pub router_app_root: String,
    pub inline_env_vars_enabled: bool,
    pub async_routes: bool,
}

/// The resolver. Holds the environment snapshot lookups fall back on, so
/// every answer is a function of (caller, environment) only.
pub struct Resolver {
    env: Environment,
    registry: Registry,
}

impl Resolver {
    pub fn new(env: Environment) -> Self {
        Self { env, registry: Registry::with_builtins() }
    }

    pub fn with_registry(env: Environment, registry: Registry) -> Self {
        Self { env, registry }
    }

    /// Resolver over the current process environment.
    pub fn from_process() -> Self {
        Self::new(Environment::from_process())
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Evaluate a registered lookup by name.
    pub fn query(&self, name: &str, caller: Option<&CallerContext>) -> Result<Value> {
        let query = self
            .registry
            .get(name)
            .ok_or_else(|| ResolveError::UnknownQuery(name.to_string()))?;
        Ok(query.call(caller, &self.env))
    }

    /// Resolve everything at once.
    pub fn resolve(&self, caller: Option<&CallerContext>) -> ResolvedCaller {
        let env = &self.env;
        ResolvedCaller {
            bundler: engine::resolve_bundler(caller),
            platform: engine::resolve_platform(caller),
            project_root: engine::resolve_project_root(caller, env),
            is_react_server: engine::resolve_is_react_server(caller),
            is_dev: engine::resolve_is_dev(caller, env),
            is_prod: engine::resolve_is_prod(caller, env),
            is_fast_refresh_enabled: engine::resolve_is_fast_refresh_enabled(caller, env),
            is_node_module: engine::resolve_is_node_module(caller),
            base_url: engine::resolve_base_url(caller),
            react_compiler: engine::resolve_react_compiler_support(caller),
            is_server: engine::resolve_is_server(caller),
            router_app_root: engine::resolve_router_app_root(caller, env),
            inline_env_vars_enabled: engine::resolve_inline_env_vars_enabled(caller, env),
            async_routes: engine::resolve_async_routes(caller, env),
        }
    }
}

/// Convenience: resolve a caller JSON object against the process environment.
pub fn resolve(caller_json: &str) -> Result<ResolvedCaller> {
    let caller = CallerContext::from_json(caller_json)?;
    Ok(Resolver::from_process().resolve(Some(&caller)))
}
