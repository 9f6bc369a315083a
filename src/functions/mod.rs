use itertools::Itertools;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{CallerContext, Environment};

/// A named caller lookup, dispatched by the name the host uses for it.
pub trait Query: Send + Sync {
    fn name(&self) -> &'static str;
    fn call(&self, caller: Option<&CallerContext>, env: &Environment) -> Value;
}

/// Thread-safe query registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Query>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for query in builtins::all() {
            let map = Arc::make_mut(&mut registry.inner);
            map.insert(query.name(), query);
        }
        registry
    }

    pub fn register<Q: Query + 'static>(&mut self, q: Q) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(q.name(), Arc::new(q));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Query>> {
        self.inner.get(name).cloned()
    }

    /// Registered names in stable order.
    pub fn names(&self) -> Vec<&'static str> {
        self.inner.keys().copied().sorted().collect()
    }
}

pub mod builtins {
    use super::*;
    use crate::engine;

    /// Lookup backed by a plain function over the caller and environment.
    pub struct Lookup {
        name: &'static str,
        f: fn(Option<&CallerContext>, &Environment) -> Value,
    }

    impl Query for Lookup {
        fn name(&self) -> &'static str { self.name }
        fn call(&self, caller: Option<&CallerContext>, env: &Environment) -> Value {
            (self.f)(caller, env)
        }
    }

    fn lookup(name: &'static str, f: fn(Option<&CallerContext>, &Environment) -> Value) -> Arc<dyn Query> {
        Arc::new(Lookup { name, f })
    }

    pub fn all() -> Vec<Arc<dyn Query>> {
        vec![
            lookup("bundler", |c, _| {
                engine::resolve_bundler(c).map_or(Value::Null, |b| Value::from(b.as_str()))
            }),
            lookup("platform", |c, _| {
                engine::resolve_platform(c).map_or(Value::Null, Value::from)
            }),
            lookup("projectRoot", |c, env| {
                engine::resolve_project_root(c, env).map_or(Value::Null, Value::from)
            }),
            lookup("isReactServer", |c, _| engine::resolve_is_react_server(c).into()),
            lookup("isDev", |c, env| engine::resolve_is_dev(c, env).into()),
            lookup("isProd", |c, env| engine::resolve_is_prod(c, env).into()),
            lookup("isFastRefreshEnabled", |c, env| {
                engine::resolve_is_fast_refresh_enabled(c, env).into()
            }),
            lookup("isNodeModule", |c, _| engine::resolve_is_node_module(c).into()),
            lookup("baseUrl", |c, _| engine::resolve_base_url(c).into()),
            lookup("reactCompiler", |c, _| engine::resolve_react_compiler_support(c).into()),
            lookup("isServer", |c, _| engine::resolve_is_server(c).into()),
            lookup("routerAppRoot", |c, env| engine::resolve_router_app_root(c, env).into()),
            lookup("inlineEnvVarsEnabled", |c, env| {
                engine::resolve_inline_env_vars_enabled(c, env).into()
            }),
            lookup("asyncRoutes", |c, env| engine::resolve_async_routes(c, env).into()),
        ]
    }
}
