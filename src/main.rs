use std::path::PathBuf;

use caller_context_resolver::{CallerContext, Environment, ModuleProbe, Resolver};
use clap::{Parser, Subcommand};
use serde_json::Value;

/// Inspect how a bundler caller object resolves to build decisions.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Override BABEL_ENV
    #[arg(long, global = true)]
    babel_env: Option<String>,
    /// Override NODE_ENV
    #[arg(long, global = true)]
    node_env: Option<String>,
    /// Override EXPO_PROJECT_ROOT
    #[arg(long, global = true)]
    project_root: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every decision for a caller
    Resolve {
        /// Caller JSON object; omit for an absent caller
        #[arg(long)]
        caller: Option<String>,
    },
    /// Print a single named lookup
    Query {
        name: String,
        #[arg(long)]
        caller: Option<String>,
    },
    /// Check whether a module can be resolved
    HasModule {
        name: String,
        /// Directory to resolve from (defaults to the working directory)
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// List lookup names usable with `query`
    List,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // CLI flags layer over the process environment.
    let mut env = Environment::from_process();
    if let Some(v) = args.babel_env { env = env.with_babel_env(v); }
    if let Some(v) = args.node_env { env = env.with_node_env(v); }
    if let Some(v) = args.project_root { env = env.with_project_root(v); }
    let resolver = Resolver::new(env);

    let out: Value = match args.command {
        Command::Resolve { caller } => {
            let caller = parse_caller(caller.as_deref());
            let resolved = resolver.resolve(caller.as_ref());
            serde_json::to_value(resolved).unwrap_or(Value::Null)
        }
        Command::Query { name, caller } => {
            let caller = parse_caller(caller.as_deref());
            match resolver.query(&name, caller.as_ref()) {
                Ok(v) => v,
                Err(e) => fail(e),
            }
        }
        Command::HasModule { name, from } => {
            let probe = match from {
                Some(dir) => ModuleProbe::new(dir),
                None => ModuleProbe::from_current_dir().unwrap_or_else(|e| fail(e)),
            };
            match probe.has_module(&name) {
                Ok(found) => Value::Bool(found),
                Err(e) => fail(e),
            }
        }
        Command::List => Value::from(resolver.registry().names()),
    };

    // Output result.
    match serde_json::to_string_pretty(&out) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(e),
    }
}

fn parse_caller(raw: Option<&str>) -> Option<CallerContext> {
    let raw = raw?;
    match CallerContext::from_json(raw) {
        Ok(c) => Some(c),
        Err(e) => fail(e),
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("error: {e}");
    std::process::exit(1);
}
