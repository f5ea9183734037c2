//! rescomp - compiles resource manifests into linkable artifacts.
//!
//! Scans the given manifest units for resource bindings, embeds each
//! bound file as exported data symbols, and writes a relocatable
//! object (`-o out.o`) or a static archive (`-o out.a`).

use std::path::PathBuf;

use clap::Parser;
use rescomp_compiler::{compile, Options, UnitSource};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rescomp")]
#[command(about = "Compile resource bindings into a native object or static archive")]
struct Cli {
    /// Input manifest units (.res), or headers (.resh) to be wrapped
    /// in a synthesized including unit
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output path; .o/.obj emits an object file, .a/.lib an archive
    #[arg(short = 'o', value_name = "PATH")]
    output: PathBuf,

    /// Target architecture (default: host)
    #[arg(short = 'm', long = "march", value_name = "NAME")]
    march: Option<String>,

    /// Resource search directory, tried in the order given (repeatable)
    #[arg(short = 'R', value_name = "DIR")]
    resource_dirs: Vec<PathBuf>,

    /// Include directory for the manifest front end (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Qualified template name recognized as a resource binding
    #[arg(long, default_value = "resman::Resource", value_name = "PATH")]
    template: String,
}

/// Headers only become scannable once wrapped in a unit that includes
/// them, so each `.resh` input is mapped to a synthesized one-line
/// including unit.
fn to_unit_source(input: &PathBuf) -> UnitSource {
    let is_header = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("resh"));
    if !is_header {
        return UnitSource::from_file(input.clone());
    }

    let absolute = input
        .canonicalize()
        .unwrap_or_else(|_| input.clone());
    UnitSource::synthetic(
        input.with_extension("res"),
        format!("include \"{}\";\n", absolute.display()),
    )
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rescomp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut opts = Options::new(
        cli.inputs.iter().map(to_unit_source).collect(),
        cli.output,
    );
    opts.march = cli.march;
    opts.resource_dirs = cli.resource_dirs;
    opts.include_dirs = cli.include_dirs;
    opts.template = cli.template.split("::").map(str::to_owned).collect();

    if let Err(errors) = compile(&opts) {
        for e in &errors {
            error!("{e}");
        }
        std::process::exit(1);
    }
}
