//! resembed - embeds one raw file as linkable data symbols.
//!
//! The manifest-free counterpart to rescomp: no scanning, no decorated
//! names. The file's bytes are exported under a caller-chosen
//! C-linkage symbol (length under `<NAME>_size`), producing an object,
//! a single-member archive, and a companion header declaring both.

use std::path::PathBuf;

use clap::Parser;
use rescomp_compiler::{embed, EmbedOptions};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "resembed")]
#[command(about = "Embed one file as C-linkage data symbols in an object, archive and header")]
struct Cli {
    /// File whose bytes are embedded
    input: PathBuf,

    /// C identifier for the byte array; the length is exported as
    /// `<SYMBOL>_size`
    symbol: String,

    /// Target architecture (default: host)
    #[arg(short = 'm', long = "march", value_name = "NAME")]
    march: Option<String>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resembed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let opts = EmbedOptions {
        input: cli.input,
        symbol: cli.symbol,
        march: cli.march,
    };

    match embed(&opts) {
        Ok(summary) => info!(
            object = %summary.object.display(),
            archive = %summary.archive.display(),
            header = %summary.header.display(),
            "embedded"
        ),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
