//! Pyrite Language Server
//!
//! Speaks LSP over stdin/stdout to editors such as VSCode, Neovim, and Zed.

use anyhow::Context;
use pyrite_config::ConfigLoader;
use pyrite_lsp::{logging, Server};

fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::new();
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    // logging is configured before a workspace is known; the workspace
    // config is loaded again on initialize
    let settings = loader
        .load_from_directory(&cwd)
        .map(|config| config.settings)
        .unwrap_or_default();
    let guard = logging::init(&settings.server)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let code = runtime.block_on(Server::new(loader).run(tokio::io::stdin(), tokio::io::stdout()));
    drop(guard);
    std::process::exit(code);
}
