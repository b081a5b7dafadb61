#[macro_use] extern crate log;

use clap::Parser;

use octopus::config::Settings;
use octopus::logger;
use octopus::utils::ResultV;
use octopus::{handlers, Router, Server, StaticFiles};


const MODULE: &str = "MAIN";

/// Minimal HTTP server with a path-template router
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on, overrides the configuration
    #[arg(short, long)]
    port: Option<u16>,
}


fn main() -> ResultV {
    let args = Args::parse();
    let cfg = Settings::load(args.config.as_deref()).map_err(|e| {
        eprintln!("Could not load configuration: {}", e);
        "config error"
    })?;
    logger::init_logger(&cfg.log)?;

    let mut router = Router::new();
    if cfg.static_files.enabled {
        info!("[{}] Serving static files from {}", MODULE, cfg.static_files.root);
        router = router.with_static_content(StaticFiles::new(&cfg.static_files.root));
    }
    handlers::register(&mut router)
        .map_err(logger::get_reporter(MODULE, "Route registration", "route error"))?;

    let port = args.port.unwrap_or(cfg.server.port);
    let mut server = Server::new(router, &cfg.server);
    server.start(port)
        .map_err(logger::get_reporter(MODULE, "Server start", "init server error"))?;

    info!("[{}] Starting octopus service at 0.0.0.0:{}", MODULE, port);
    if let Some(path) = &args.config {
        info!("[{}] Config loaded from {}", MODULE, path);
    }

    server.wait();
    Ok(())
}
