use std::sync::Arc;

use tracing::{error, info};

use exrouter::config::{AppState, Config};
use exrouter::runtime::CoreRuntime;
use exrouter::{demo, logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let runtime = match demo::install(CoreRuntime::builder(cfg.router.clone())).and_then(|b| b.build()) {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Router setup failed: {err}");
            let response = CoreRuntime::setup_failure_response(&err, &cfg.router);
            println!("{}", response.body);
            std::process::exit(1);
        }
    };

    // Tokio runtime sized by `server.workers`, defaulting to the CPU count
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        info!("Using {workers} worker threads");
    }
    let tokio_runtime = runtime_builder.build()?;

    tokio_runtime.block_on(async_main(cfg, runtime))
}

async fn async_main(cfg: Config, runtime: CoreRuntime) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let access_log = logger::access_log(&cfg)?;

    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(AppState::new(cfg, runtime, access_log));

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local.run_until(server::serve(listener, state)).await?;
    info!("Server stopped");
    Ok(())
}
