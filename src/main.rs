use std::sync::Arc;

use sysmond::config::{load_config, print_schema};
use sysmond::startup::run;
use sysmond::utils::logger::init_logging;
use tracing::error;

#[tokio::main]
async fn main() {
    if std::env::args().skip(1).any(|arg| arg == "--print-schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing configuration schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = load_config();
    init_logging(&config.logging);

    if let Err(e) = run(Arc::new(config)).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
