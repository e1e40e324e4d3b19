//! webterm-bridge binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use webterm_bridge::{api, cli, credentials, logging, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'webterm-bridge --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let initialized = match config.log_filter() {
        Some(level) => logging::init_with_filter(level),
        None => logging::try_init(),
    };
    if initialized.is_err() {
        eprintln!("warning: logging already initialized");
    }

    info!("webterm-bridge v{}", env!("CARGO_PKG_VERSION"));

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    credentials::write_from_env(&config.credentials.env_var, &config.credentials.path);

    let bridge = config.build_bridge();
    info!(
        script = %bridge.target().script_path().display(),
        mode = %config.bridge.spawn_mode,
        "bridge ready"
    );

    let state = api::AppState::new(Arc::new(bridge));
    match api::serve(server_config, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
