use std::env;

use nestegg::api::{CliError, run_cli};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = nestegg::api::run_http_server(port).await {
            log::error!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    match run_cli(raw_args) {
        Ok(output) => print!("{output}"),
        Err(CliError::Args(e)) => e.exit(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
