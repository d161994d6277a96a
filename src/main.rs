use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    zappoint::init_tracing();

    match zappoint::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {e}");
            ExitCode::FAILURE
        }
    }
}
