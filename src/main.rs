use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tempo_sync_lib::run().await
}
