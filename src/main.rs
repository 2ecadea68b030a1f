use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match smartest_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}
