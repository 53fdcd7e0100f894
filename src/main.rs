use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match datacleaner_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
