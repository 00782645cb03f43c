use jobsphere::core::system::System;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let system = match System::initialize().await {
        Ok(system) => system,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let result = system.run().await;
    system.terminate().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            macros::log!(err);
            ExitCode::FAILURE
        }
    }
}
