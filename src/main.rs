//! swarmbus CLI binary
//!
//! This is the minimal entrypoint for the swarmbus CLI.
//! All logic is in the library; main.rs only invokes cli::run().

#[tokio::main]
async fn main() {
    // cli::run() handles ALL output including errors.
    // Returns Result<(), ExitCode> - main only maps to process exit.
    if let Err(code) = swarmbus::cli::run().await {
        std::process::exit(code.as_i32());
    }
}
