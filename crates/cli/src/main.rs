//! Benchwatch CLI entry point.

#[tokio::main]
async fn main() {
    match benchwatch_cli::run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
