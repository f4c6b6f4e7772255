#[tokio::main]
async fn main() {
    if let Err(e) = tripmark_lib::run().await {
        tracing::error!(error = %e, "tripmark stopped");
        std::process::exit(1);
    }
}
