use sports_events_backend::run;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("sports-events-backend failed: {}", e);
        std::process::exit(1);
    }
}
