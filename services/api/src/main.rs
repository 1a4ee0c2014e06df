use mindwell_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("mindwell error: {err}");
        std::process::exit(1);
    }
}
