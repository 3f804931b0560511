#[tokio::main]
async fn main() {
    if let Err(e) = warmtoon::cli::run_main().await {
        eprintln!("{} {e:#}", console::style("error:").red().bold());
        std::process::exit(1);
    }
}
