#[tokio::main]
async fn main() {
  // Minimal CLI: support --version/-V
  let mut args = std::env::args().skip(1);
  if let Some(arg) = args.next() {
    if arg == "--version" || arg == "-V" {
      println!("logwatch {}", env!("CARGO_PKG_VERSION"));
      return;
    }
    // Allow running without args; any other arg prints help
    if arg == "--help" || arg == "-h" {
      eprintln!("Usage: logwatch [--version]");
      eprintln!();
      eprintln!("Configured through LOGWATCH_DATABASE, LOGWATCH_ADDR, LOGWATCH_REAP_PROBABILITY,");
      eprintln!("LOGWATCH_SWEEP_SECS, LOGWATCH_DEFAULT_RETENTION and LOGWATCH_API_TOKEN.");
      return;
    }
  }

  if let Err(e) = logwatch::app::run().await {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}
