use apitrack_http::serve;
use clap::Parser;

#[derive(Parser)]
#[command(name = "apitrack")]
struct Cli {
    #[arg(long, env = "APITRACK_BIND_ADDR", default_value = "127.0.0.1:8000")]
    bind_addr: String,
    /// JSON file deployments are loaded from and written back to. Without it
    /// the store lives in memory only.
    #[arg(long, env = "APITRACK_DATA_FILE")]
    data_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    std::env::set_var("APITRACK_BIND_ADDR", &cli.bind_addr);
    if let Some(data_file) = &cli.data_file {
        std::env::set_var("APITRACK_DATA_FILE", data_file);
    }
    serve().await
}
