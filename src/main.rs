use clap::Parser;
use tracing_subscriber::EnvFilter;

use fire_stages::api::{Cli, Command, build_inputs, run_http_server};
use fire_stages::core::run_pipeline;
use fire_stages::report::{TextReport, present};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(args) => {
            let inputs = match build_inputs(&args) {
                Ok(inputs) => inputs,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            let run = run_pipeline(&inputs);

            if args.json {
                match serde_json::to_string_pretty(&run) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Failed to serialize run: {e}");
                        std::process::exit(1);
                    }
                }
                return;
            }

            let mut report = TextReport::new();
            present(&run, &mut report);
            print!("{}", report.into_string());
        }
    }
}
