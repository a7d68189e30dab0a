// SPDX-License-Identifier: MIT

//! Line-oriented TCP front end for the extraction pipeline: one thread per
//! connection, one raw query in per line, one JSON record out per line.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use fareq_core::airports::{AirportDirectory, IataCodesClient};
use fareq_core::tags::{HttpTagger, Tagger};
use fareq_core::QueryProcessor;
use log::{error, info, warn};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

const GREETING: &[u8] = b"Welcome to the server. Type something and hit enter\n";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Part-of-speech tagging service endpoint
    #[arg(long, env = "TAGGER_URL")]
    tagger_url: String,

    /// API key for the IATA directory
    #[arg(long, env = "IATA_API_KEY")]
    iata_api_key: String,

    /// Base URL of the IATA directory
    #[arg(long, default_value = fareq_core::airports::DEFAULT_BASE_URL)]
    iata_url: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let tagger = HttpTagger::new(&cli.tagger_url)?;
    let directory = IataCodesClient::with_base_url(&cli.iata_url, &cli.iata_api_key)?;
    let processor = Arc::new(QueryProcessor::new(tagger, directory));

    let listener = TcpListener::bind((cli.host.as_str(), cli.port))
        .with_context(|| format!("failed to bind {}:{}", cli.host, cli.port))?;
    info!("listening on {}:{}", cli.host, cli.port);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Ok(peer) = stream.peer_addr() {
                    info!("connected with {}", peer);
                }
                let processor = Arc::clone(&processor);
                thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &processor) {
                        warn!("connection closed with error: {}", err);
                    }
                });
            }
            Err(err) => error!("failed to accept connection: {}", err),
        }
    }

    Ok(())
}

fn handle_connection<T, D>(
    stream: TcpStream,
    processor: &QueryProcessor<T, D>,
) -> std::io::Result<()>
where
    T: Tagger,
    D: AirportDirectory,
{
    let reader = BufReader::new(stream.try_clone()?);
    serve(reader, stream, processor)
}

/// Runs the request/response exchange until the peer disconnects. Fatal
/// request errors become a one-line JSON error object; the loop keeps
/// serving.
fn serve<R, W, T, D>(mut reader: R, mut writer: W, processor: &QueryProcessor<T, D>) -> std::io::Result<()>
where
    R: BufRead,
    W: Write,
    T: Tagger,
    D: AirportDirectory,
{
    writer.write_all(GREETING)?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let query = line.trim_end_matches(['\r', '\n']);
        if query.is_empty() {
            continue;
        }

        let reply = match processor.process(query) {
            Ok(resolved) => resolved
                .to_json()
                .unwrap_or_else(|err| error_line(&err.to_string())),
            Err(err) => {
                warn!("query failed: {}", err);
                error_line(&err.to_string())
            }
        };
        writer.write_all(reply.as_bytes())?;
        writer.write_all(b"\n")?;
    }
}

fn error_line(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
