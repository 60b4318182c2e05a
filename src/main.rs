use speclink::auth::AuthTransport;
use speclink::cli::{parse_args, CliCommand, USAGE};
use speclink::config::TransportConfig;
use speclink::conversation::ConversationClient;
use speclink::error::TransportError;
use speclink::logging::{env_filter, init_tracing};
use speclink::stream::{StreamHandle, StreamPhase};

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use std::io::{self, Write};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing(env_filter()).map_err(|e| eyre!("failed to initialize logging: {}", e))?;

    match run(parse_args(std::env::args())).await {
        Err(report) => match report.downcast_ref::<TransportError>() {
            Some(err) => {
                eprintln!("{}", err.user_report());
                std::process::exit(1);
            }
            None => Err(report),
        },
        ok => ok,
    }
}

async fn run(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => println!("speclink {}", VERSION),
        CliCommand::Help => println!("{}", USAGE),
        CliCommand::Invalid(reason) => {
            eprintln!("{}\n\n{}", reason, USAGE);
            std::process::exit(2);
        }
        CliCommand::Login { email } => {
            let transport = connect()?;
            print!("Password: ");
            io::stdout().flush()?;
            let password =
                rpassword::read_password().map_err(|e| eyre!("failed to read password: {}", e))?;
            transport.login(&email, &password).await?;
            println!("Signed in as {}", email);
        }
        CliCommand::Logout => {
            connect()?.logout().await?;
            println!("Signed out");
        }
        CliCommand::Get { path } => {
            let body: serde_json::Value = connect()?.get_json(&path).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        CliCommand::Stream {
            feature_id,
            message,
        } => {
            let client = ConversationClient::new(connect()?);
            let handle = client.stream_message(&feature_id, &message).await?;
            render_stream(handle).await?;
        }
    }
    Ok(())
}

fn connect() -> Result<AuthTransport, TransportError> {
    AuthTransport::from_config(TransportConfig::from_env()?)
}

/// Print text as it arrives; Ctrl+C cancels the stream.
async fn render_stream(mut handle: StreamHandle) -> Result<()> {
    let mut updates = handle.subscribe();
    let mut printed = 0;
    let mut stdout = io::stdout();

    loop {
        let state = updates.borrow_and_update().clone();
        if state.accumulated_text.len() > printed {
            write!(stdout, "{}", &state.accumulated_text[printed..])?;
            stdout.flush()?;
            printed = state.accumulated_text.len();
        }
        if state.phase.is_terminal() {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => handle.cancel(),
        }
    }

    let state = handle.wait().await;
    println!();
    match state.phase {
        StreamPhase::Completed => {
            if let Some(result) = state.final_result {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Ok(())
        }
        StreamPhase::Cancelled => {
            eprintln!("Cancelled");
            Ok(())
        }
        _ => bail!(state.error.unwrap_or_else(|| "stream failed".to_string())),
    }
}
