//! Basic example: log in to a CyberPower PDU/UPS card and show its prompt
//!
//! This example demonstrates the basic usage of loginshake to reach the
//! operational prompt of an appliance that authenticates in-band.
//!
//! # Prerequisites
//!
//! - A CyberPower OS device (or anything printing "Login Name:" and
//!   "Login Password:") reachable over Telnet or SSH
//! - Valid device credentials
//!
//! # Usage
//!
//! Over Telnet:
//! ```bash
//! cargo run --example cyberpower_telnet -- --host 192.168.1.50 --user cyber --password cyber
//! ```
//!
//! Over SSH, sending one command after login:
//! ```bash
//! cargo run --example cyberpower_telnet -- --host 192.168.1.50 --ssh --user cyber --password cyber --command "status"
//! ```

use std::env;
use std::time::Duration;

use loginshake::{AuthMethod, Channel, SessionBuilder, TransportKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = Args::parse();
    let kind = if args.ssh {
        TransportKind::Ssh
    } else {
        TransportKind::Telnet
    };
    let port = args.port.unwrap_or_else(|| kind.default_port());

    println!("Connecting to {}:{} over {}...", args.host, port, kind);

    let Some(password) = args.password else {
        eprintln!("Error: Must provide --password");
        std::process::exit(1);
    };

    // Build the session
    let mut builder = SessionBuilder::new(&args.host)
        .transport(kind)
        .port(port)
        .profile(&args.profile)
        .password(password.clone())
        .timeout(Duration::from_secs(args.timeout));
    if let Some(user) = &args.user {
        builder = builder.username(user);
    }
    if args.ssh {
        // most appliances accept the same password at the SSH layer
        builder = builder.ssh_auth(AuthMethod::Password(password.into()));
    }

    let mut session = builder.build()?;

    // Connect and log in
    println!("Logging in (profile {})...", args.profile);
    session.open().await?;
    println!("Logged in!");

    println!("\nLogin transcript:");
    println!("{}", "-".repeat(50));
    println!("{}", session.login_transcript());
    println!("{}", "-".repeat(50));

    match session.base_prompt() {
        Some(prompt) => println!("Base prompt: {prompt}"),
        None => println!("Base prompt: (none seen)"),
    }

    if let Some(command) = &args.command {
        println!("\nExecuting: {command}");
        let terminator = session.profile().login.line_terminator.clone();
        session
            .channel_mut()?
            .write(&format!("{command}{terminator}"))
            .await?;

        // give the device a moment to answer
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!("{}", session.read_command_echo(command).await?);
    }

    // Close the connection
    println!("\nClosing session...");
    session.close().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: Option<u16>,
    ssh: bool,
    user: Option<String>,
    password: Option<String>,
    profile: String,
    command: Option<String>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "192.168.1.50".to_string();
        let mut port = None;
        let mut ssh = false;
        let mut user = None;
        let mut password = None;
        let mut profile = "cyberpower_os".to_string();
        let mut command = None;
        let mut timeout = 10u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().ok();
                    }
                }
                "--ssh" => ssh = true,
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = Some(args[i].clone());
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--profile" => {
                    i += 1;
                    if i < args.len() {
                        profile = args[i].clone();
                    }
                }
                "--command" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        command = Some(args[i].clone());
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(10);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            host,
            port,
            ssh,
            user,
            password,
            profile,
            command,
            timeout,
        }
    }

    fn print_help() {
        println!(
            r#"loginshake cyberpower_telnet example

USAGE:
    cargo run --example cyberpower_telnet -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Target host [default: 192.168.1.50]
    -p, --port <PORT>        Port [default: 23 for Telnet, 22 for SSH]
    --ssh                    Connect over SSH instead of Telnet
    -u, --user <USER>        Username typed at "Login Name:"
    -P, --password <PASS>    Password typed at "Login Password:"
    --profile <NAME>         Login profile [default: cyberpower_os]
    -c, --command <CMD>      Command to send after login
    -t, --timeout <SECS>     Connection timeout [default: 10]
    --help                   Print this help message

EXAMPLES:
    # Telnet login with the factory credentials
    cargo run --example cyberpower_telnet -- --host 192.168.1.50 --user cyber --password cyber

    # Password-only device using the generic profile
    cargo run --example cyberpower_telnet -- --host 10.0.0.9 --profile generic --password secret
"#
        );
    }
}
