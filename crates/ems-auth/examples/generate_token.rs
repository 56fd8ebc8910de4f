//! Generate an identity token for an employee
//!
//! Usage:
//!   cargo run --example generate_token -- --secret "your-secret-key" --username alice
//!   cargo run --example generate_token -- --secret "your-secret-key" --username alice --hours 1

use chrono::Duration;
use clap::Parser;
use ems_auth::{TokenService, TOKEN_VALIDITY_HOURS};

#[derive(Parser, Debug)]
#[command(name = "generate_token")]
#[command(about = "Generate an identity token for an employee", long_about = None)]
struct Args {
    /// Signing secret (must match the server's JWT_SECRET)
    #[arg(long, env = "JWT_SECRET")]
    secret: String,

    /// Employee username to put in the token
    #[arg(long)]
    username: String,

    /// Token validity in hours
    #[arg(long, default_value_t = TOKEN_VALIDITY_HOURS)]
    hours: i64,
}

fn main() {
    let args = Args::parse();

    let service =
        TokenService::new(args.secret.as_bytes()).with_validity(Duration::hours(args.hours));

    match service.issue(&args.username) {
        Ok(token) => {
            println!("\n✅ Token generated successfully!\n");
            println!("Username:  {}", args.username);
            println!("Valid for: {} hours", args.hours);
            println!("\nToken:");
            println!("{}\n", token);
            println!("Usage:");
            println!(
                "  curl -H \"Authorization: Bearer {}\" http://localhost:8080/employees\n",
                token
            );
        }
        Err(e) => {
            eprintln!("❌ Failed to generate token: {}", e);
            std::process::exit(1);
        }
    }
}
