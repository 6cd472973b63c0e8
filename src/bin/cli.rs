use clap::{Args, Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use std::fs;

use vendor_desk::models::{SessionClaims, VendorInput};
use vendor_desk::vendors::validate;

const TOKEN_FILE: &str = ".vendor_desk_token";

#[derive(Parser)]
#[command(name = "vendor-cli")]
#[command(about = "CLI for the vendor_desk JSON API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, env = "VENDOR_DESK_URL", default_value = "http://localhost:3000")]
    url: String,
}

#[derive(Args)]
struct VendorArgs {
    #[arg(long)]
    vendor_name: String,
    #[arg(long)]
    bank_account_no: String,
    #[arg(long)]
    bank_name: String,
    #[arg(long)]
    address_line_1: String,
    #[arg(long)]
    address_line_2: Option<String>,
    #[arg(long)]
    city: String,
    #[arg(long)]
    country: String,
    #[arg(long)]
    zip_code: String,
}

impl From<VendorArgs> for VendorInput {
    fn from(args: VendorArgs) -> Self {
        VendorInput {
            vendor_name: args.vendor_name,
            bank_account_no: args.bank_account_no,
            bank_name: args.bank_name,
            address_line_1: args.address_line_1,
            address_line_2: args.address_line_2,
            city: args.city,
            country: args.country,
            zip_code: args.zip_code,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Store a session token (the value of the `vendor_desk.session` cookie).
    SaveToken {
        token: String,
    },
    Whoami,
    List {
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    Get {
        #[arg(short, long)]
        id: String,
    },
    Create {
        #[command(flatten)]
        vendor: VendorArgs,
    },
    Update {
        #[arg(short, long)]
        id: String,
        #[command(flatten)]
        vendor: VendorArgs,
    },
    Delete {
        #[arg(short, long)]
        id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    Logout,
}

fn authed(builder: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    builder.bearer_auth(token.trim())
}

async fn print_response(res: Response) -> Result<(), Box<dyn std::error::Error>> {
    if res.status().is_redirection() {
        println!(
            "Not signed in or session expired. \
             Sign in through the browser and run `save-token`."
        );
        return Ok(());
    }
    println!("Response ({}): {}", res.status(), res.text().await?);
    Ok(())
}

/// Checks the input locally so an incomplete vendor never goes over the wire.
fn checked(vendor: VendorArgs) -> Option<VendorInput> {
    match validate(&vendor.into()) {
        Ok(valid) => Some(valid),
        Err(errors) => {
            for (field, message) in errors {
                eprintln!("{field}: {message}");
            }
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // The API redirects unauthenticated calls to the entry page.
    // Surface that instead of following it.
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let url = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::SaveToken { token } => {
            fs::write(TOKEN_FILE, token.trim())?;
            println!("Token saved to {TOKEN_FILE}");
        }
        Commands::Whoami => {
            let res = authed(client.get(format!("{url}/api/session"))).send().await?;
            if res.status().is_success() {
                let claims: SessionClaims = res.json().await?;
                println!("{} <{}>", claims.display_name(), claims.email);
            } else {
                print_response(res).await?;
            }
        }
        Commands::List { page } => {
            let res = authed(client.get(format!("{url}/api/vendors?page={page}"))).send().await?;
            print_response(res).await?;
        }
        Commands::Get { id } => {
            let res = authed(client.get(format!("{url}/api/vendors/{id}"))).send().await?;
            print_response(res).await?;
        }
        Commands::Create { vendor } => {
            let Some(input) = checked(vendor) else {
                std::process::exit(2);
            };
            let res = authed(client.post(format!("{url}/api/vendors")))
                .json(&input)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Update { id, vendor } => {
            let Some(input) = checked(vendor) else {
                std::process::exit(2);
            };
            let res = authed(client.put(format!("{url}/api/vendors/{id}")))
                .json(&input)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id, yes } => {
            if !yes {
                println!("Refusing to delete {id} without --yes");
                return Ok(());
            }
            let res = authed(client.delete(format!("{url}/api/vendors/{id}"))).send().await?;
            if res.status().is_success() {
                println!("Deleted {id}");
            } else {
                print_response(res).await?;
            }
        }
        Commands::Logout => {
            if fs::remove_file(TOKEN_FILE).is_ok() {
                println!("Logged out. Token removed.");
            } else {
                println!("No saved token.");
            }
        }
    }

    Ok(())
}
