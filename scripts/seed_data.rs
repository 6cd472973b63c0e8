//! Seed script for the embedded store.
//!
//! Manages the sign-in allow-list and loads sample vendors for local development.
//! Run: cargo run --bin seed_data -- allow alice@example.com --name "Alice"
//!
//! Stop the server first: the Sled directory can only be opened by one process.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vendor_desk::models::VendorInput;
use vendor_desk::storage::{DataService, SledStore};

#[derive(Parser)]
#[command(name = "seed_data", about = "Seed the embedded vendor_desk store", long_about = None)]
struct Cli {
    #[arg(long, env = "DATA_DIR", default_value = "vendor_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an email to the sign-in allow-list.
    Allow {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove an email from the allow-list. Existing sessions stay valid until they expire.
    Revoke { email: String },
    /// Print the allow-list and vendor count.
    Show,
    /// Insert generated vendors.
    SampleVendors {
        #[arg(long, default_value_t = 25)]
        count: usize,
    },
}

const CITIES: [(&str, &str, &str); 5] = [
    ("Springfield", "US", "62701"),
    ("Toronto", "CA", "M5H 2N2"),
    ("Berlin", "DE", "10115"),
    ("Melbourne", "AU", "3000"),
    ("Dublin", "IE", "D02 X285"),
];

fn sample_vendor(i: usize) -> VendorInput {
    let (city, country, zip_code) = CITIES[i % CITIES.len()];
    VendorInput {
        vendor_name: format!("Sample Vendor {:03}", i + 1),
        bank_account_no: format!("{:010}", 4_000_000_000u64 + i as u64),
        bank_name: ["First Bank", "Harbor Credit Union", "Northern Trust"][i % 3].to_string(),
        address_line_1: format!("{} Market Street", 100 + i),
        address_line_2: (i % 4 == 0).then(|| format!("Suite {}", 200 + i)),
        city: city.to_string(),
        country: country.to_string(),
        zip_code: zip_code.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store = SledStore::open(&cli.data_dir)?;

    match cli.command {
        Commands::Allow { email, name } => {
            let row = store.allow_email(&email, name)?;
            println!("Allowed {}", row.email);
        }
        Commands::Revoke { email } => {
            if store.revoke_email(&email)? {
                println!("Revoked {email}");
            } else {
                println!("{email} was not on the allow-list");
            }
        }
        Commands::Show => {
            let users = store.authorized_users()?;
            println!("Allow-list ({} entries):", users.len());
            for user in users {
                match user.name {
                    Some(name) => println!("  {} ({name})", user.email),
                    None => println!("  {}", user.email),
                }
            }
            println!("Vendors: {}", store.count_vendors().await?);
        }
        Commands::SampleVendors { count } => {
            for i in 0..count {
                store.insert_vendor(sample_vendor(i)).await?;
            }
            println!("Inserted {count} sample vendors");
        }
    }

    store.flush()?;
    Ok(())
}
