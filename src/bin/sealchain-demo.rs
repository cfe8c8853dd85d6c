#![forbid(unsafe_code)]

use clap::Parser;
use colored::*;
use sealchain::blockchain::Blockchain;
use sealchain::config::load_config;
use sealchain::crypto::KeyPair;
use sealchain::transaction::{Amount, Transaction};

const DEMO_SECRET_KEY: &str = "4ad4d3e04fe2ec626bdfea19737b957f0986ea27353c1c1912753f3f015c1014";

/// Runs two transfer-and-mine rounds against a fresh in-memory chain.
#[derive(Parser, Debug)]
#[command(name = "sealchain-demo", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Hex-encoded secp256k1 secret key for the demo wallet
    #[arg(long, default_value = DEMO_SECRET_KEY, conflicts_with = "generate")]
    secret: String,

    /// Use a freshly generated wallet instead of --secret
    #[arg(long)]
    generate: bool,

    /// Recipient of the first transfer
    #[arg(long, default_value = "public key goes here")]
    recipient: String,

    /// Print the whole chain as JSON at the end
    #[arg(long)]
    dump_json: bool,

    /// Alter a mined transaction afterwards and show that validation notices
    #[arg(long)]
    tamper: bool,
}

fn send(
    chain: &mut Blockchain,
    key: &KeyPair,
    to: &str,
    amount: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = Transaction::new(key.address(), to, Amount::from_num(amount));
    tx.sign(key)?;
    chain.add_transaction(tx)?;
    println!("  {} {} -> {}", "sent".green(), amount, to);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let key = if args.generate {
        KeyPair::generate()?
    } else {
        KeyPair::from_secret_hex(&args.secret)?
    };
    let wallet = key.address();

    let mut chain = Blockchain::from_config(&config);
    let control = config.miner.control();

    println!("{}", "SealChain demo".bright_cyan().bold());
    println!("{} {}", "Wallet:".bright_white(), wallet);
    println!(
        "{} difficulty {}, reward {}, {} mining thread(s)\n",
        "Chain:".bright_white(),
        chain.difficulty(),
        chain.mining_reward(),
        chain.threads()
    );

    send(&mut chain, &key, &args.recipient, 100)?;
    println!("{}", "Starting the miner...".yellow());
    chain.mine_pending_transactions_with(&wallet, &control)?;
    println!("  {} {}\n", "mined".green(), chain.latest_block().hash_hex());

    send(&mut chain, &key, "address1", 50)?;
    println!("{}", "Starting the miner again...".yellow());
    chain.mine_pending_transactions_with(&wallet, &control)?;
    println!("  {} {}\n", "mined".green(), chain.latest_block().hash_hex());

    println!("{} {}", "Balance of wallet is".bright_white(), chain.balance_of(&wallet));
    println!(
        "{} {}",
        "Wallet history:".bright_white(),
        chain.transactions_for(&wallet).len()
    );
    println!("{} {}", "Is chain valid?".bright_white(), chain.is_chain_valid());

    if args.tamper {
        if let Some(Transaction::Transfer(tx)) = chain
            .block_mut(1)
            .and_then(|block| block.transactions.first_mut())
        {
            tx.amount = Amount::from_num(1);
        }
        println!(
            "{} {}",
            "After tampering with block 1, is chain valid?".red(),
            chain.is_chain_valid()
        );
    }

    if args.dump_json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
    }

    Ok(())
}
