use crate::args::{LitsafeSubcommand, SafeTxArgs};
use eyre::{Result, WrapErr};
use litsafe_auth::{LoginGateway, extract_token};
use litsafe_config::Config;
use litsafe_relay::{Relay, RelayClient};
use litsafe_safe::{pack_signatures, safe_tx_hash, safe_typed_data};

/// Runs `cmd` against `config`, printing its result to stdout.
pub async fn run(cmd: LitsafeSubcommand, config: Config) -> Result<()> {
    match cmd {
        LitsafeSubcommand::LoginUrl { redirect } => {
            let redirect = redirect.unwrap_or_else(|| config.redirect_uri.clone());
            println!("{}", LoginGateway::new(config.login_gateway.clone()).login_url(&redirect));
        }
        LitsafeSubcommand::Token { url, redirect } => {
            let redirect = redirect.unwrap_or_else(|| config.redirect_uri.clone());
            let callback = extract_token(&redirect, &url)?;
            println!("{}", callback.id_token.as_str());
            eprintln!("cleaned URL: {}", callback.cleaned_url);
        }
        LitsafeSubcommand::Pkps { token } => {
            let relay = RelayClient::from_config(&config)?;
            let pkps = relay.fetch_existing(&token.token()).await?;
            if pkps.is_empty() {
                eprintln!("no PKPs are bound to this token, run `litsafe mint` to create one");
            }
            println!("{}", serde_json::to_string_pretty(&pkps)?);
        }
        LitsafeSubcommand::Mint { token } => {
            let relay = RelayClient::from_config(&config)?;
            let pkp = relay.mint_and_wait(&token.token()).await?;
            println!("{}", serde_json::to_string_pretty(&pkp)?);
        }
        LitsafeSubcommand::SafeTxHash(args) => safe_tx(&args, &config)?,
        LitsafeSubcommand::PackSignatures { signatures } => {
            println!("{}", pack_signatures(&signatures)?);
        }
        LitsafeSubcommand::Config => {
            print!("{}", config.to_string_pretty()?);
        }
    }
    Ok(())
}

fn safe_tx(args: &SafeTxArgs, config: &Config) -> Result<()> {
    let domain = args.domain(config.chain_id).build()?;
    let tx = args.tx().build()?;
    if args.typed_data {
        let typed = safe_typed_data(&domain, &tx).wrap_err("failed to build typed data")?;
        println!("{}", serde_json::to_string_pretty(&typed)?);
    } else {
        println!("{}", safe_tx_hash(&domain, &tx));
    }
    Ok(())
}
