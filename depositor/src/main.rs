#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use std::error::Error;

use clap::{crate_version, Arg, Command};
use slog::{error, info};

use adapter::{ethereum::Options, ChainReader, Ethereum, Unlockable};
use depositor::{ClearnodeApi, ConvergenceOptions, DepositCoordinator};
use primitives::{
    config::{configuration, Environment},
    util::{logging::new_logger, ApiUrl},
    Amount, Chain, ChainId,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Command::new("Depositor")
        .version(crate_version!())
        .about("Deposits funds into the clearnode home channel of the keystore wallet")
        .arg(
            Arg::new("config")
                .long("config")
                .help("the config file for the depositor")
                .takes_value(true),
        )
        .arg(
            Arg::new("keystoreFile")
                .long("keystoreFile")
                .short('k')
                .help("path to the JSON Ethereum Keystore file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .short('c')
                .help("the chain id or the configured name of the chain")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("asset")
                .long("asset")
                .short('a')
                .help("the asset symbol, e.g. USDC")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("amount")
                .long("amount")
                .help("the amount to deposit in the asset units, e.g. 1.5")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("clearnodeUrl")
                .long("clearnodeUrl")
                .short('u')
                .help("overrides the clearnode URL of the config")
                .takes_value(true),
        )
        .arg(
            Arg::new("wait")
                .long("wait")
                .short('w')
                .takes_value(false)
                .help("waits for the clearnode to index the deposit"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .takes_value(false)
                .requires("wait")
                .help("checks the indexed home channel against the custody contract"),
        )
        .get_matches();

    let environment: Environment = match std::env::var("ENV") {
        Ok(env) => serde_json::from_value(serde_json::Value::String(env))
            .expect("Valid Environment - development or production"),
        Err(_) => Environment::default(),
    };

    let config_file = cli.value_of("config");
    let config = configuration(environment, config_file).expect("failed to parse configuration");

    let chain: Chain = {
        let chain_arg = cli.value_of("chain").expect("chain is required");
        let by_id = chain_arg
            .parse::<ChainId>()
            .ok()
            .and_then(|chain_id| config.find_chain(chain_id));

        by_id
            .or_else(|| config.find_chain_by_name(chain_arg))
            .cloned()
            .ok_or_else(|| format!("Chain `{chain_arg}` is not configured"))?
    };
    let asset = cli.value_of("asset").expect("asset is required");
    let amount: Amount = cli.value_of("amount").expect("amount is required").parse()?;
    let clearnode_url: ApiUrl = match cli.value_of("clearnodeUrl") {
        Some(url) => url.parse()?,
        None => config.clearnode_url.clone(),
    };

    let logger = new_logger("depositor");

    let keystore_file = cli
        .value_of("keystoreFile")
        .expect("unable to get keystore file");
    let keystore_pwd = std::env::var("KEYSTORE_PWD").expect("unable to get keystore pwd");
    let options = Options {
        keystore_file: keystore_file.to_string(),
        keystore_pwd,
    };
    let ethereum = Ethereum::init(options, &chain).expect("failed to init the Ethereum client");

    let rpc_chain_id = ethereum.chain_id().await?;
    if rpc_chain_id != chain.chain_id {
        error!(&logger, "RPC node is on another chain"; "main" => "depositor", "rpc_chain_id" => %rpc_chain_id, "chain_id" => %chain.chain_id);

        return Err(format!(
            "The RPC node of chain {} reports chain id {}",
            chain.chain_id, rpc_chain_id
        )
        .into());
    }

    let gateway = ethereum.unlock()?;
    let clearnode = ClearnodeApi::new(clearnode_url, config.fetch_timeout(), logger.clone())?;
    let coordinator = DepositCoordinator::new(gateway, clearnode, logger.clone());

    info!(&logger, "Depositing {} {} on chain {}", amount, asset, chain.chain_id; "main" => "depositor", "owner" => %coordinator.owner());

    let deposit = coordinator.deposit(chain.chain_id, asset, &amount).await?;
    println!("{}", deposit.transaction_hash);

    if cli.is_present("wait") {
        let home_channel = coordinator
            .await_deposit(asset, &deposit, ConvergenceOptions::from(&config))
            .await?;

        info!(&logger, "Deposit indexed by the clearnode"; "main" => "depositor", "channel_id" => %home_channel.channel_id, "version" => home_channel.version, "amount" => %home_channel.amount);

        if cli.is_present("verify") {
            coordinator.verify(chain.chain_id, &home_channel).await?;
        }
    }

    Ok(())
}
