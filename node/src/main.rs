use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use luckymint_node::{
    api,
    books::{Bank, Books, ReceiptBook, TokenBook, YieldVault},
    engine::{self, Actor},
    gateway::SimulatedGateway,
    store::Store,
    Config, ValidatedConfig,
};
use tracing::info;

fn print_dry_run_report(config: &ValidatedConfig) {
    let genesis = &config.genesis;
    println!("dry-run report");
    println!("  listen: {}", config.listen);
    println!("  log: level={} json={}", config.log_level, config.json_logs);
    println!(
        "  engine: mailbox_size={} event_log_capacity={}",
        config.mailbox_size, config.event_log_capacity
    );
    match &config.snapshot_path {
        Some(path) => println!("  snapshot: {}", path.display()),
        None => println!("  snapshot: disabled"),
    }
    println!(
        "  gateway: max_words={} delay={:?} balance={} fee_per_word={}",
        config.gateway.max_words,
        config.gateway.fulfillment_delay,
        config.gateway.subscription_balance,
        config.gateway.fee_per_word
    );
    match &config.side_channel {
        Some(side) => println!(
            "  side_channel: yield={} gas={}",
            side.claimable_yield, side.claimable_gas
        ),
        None => println!("  side_channel: disabled"),
    }
    println!(
        "  genesis: collections={} eth_to_mint_ratio={} yield_risk={}",
        genesis.collections.len(),
        genesis.ledger.eth_to_mint_ratio,
        genesis.ledger.yield_risk
    );
    for (kind, table) in &genesis.tiers {
        println!(
            "  tiers.{kind:?}: count={} cumulative_risk={}",
            table.tiers().len(),
            table.cumulative_risk()
        );
    }
    println!(
        "  rejecting_recipients: {}",
        config.rejecting_recipients.len()
    );
}

fn init_logging(config: &ValidatedConfig) {
    let builder = tracing_subscriber::fmt().with_max_level(config.log_level);
    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    // Parse arguments
    let matches = Command::new("luckymint-node")
        .about("Batch-mint engine behind an HTTP API.")
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate config and exit without starting the node")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("config").long("config").required(true))
        .get_matches();
    let dry_run = matches.get_flag("dry-run");

    // Load config
    let config_file = matches
        .get_one::<String>("config")
        .context("missing --config")?;
    let config_file = std::fs::read_to_string(config_file)
        .with_context(|| format!("Could not read config file {config_file}"))?;
    let config: Config =
        serde_yaml::from_str(&config_file).context("Could not parse config file")?;

    if dry_run {
        println!("{:#?}", config.redacted_debug());
        let config = config.validate()?;
        print_dry_run_report(&config);
        println!("config ok");
        return Ok(());
    }

    let redacted = format!("{:?}", config.redacted_debug());
    let config = config.validate()?;
    init_logging(&config);
    info!(config = %redacted, "loaded config file");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Could not start runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: ValidatedConfig) -> Result<()> {
    // Restore state
    let snapshot = match &config.snapshot_path {
        Some(path) => Store::load(path)?,
        None => None,
    };
    let store = match snapshot {
        Some(store) => {
            info!(entries = store.len(), "restored snapshot");
            store
        }
        None => {
            info!("starting from genesis");
            Store::genesis(&config.genesis)
        }
    };

    // Wire collaborators
    let books = Books {
        gateway: SimulatedGateway::new(
            config.gateway.secret,
            config.gateway.max_words,
            config.gateway.subscription_balance,
            config.gateway.fee_per_word,
        ),
        token: TokenBook::default(),
        receipts: ReceiptBook::default(),
        bank: Bank::new(config.rejecting_recipients),
        vault: config
            .side_channel
            .map(|side| YieldVault::new(side.claimable_yield, side.claimable_gas)),
    };
    let (actor, mailbox) = Actor::new(
        engine::Config {
            mailbox_size: config.mailbox_size,
            event_log_capacity: config.event_log_capacity,
            fulfillment_delay: config.gateway.fulfillment_delay,
            snapshot_path: config.snapshot_path,
        },
        store,
        books,
    );

    // Serve
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Could not bind {}", config.listen))?;
    info!(listen = %config.listen, "serving");
    let app = api::router(mailbox);
    let (_, served) = tokio::join!(actor.run(), async {
        axum::serve(listener, app.into_make_service()).await
    });
    served.context("server failed")
}
