use clap::Parser;
use dotenvy::dotenv;
use http::{HeaderName, HeaderValue};
use serde::Serialize;
use std::sync::Arc;
use x402_feed::config::{CliArgs, Command, Config};
use x402_feed::dispatcher::FeedParams;
use x402_feed::services::{ErrorKind, ServiceError, ServiceFacade, parse_fid};
use x402_feed::util::{SigDown, Telemetry};
use x402_feed_eip155::networks::usdc_address;
use x402_feed_eip155::{ExactEvmProofBuilder, WalletIdentity};
use x402_feed_reqwest::{CallOptions, PaymentRetryClient};
use x402_feed_types::challenge::ChallengeParser;

type Prover = ExactEvmProofBuilder<alloy_signer_local::PrivateKeySigner>;

/// Runs one CLI command.
///
/// - Loads `.env` variables.
/// - Installs logging and, if enabled, OpenTelemetry export.
/// - Builds the paying client from configuration.
/// - Executes the command, with SIGINT/SIGTERM cancelling it.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let cli = CliArgs::parse();

    let _telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = Config::load(cli.config.as_deref())?;
    let facade = build_facade(&config)?;

    let sig_down = SigDown::try_new()?;
    let options = CallOptions::new().with_cancellation(sig_down.cancellation_token());

    match execute(&facade, cli.command, &options).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(error) => {
            println!("{}", serde_json::to_string_pretty(&error)?);
            Err(error.into())
        }
    }
}

fn build_facade(config: &Config) -> Result<ServiceFacade<Prover>, Box<dyn std::error::Error>> {
    let signer = config.private_key()?.signer()?;
    let identity = WalletIdentity::new(signer, config.network().clone());
    tracing::info!(
        address = %identity.address(),
        network = %identity.network(),
        upstream = %config.base_url(),
        "Paying wallet loaded"
    );
    let prover = ExactEvmProofBuilder::new(Arc::new(identity));
    let parser = ChallengeParser::new(config.network().clone()).with_asset_resolver(usdc_address);

    let mut builder = PaymentRetryClient::builder(config.base_url().clone(), parser, prover)
        .timeout(config.request_timeout());
    if let Some(api_key) = config.api_key() {
        let mut value = HeaderValue::from_str(api_key)?;
        value.set_sensitive(true);
        builder = builder.default_header(HeaderName::from_static("x-api-key"), value);
    }
    let client = Arc::new(builder.build()?);
    Ok(ServiceFacade::new(client))
}

fn to_output<T: Serialize>(value: T) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::new(ErrorKind::Internal, e.to_string()))
}

async fn execute(
    facade: &ServiceFacade<Prover>,
    command: Command,
    options: &CallOptions,
) -> Result<serde_json::Value, ServiceError> {
    match command {
        Command::User {
            username: Some(username),
            ..
        } => to_output(facade.users.lookup_by_username(&username, options).await?),
        Command::User { fid, .. } => {
            let fid = parse_fid(fid.as_deref().unwrap_or_default())?;
            to_output(facade.users.lookup_by_fid(fid, options).await?)
        }
        Command::Channels { fid } => {
            let fid = parse_fid(&fid)?;
            to_output(facade.channels.list_for_fid(fid, options).await?)
        }
        Command::Feed {
            kind,
            fid,
            channel_id,
            viewer_fid,
            limit,
            cursor,
        } => {
            let params = FeedParams {
                kind: &kind,
                fid: fid.as_deref(),
                channel_id: channel_id.as_deref(),
                viewer_fid: viewer_fid.as_deref(),
                limit: limit.as_deref(),
                cursor: cursor.as_deref(),
            };
            to_output(facade.feeds.feed_from_params(&params, options).await?)
        }
    }
}
