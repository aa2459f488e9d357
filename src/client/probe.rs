use market_call_service::client::trading::TradingClient;
use market_call_service::common::error::SignError;
use market_call_service::common::signer::RequestSigner;
use market_call_service::common::types::{Method, SigningRequest};
use market_call_service::common::verify::{load_public_key, verify_request};
use market_call_service::config::AppConfig;
use market_call_service::telemetry;
use rsa::RsaPublicKey;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_PATH: &str = "/exchange/status";

#[derive(Debug, PartialEq)]
struct Invocation {
    method: Method,
    path: String,
    body: Option<Value>,
}

/// `[METHOD] [PATH] [JSON_BODY]`. A leading path means GET.
fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut args = args.iter().map(String::as_str);
    let mut next = args.next();
    let method = match next {
        Some(first) if !first.starts_with('/') => {
            next = args.next();
            Method::from_str(first)?
        }
        _ => Method::Get,
    };
    let path = next.unwrap_or(DEFAULT_PATH).to_string();
    let body = args
        .next()
        .map(|raw| serde_json::from_str::<Value>(raw))
        .transpose()
        .map_err(|e| format!("invalid JSON body: {}", e))?;

    Ok(Invocation { method, path, body })
}

/// Signs the request once and checks the result against `public_key`
/// before anything goes over the wire.
fn self_check(
    signer: &RequestSigner,
    public_key: &RsaPublicKey,
    method: Method,
    path: &str,
    body: &str,
) -> Result<bool, SignError> {
    let request = SigningRequest::new(0, method, path, body);
    let signature = signer.sign(&request)?;
    verify_request(public_key, &request, &signature.to_base64())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    let config = AppConfig::from_env()?;
    let signer = Arc::new(RequestSigner::from_credential(&config.credential)?);
    info!("Loaded signing key {}", signer.key_id());

    // The key registered with the exchange, when available; otherwise the
    // signer's own half.
    let public_key = match std::env::var("KALSHI_PUBLIC_KEY_PATH") {
        Ok(path) if !path.trim().is_empty() => load_public_key(&std::fs::read_to_string(path)?)?,
        _ => signer.public_key().clone(),
    };

    let client = TradingClient::new(&config.trading_api_base, signer.clone())?;
    let url = client.request_url(&invocation.path)?;
    let body = invocation.body.as_ref().map(Value::to_string).unwrap_or_default();
    if !self_check(&signer, &public_key, invocation.method, url.path(), &body)? {
        return Err("Signature self-check failed".into());
    }

    info!("Sending signed {} {}", invocation.method, url);
    let response = client
        .send_json(invocation.method, &invocation.path, invocation.body.as_ref())
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
