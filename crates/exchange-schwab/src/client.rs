//! Thin REST client for the Schwab trader and market-data APIs.
//!
//! Only the operations the agent needs are mapped; response shapes are
//! decoded into the gateway types and everything else is dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use zero_dte_core::config::BrokerConfig;

use crate::error::BrokerError;
use crate::gateway::BrokerGateway;
use crate::types::{
    Account, AccountPosition, BrokerOrder, Instruction, OptionChain, OptionQuote, OptionRight,
    OrderDuration, OrderLeg, OrderStatus, OrderTicket, OrderType, Quote,
};

pub struct SchwabClient {
    http: reqwest::Client,
    config: BrokerConfig,
}

impl SchwabClient {
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BrokerError> {
        let url = format!("{}{}", self.config.api_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .query(query)
            .send()
            .await?;
        let response = check_status(response)?;
        Ok(response.json::<T>().await?)
    }

    fn account_path(&self, suffix: &str) -> String {
        format!(
            "/trader/v1/accounts/{}{}",
            self.config.account_hash, suffix
        )
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::NOT_FOUND {
        Err(BrokerError::NotAvailable(format!("{status}")))
    } else if status.is_client_error() {
        Err(BrokerError::Rejected(format!("{status}")))
    } else {
        Err(BrokerError::Transient(format!("{status}")))
    }
}

// Market-data response shapes. The chain maps are keyed by
// "YYYY-MM-DD:dte" then by strike string, each holding a contract list.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainResponse {
    #[serde(default)]
    underlying_price: Decimal,
    #[serde(default)]
    call_exp_date_map: HashMap<String, HashMap<String, Vec<ContractDto>>>,
    #[serde(default)]
    put_exp_date_map: HashMap<String, HashMap<String, Vec<ContractDto>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractDto {
    symbol: String,
    put_call: String,
    strike_price: Decimal,
    expiration_date: String,
    #[serde(default)]
    bid: Decimal,
    #[serde(default)]
    ask: Decimal,
    #[serde(default)]
    delta: Decimal,
    #[serde(default)]
    gamma: Decimal,
    #[serde(default)]
    open_interest: Decimal,
    #[serde(default)]
    total_volume: Decimal,
}

impl ContractDto {
    fn into_quote(self, underlying: &str) -> Result<OptionQuote, BrokerError> {
        let right = match self.put_call.as_str() {
            "CALL" => OptionRight::Call,
            "PUT" => OptionRight::Put,
            other => {
                return Err(BrokerError::Malformed(format!(
                    "unknown putCall value {other:?}"
                )))
            }
        };
        // Expiration dates arrive as ISO timestamps; keep the date part.
        let expiration = self
            .expiration_date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| {
                BrokerError::Malformed(format!("bad expiration date {:?}", self.expiration_date))
            })?;
        Ok(OptionQuote {
            symbol: self.symbol,
            underlying: underlying.to_string(),
            expiration,
            strike: self.strike_price,
            right,
            delta: self.delta,
            gamma: self.gamma,
            open_interest: self.open_interest,
            bid: self.bid,
            ask: self.ask,
            volume: self.total_volume,
        })
    }
}

fn flatten_chain_map(
    map: HashMap<String, HashMap<String, Vec<ContractDto>>>,
    underlying: &str,
) -> Result<Vec<OptionQuote>, BrokerError> {
    let mut quotes = Vec::new();
    for strikes in map.into_values() {
        for contracts in strikes.into_values() {
            for contract in contracts {
                quotes.push(contract.into_quote(underlying)?);
            }
        }
    }
    Ok(quotes)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpirationChainResponse {
    expiration_list: Vec<ExpirationDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpirationDto {
    expiration_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    quote: QuoteDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteDto {
    #[serde(default)]
    mark: Option<Decimal>,
    #[serde(default)]
    last_price: Option<Decimal>,
    #[serde(default)]
    quote_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    securities_account: SecuritiesAccountDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecuritiesAccountDto {
    #[serde(default)]
    positions: Vec<PositionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionDto {
    instrument: InstrumentDto,
    #[serde(default)]
    average_price: Decimal,
    #[serde(default)]
    long_quantity: Decimal,
    #[serde(default)]
    short_quantity: Decimal,
}

#[derive(Debug, Deserialize)]
struct InstrumentDto {
    symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDto {
    order_id: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    quantity: Decimal,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    entered_time: Option<DateTime<Utc>>,
    #[serde(default)]
    close_time: Option<DateTime<Utc>>,
    #[serde(default)]
    order_leg_collection: Vec<OrderLegDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderLegDto {
    instrument: InstrumentDto,
    #[serde(default)]
    quantity: Decimal,
    instruction: Instruction,
}

impl From<OrderDto> for BrokerOrder {
    fn from(dto: OrderDto) -> Self {
        let status = match dto.status.as_deref() {
            Some("FILLED") => OrderStatus::Filled,
            Some("CANCELED" | "REJECTED" | "EXPIRED" | "REPLACED") => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        };
        let order_type = match dto.price {
            Some(price) => OrderType::Limit { price },
            None => OrderType::Market,
        };
        Self {
            order_id: dto.order_id,
            status,
            legs: dto
                .order_leg_collection
                .into_iter()
                .map(|leg| OrderLeg {
                    symbol: leg.instrument.symbol,
                    quantity: leg.quantity,
                    instruction: leg.instruction,
                })
                .collect(),
            order_type,
            quantity: dto.quantity,
            entered_at: dto.entered_time,
            filled_at: dto.close_time,
        }
    }
}

fn ticket_to_json(ticket: &OrderTicket) -> serde_json::Value {
    let legs: Vec<_> = ticket
        .legs
        .iter()
        .map(|leg| {
            json!({
                "instruction": leg.instruction,
                "quantity": leg.quantity,
                "instrument": { "symbol": leg.symbol, "assetType": "OPTION" },
            })
        })
        .collect();
    let mut body = json!({
        "session": "NORMAL",
        "duration": match ticket.duration {
            OrderDuration::Day => "DAY",
            OrderDuration::GoodTillCancel => "GOOD_TILL_CANCEL",
        },
        "orderStrategyType": "SINGLE",
        "quantity": ticket.quantity,
        "orderLegCollection": legs,
    });
    match ticket.order_type {
        OrderType::Market => {
            body["orderType"] = json!("MARKET");
        }
        OrderType::Limit { price } => {
            body["orderType"] = json!("LIMIT");
            body["price"] = json!(price);
        }
    }
    if let Some(strategy) = ticket.strategy {
        body["complexOrderStrategyType"] = json!(strategy);
    }
    body
}

#[async_trait]
impl BrokerGateway for SchwabClient {
    async fn fetch_account(&self) -> Result<Account, BrokerError> {
        let response: AccountResponse = self
            .get_json(
                &self.account_path(""),
                &[("fields", "positions".to_string())],
            )
            .await?;
        Ok(Account {
            account_hash: self.config.account_hash.clone(),
            positions: response
                .securities_account
                .positions
                .into_iter()
                .map(|p| AccountPosition {
                    symbol: p.instrument.symbol,
                    average_price: p.average_price,
                    long_quantity: p.long_quantity,
                    short_quantity: p.short_quantity,
                })
                .collect(),
        })
    }

    async fn fetch_option_chain(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<OptionChain, BrokerError> {
        debug!(symbol, %from, %to, "Fetching option chain");
        let response: ChainResponse = self
            .get_json(
                "/marketdata/v1/chains",
                &[
                    ("symbol", symbol.to_string()),
                    ("fromDate", from.to_string()),
                    ("toDate", to.to_string()),
                    ("includeUnderlyingQuote", "true".to_string()),
                ],
            )
            .await?;
        Ok(OptionChain {
            underlying: symbol.to_string(),
            underlying_price: response.underlying_price,
            calls: flatten_chain_map(response.call_exp_date_map, symbol)?,
            puts: flatten_chain_map(response.put_exp_date_map, symbol)?,
        })
    }

    async fn fetch_expiration_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>, BrokerError> {
        let response: ExpirationChainResponse = self
            .get_json(
                "/marketdata/v1/expirationchain",
                &[("symbol", symbol.to_string())],
            )
            .await?;
        Ok(response
            .expiration_list
            .into_iter()
            .map(|e| e.expiration_date)
            .collect())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let response: HashMap<String, QuoteEnvelope> = self
            .get_json(
                &format!("/marketdata/v1/{symbol}/quotes"),
                &[("fields", "quote".to_string())],
            )
            .await?;
        let envelope = response
            .get(symbol)
            .ok_or_else(|| BrokerError::NotAvailable(format!("no quote for {symbol}")))?;
        // Indices report lastPrice instead of mark.
        let mark = envelope
            .quote
            .mark
            .or(envelope.quote.last_price)
            .ok_or_else(|| BrokerError::Malformed(format!("quote for {symbol} has no mark")))?;
        let quote_time = envelope
            .quote
            .quote_time
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or_else(Utc::now);
        Ok(Quote {
            symbol: symbol.to_string(),
            mark,
            quote_time,
        })
    }

    async fn place_order(&self, ticket: &OrderTicket) -> Result<i64, BrokerError> {
        let url = format!("{}{}", self.config.api_url, self.account_path("/orders"));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&ticket_to_json(ticket))
            .send()
            .await?;
        let response = check_status(response)?;
        // The order id only appears as the last segment of the Location
        // header on the 201 response.
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.rsplit('/').next())
            .and_then(|id| id.parse::<i64>().ok())
            .ok_or_else(|| {
                BrokerError::Malformed("order accepted but no order id in Location".to_string())
            })
    }

    async fn fetch_order(&self, order_id: i64) -> Result<BrokerOrder, BrokerError> {
        let response: OrderDto = self
            .get_json(&self.account_path(&format!("/orders/{order_id}")), &[])
            .await?;
        Ok(response.into())
    }

    async fn fetch_orders(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<BrokerOrder>, BrokerError> {
        let now = Utc::now();
        let from = from.unwrap_or_else(|| now - chrono::Duration::days(1));
        let to = to.unwrap_or(now);
        let response: Vec<OrderDto> = self
            .get_json(
                &self.account_path("/orders"),
                &[
                    ("fromEnteredTime", from.to_rfc3339()),
                    ("toEnteredTime", to.to_rfc3339()),
                ],
            )
            .await?;
        Ok(response.into_iter().map(Into::into).collect())
    }
}
