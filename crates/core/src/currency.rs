use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Krw,
    Usd,
    Btc,
    Eth,
    Usdt,
    Usdc,
    Sol,
    Xrp,
}

impl Currency {
    pub const ALL: [Currency; 8] = [
        Self::Krw,
        Self::Usd,
        Self::Btc,
        Self::Eth,
        Self::Usdt,
        Self::Usdc,
        Self::Sol,
        Self::Xrp,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Krw => "KRW",
            Self::Usd => "USD",
            Self::Btc => "BTC",
            Self::Eth => "ETH",
            Self::Usdt => "USDT",
            Self::Usdc => "USDC",
            Self::Sol => "SOL",
            Self::Xrp => "XRP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported currency `{0}`")]
pub struct UnsupportedCurrency(pub String);

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|currency| currency.code() == code)
            .ok_or(UnsupportedCurrency(value.trim().to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    MissingExchangeRate { currency: Currency },
}

impl ConversionWarning {
    pub fn message(&self) -> String {
        match self {
            Self::MissingExchangeRate { currency } => {
                format!("no exchange rate for {currency}; amount treated as 0")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub reference_amount: u64,
    pub warning: Option<ConversionWarning>,
}

/// Static reference-currency rates, quoted as reference units per one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    reference: Currency,
    rates: BTreeMap<Currency, Decimal>,
}

impl RateTable {
    pub fn new(reference: Currency, rates: BTreeMap<Currency, Decimal>) -> Self {
        Self { reference, rates }
    }

    pub fn reference(&self) -> Currency {
        self.reference
    }

    pub fn rate(&self, currency: Currency) -> Option<Decimal> {
        if currency == self.reference {
            return Some(Decimal::ONE);
        }
        self.rates.get(&currency).copied()
    }

    /// Currencies that would convert to 0 with a missing-rate warning.
    pub fn uncovered(&self) -> Vec<Currency> {
        Currency::ALL.into_iter().filter(|currency| self.rate(*currency).is_none()).collect()
    }

    pub fn convert_to_reference(
        &self,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Conversion, EngineError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(EngineError::InvalidAmount {
                reason: format!("amount {amount} must not be negative"),
            });
        }

        let Some(rate) = self.rate(currency) else {
            warn!(
                event_name = "engine.currency.missing_rate",
                currency = %currency,
                reference = %self.reference,
                "no exchange rate configured; converting to 0"
            );
            return Ok(Conversion {
                reference_amount: 0,
                warning: Some(ConversionWarning::MissingExchangeRate { currency }),
            });
        };

        let converted = amount
            .checked_mul(rate)
            .ok_or_else(|| out_of_range(amount, currency))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let reference_amount = converted.to_u64().ok_or_else(|| out_of_range(amount, currency))?;

        Ok(Conversion { reference_amount, warning: None })
    }
}

/// Boundary helper for JSON/CLI inputs that arrive as floating point.
pub fn parse_amount(raw: f64) -> Result<Decimal, EngineError> {
    if !raw.is_finite() {
        return Err(EngineError::InvalidAmount { reason: format!("amount {raw} is not finite") });
    }
    Decimal::from_f64(raw).ok_or_else(|| EngineError::InvalidAmount {
        reason: format!("amount {raw} is outside the supported range"),
    })
}

fn out_of_range(amount: Decimal, currency: Currency) -> EngineError {
    EngineError::InvalidAmount {
        reason: format!("{amount} {currency} exceeds the convertible range"),
    }
}
