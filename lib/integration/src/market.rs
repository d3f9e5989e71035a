//! Mandi commodity prices from the data.gov.in daily price resource.

use crate::error::SourceError;
use crate::source::{AuxiliarySource, DataSourceKind, SourceQuery};
use crate::text::number;
use async_trait::async_trait;
use chrono::Utc;
use krishi_core::{Language, LanguageTable};
use reqwest::Client;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Daily commodity price resource.
pub const DEFAULT_MARKET_BASE_URL: &str =
    "https://api.data.gov.in/resource/9ef84268-d588-465a-a308-a864a43d0070";

/// Maximum records requested per lookup.
pub const RECORD_LIMIT: u32 = 10;

/// Commodities farmers ask about most, in match priority order.
pub const POPULAR_COMMODITIES: &[&str] = &[
    "Rice", "Wheat", "Maize", "Bajra", "Jowar", "Arhar", "Moong", "Urad", "Gram", "Masoor",
    "Groundnut", "Sunflower", "Soyabean", "Sesamum", "Cotton", "Sugarcane", "Jute", "Onion",
    "Potato", "Tomato", "Chilli", "Turmeric", "Coriander", "Cumin",
];

/// One mandi price observation, prices in rupees per quintal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub commodity: String,
    pub variety: String,
    pub market: String,
    pub state: String,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    commodity: Option<String>,
    variety: Option<String>,
    market: Option<String>,
    state: Option<String>,
    min_price: Option<JsonValue>,
    max_price: Option<JsonValue>,
    modal_price: Option<JsonValue>,
    arrival_date: Option<String>,
}

impl From<RawRecord> for MarketPrice {
    fn from(raw: RawRecord) -> Self {
        let text = |value: Option<String>, fallback: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            commodity: text(raw.commodity, "Unknown"),
            variety: text(raw.variety, "Common"),
            market: text(raw.market, "Unknown Market"),
            state: text(raw.state, "Unknown State"),
            min_price: lenient_price(raw.min_price.as_ref()),
            max_price: lenient_price(raw.max_price.as_ref()),
            modal_price: lenient_price(raw.modal_price.as_ref()),
            date: raw
                .arrival_date
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
        }
    }
}

/// Prices arrive as strings or numbers; anything unreadable is zero.
fn lenient_price(value: Option<&JsonValue>) -> f64 {
    match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

struct MarketLabels {
    title: &'static str,
    commodity: &'static str,
    variety: &'static str,
    market: &'static str,
    min_price: &'static str,
    max_price: &'static str,
    modal_price: &'static str,
    date: &'static str,
    unit: &'static str,
}

static LABELS: LanguageTable<MarketLabels> = LanguageTable::complete(
    MarketLabels {
        title: "Market Prices",
        commodity: "Commodity",
        variety: "Variety",
        market: "Market",
        min_price: "Min Price",
        max_price: "Max Price",
        modal_price: "Modal Price",
        date: "Date",
        unit: "per quintal",
    },
    MarketLabels {
        title: "बाजार मूल्य",
        commodity: "वस्तु",
        variety: "किस्म",
        market: "बाजार",
        min_price: "न्यूनतम मूल्य",
        max_price: "अधिकतम मूल्य",
        modal_price: "मॉडल मूल्य",
        date: "दिनांक",
        unit: "प्रति क्विंटल",
    },
    MarketLabels {
        title: "ಮಾರುಕಟ್ಟೆ ಬೆಲೆಗಳು",
        commodity: "ಸರಕು",
        variety: "ವಿಧ",
        market: "ಮಾರುಕಟ್ಟೆ",
        min_price: "ಕನಿಷ್ಠ ಬೆಲೆ",
        max_price: "ಗರಿಷ್ಠ ಬೆಲೆ",
        modal_price: "ಮಾದರಿ ಬೆಲೆ",
        date: "ದಿನಾಂಕ",
        unit: "ಪ್ರತಿ ಕ್ವಿಂಟಲ್",
    },
    MarketLabels {
        title: "മാർക്കറ്റ് വിലകൾ",
        commodity: "ചരക്ക്",
        variety: "ഇനം",
        market: "മാർക്കറ്റ്",
        min_price: "കുറഞ്ഞ വില",
        max_price: "കൂടിയ വില",
        modal_price: "മോഡൽ വില",
        date: "തീയതി",
        unit: "ഒരു ക്വിന്റലിന്",
    },
);

/// Formats prices as a numbered list in `language`.
#[must_use]
pub fn format_market_prices(prices: &[MarketPrice], language: Language) -> String {
    let t = LABELS.resolve(language);
    let mut out = format!("{}:\n\n", t.title);
    for (i, p) in prices.iter().enumerate() {
        out.push_str(&format!("{}. {}: {}\n", i + 1, t.commodity, p.commodity));
        out.push_str(&format!("   {}: {}\n", t.variety, p.variety));
        out.push_str(&format!("   {}: {}, {}\n", t.market, p.market, p.state));
        for (label, price) in [
            (t.min_price, p.min_price),
            (t.max_price, p.max_price),
            (t.modal_price, p.modal_price),
        ] {
            out.push_str(&format!("   {label}: ₹{} {}\n", number(price), t.unit));
        }
        out.push_str(&format!("   {}: {}\n\n", t.date, p.date));
    }
    out
}

/// Settings for [`MarketSource`].
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_MARKET_BASE_URL.to_string(),
        }
    }
}

/// Market price source. The query's location is used as the state filter.
#[derive(Debug, Clone)]
pub struct MarketSource {
    client: Client,
    config: MarketConfig,
}

impl MarketSource {
    #[must_use]
    pub fn new(client: Client, config: MarketConfig) -> Self {
        Self { client, config }
    }

    /// Looks up recent prices for `commodity`, optionally within `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured, the request fails, or
    /// no records match.
    pub async fn commodity_prices(
        &self,
        commodity: &str,
        state: Option<&str>,
    ) -> Result<Vec<MarketPrice>, Report<SourceError>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(SourceError::NotConfigured {
                source: DataSourceKind::Market,
            })?;

        let limit = RECORD_LIMIT.to_string();
        let mut params = vec![
            ("api-key", api_key),
            ("format", "json"),
            ("limit", limit.as_str()),
            ("filters[commodity]", commodity),
        ];
        if let Some(state) = state {
            params.push(("filters[state]", state));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed {
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SourceError::UpstreamStatus {
                status: response.status().as_u16(),
            }
            .into());
        }
        let body: RecordsResponse =
            response
                .json()
                .await
                .map_err(|e| SourceError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        if body.records.is_empty() {
            return Err(SourceError::NoData {
                source: DataSourceKind::Market,
            }
            .into());
        }
        debug!(commodity, records = body.records.len(), "Fetched market prices");
        Ok(body.records.into_iter().map(MarketPrice::from).collect())
    }
}

#[async_trait]
impl AuxiliarySource for MarketSource {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Market
    }

    async fn fetch_block(&self, query: &SourceQuery) -> Result<String, Report<SourceError>> {
        let commodity = query
            .commodity
            .as_deref()
            .ok_or(SourceError::MissingParameter {
                source: DataSourceKind::Market,
                parameter: "commodity",
            })?;
        let prices = self
            .commodity_prices(commodity, query.location.as_deref())
            .await?;
        Ok(format_market_prices(&prices, query.language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price() -> MarketPrice {
        MarketPrice {
            commodity: "Rice".to_string(),
            variety: "Sona Masoori".to_string(),
            market: "Mysore".to_string(),
            state: "Karnataka".to_string(),
            min_price: 2100.0,
            max_price: 2450.5,
            modal_price: 2300.0,
            date: "12/09/2024".to_string(),
        }
    }

    #[test]
    fn raw_records_are_parsed_leniently() {
        let raw: RawRecord = serde_json::from_value(serde_json::json!({
            "commodity": "Onion",
            "market": "Lasalgaon",
            "min_price": "1500",
            "max_price": 1800,
            "modal_price": "n/a",
            "arrival_date": "12/09/2024"
        }))
        .expect("deserialize");

        let price = MarketPrice::from(raw);

        assert_eq!(price.commodity, "Onion");
        assert_eq!(price.variety, "Common");
        assert_eq!(price.state, "Unknown State");
        assert_eq!(price.min_price, 1500.0);
        assert_eq!(price.max_price, 1800.0);
        assert_eq!(price.modal_price, 0.0);
    }

    #[test]
    fn english_block_lists_prices_per_quintal() {
        let block = format_market_prices(&[price()], Language::En);

        assert!(block.starts_with("Market Prices:\n\n1. Commodity: Rice\n"));
        assert!(block.contains("   Market: Mysore, Karnataka\n"));
        assert!(block.contains("   Min Price: ₹2100 per quintal\n"));
        assert!(block.contains("   Max Price: ₹2450.5 per quintal\n"));
        assert!(block.contains("   Date: 12/09/2024\n"));
    }

    #[test]
    fn labels_follow_language_and_output_is_deterministic() {
        let kn = format_market_prices(&[price()], Language::Kn);
        assert!(kn.starts_with("ಮಾರುಕಟ್ಟೆ ಬೆಲೆಗಳು:"));
        assert_eq!(kn, format_market_prices(&[price()], Language::Kn));
        assert!(LABELS.missing().is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let source = MarketSource::new(Client::new(), MarketConfig::default());
        let query = SourceQuery::new(Language::En, "price of rice")
            .with_commodity(Some("Rice".to_string()));

        let err = source.fetch_block(&query).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn missing_commodity_is_rejected_before_any_request() {
        let source = MarketSource::new(
            Client::new(),
            MarketConfig {
                api_key: Some("key".to_string()),
                ..MarketConfig::default()
            },
        );
        let err = source
            .fetch_block(&SourceQuery::new(Language::En, "mandi rates"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("commodity"));
    }
}
