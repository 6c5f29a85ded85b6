//! Client-management dataset: CSV loading with a TTL cache, country
//! filtering, in-memory serialization for upload, and the overview KPIs.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Canonical column order, preserved through serialize → parse round trips.
pub const COLUMNS: &[&str] = &[
    "client_id",
    "country",
    "trial_date",
    "paid",
    "active",
    "amazon",
    "ebay",
    "shopify",
    "other_marketplace",
    "other_webstore",
    "signup_channel",
    "device",
];

/// One client row. Missing marketplace values default to 0; unparsable trial
/// dates become None rather than failing the whole load.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub client_id: String,
    pub country: Option<String>,
    pub trial_date: Option<NaiveDate>,
    pub paid: bool,
    pub active: bool,
    pub amazon: f64,
    pub ebay: f64,
    pub shopify: f64,
    pub other_marketplace: f64,
    pub other_webstore: f64,
    pub signup_channel: Option<String>,
    pub device: Option<String>,
}

/// Raw row as it appears in the sheet: everything optional, everything text.
#[derive(Debug, Deserialize)]
struct RawRecord {
    client_id: Option<String>,
    country: Option<String>,
    trial_date: Option<String>,
    paid: Option<String>,
    active: Option<String>,
    amazon: Option<String>,
    ebay: Option<String>,
    shopify: Option<String>,
    other_marketplace: Option<String>,
    other_webstore: Option<String>,
    signup_channel: Option<String>,
    device: Option<String>,
}

fn parse_flag(raw: &Option<String>) -> bool {
    match raw.as_deref().map(str::trim) {
        Some("1") | Some("1.0") | Some("true") | Some("True") | Some("TRUE") => true,
        _ => false,
    }
}

fn parse_marketplace(raw: &Option<String>) -> f64 {
    raw.as_deref()
        .map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn parse_trial_date(raw: &Option<String>) -> Option<NaiveDate> {
    let s = raw.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl From<RawRecord> for ClientRecord {
    fn from(raw: RawRecord) -> Self {
        ClientRecord {
            trial_date: parse_trial_date(&raw.trial_date),
            paid: parse_flag(&raw.paid),
            active: parse_flag(&raw.active),
            amazon: parse_marketplace(&raw.amazon),
            ebay: parse_marketplace(&raw.ebay),
            shopify: parse_marketplace(&raw.shopify),
            other_marketplace: parse_marketplace(&raw.other_marketplace),
            other_webstore: parse_marketplace(&raw.other_webstore),
            client_id: raw.client_id.unwrap_or_default(),
            country: non_empty(raw.country),
            signup_channel: non_empty(raw.signup_channel),
            device: non_empty(raw.device),
        }
    }
}

impl ClientRecord {
    pub fn any_marketplace(&self) -> bool {
        self.amazon > 0.0
            || self.ebay > 0.0
            || self.shopify > 0.0
            || self.other_marketplace > 0.0
            || self.other_webstore > 0.0
    }
}

/// Parse CSV bytes into typed records, preserving row order.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<ClientRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let mut records = Vec::new();
    for row in reader.deserialize::<RawRecord>() {
        let raw = row.context("Failed to parse dataset row")?;
        records.push(ClientRecord::from(raw));
    }
    Ok(records)
}

/// Serialize records to CSV in memory, in canonical column order. The bytes
/// are what gets uploaded for the remote code-execution tool; re-parsing them
/// yields the same logical rows and columns.
pub fn to_csv(records: &[ClientRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for r in records {
        writer.write_record(&[
            r.client_id.clone(),
            r.country.clone().unwrap_or_default(),
            r.trial_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            if r.paid { "1" } else { "0" }.to_string(),
            if r.active { "1" } else { "0" }.to_string(),
            r.amazon.to_string(),
            r.ebay.to_string(),
            r.shopify.to_string(),
            r.other_marketplace.to_string(),
            r.other_webstore.to_string(),
            r.signup_channel.clone().unwrap_or_default(),
            r.device.clone().unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV writer: {e}"))
}

/// Keep only records whose country is in `countries`. An empty filter keeps
/// everything (the dashboard's default is all countries selected).
pub fn filter_by_countries(records: &[ClientRecord], countries: &[String]) -> Vec<ClientRecord> {
    if countries.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| {
            r.country
                .as_deref()
                .is_some_and(|c| countries.iter().any(|want| want == c))
        })
        .cloned()
        .collect()
}

/// Distinct countries, sorted, for the filter control.
pub fn countries(records: &[ClientRecord]) -> Vec<String> {
    let mut set: Vec<String> = records
        .iter()
        .filter_map(|r| r.country.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    set.sort();
    set
}

/// Overview KPIs over a (filtered) dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetMetrics {
    pub total_clients: usize,
    pub active_clients: usize,
    pub inactive_clients: usize,
    /// Trial-to-paid conversion, percent of clients with a trial date.
    pub conversion_rate: f64,
    /// Share of clients with at least one marketplace connection, percent.
    pub marketplace_share: f64,
    /// Distinct trial signups per month, "YYYY-MM" keys in ascending order.
    pub monthly_trial_signups: Vec<(String, usize)>,
}

impl DatasetMetrics {
    pub fn compute(records: &[ClientRecord]) -> Self {
        let unique =
            |pred: &dyn Fn(&ClientRecord) -> bool| -> usize {
                records
                    .iter()
                    .filter(|r| pred(r))
                    .map(|r| r.client_id.as_str())
                    .collect::<HashSet<_>>()
                    .len()
            };

        let total_clients = unique(&|_| true);
        let active_clients = unique(&|r| r.active);
        let trial_clients = unique(&|r| r.trial_date.is_some());
        let converted_clients = unique(&|r| r.trial_date.is_some() && r.paid);
        let marketplace_clients = unique(&|r| r.any_marketplace());

        let conversion_rate = if trial_clients > 0 {
            converted_clients as f64 / trial_clients as f64 * 100.0
        } else {
            0.0
        };
        let marketplace_share = if total_clients > 0 {
            marketplace_clients as f64 / total_clients as f64 * 100.0
        } else {
            0.0
        };

        let mut by_month: BTreeMap<String, HashSet<&str>> = BTreeMap::new();
        for r in records {
            if let Some(date) = r.trial_date {
                by_month
                    .entry(date.format("%Y-%m").to_string())
                    .or_default()
                    .insert(r.client_id.as_str());
            }
        }
        let monthly_trial_signups = by_month
            .into_iter()
            .map(|(month, ids)| (month, ids.len()))
            .collect();

        Self {
            total_clients,
            active_clients,
            inactive_clients: total_clients - active_clients,
            conversion_rate,
            marketplace_share,
            monthly_trial_signups,
        }
    }
}

struct CacheEntry {
    fetched_at: Instant,
    records: Arc<Vec<ClientRecord>>,
}

/// Cached sheet fetch. The sheet is re-downloaded at most once per TTL; a
/// load failure is reported to the caller and the stale entry, if any, is
/// kept for the next attempt.
pub struct DatasetCache {
    url: String,
    ttl: Duration,
    http: reqwest::Client,
    inner: RwLock<Option<CacheEntry>>,
}

impl DatasetCache {
    pub fn new(url: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            url: url.into(),
            ttl: Duration::from_secs(ttl_secs),
            http: reqwest::Client::new(),
            inner: RwLock::new(None),
        }
    }

    pub async fn records(&self) -> Result<Arc<Vec<ClientRecord>>> {
        {
            let guard = self.inner.read().await;
            if let Some(entry) = guard.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&entry.records));
                }
            }
        }

        let mut guard = self.inner.write().await;
        // Another task may have refreshed while we waited for the write lock
        if let Some(entry) = guard.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&entry.records));
            }
        }

        let records = Arc::new(self.fetch().await?);
        *guard = Some(CacheEntry {
            fetched_at: Instant::now(),
            records: Arc::clone(&records),
        });
        Ok(records)
    }

    async fn fetch(&self) -> Result<Vec<ClientRecord>> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch dataset from {}", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Dataset source returned {status}"));
        }
        let bytes = resp.bytes().await.context("Failed to read dataset body")?;
        parse_csv(&bytes)
    }
}
