//! Brent price series loading
//!
//! The series is scraped from a table of an HTML page, cleaned into an
//! [`ObservedSeries`] and memoized for the lifetime of the process.

use crate::cache::MemoCache;
use crate::config::SourceConfig;
use crate::error::{ForecastError, Result};
use crate::html::{extract_tables, HtmlTable};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use polars::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the date column
pub const DATE_COLUMN: &str = "Data";
/// Name of the price column
pub const PRICE_COLUMN: &str = "Preco_Brent_FOB";

/// Date formats accepted for scraped dates, day first
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

static SERIES_CACHE: Lazy<MemoCache<String, ObservedSeries>> = Lazy::new(MemoCache::new);

/// One scraped row before any conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub date: String,
    pub price: String,
}

/// Daily Brent prices indexed by date
///
/// Dates are strictly increasing and prices are finite. A series always
/// holds at least one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSeries {
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

impl ObservedSeries {
    /// Build a series from (date, price) pairs already in date order
    pub fn from_observations(observations: Vec<(NaiveDate, f64)>) -> Result<Self> {
        if observations.is_empty() {
            return Err(ForecastError::DataSource(
                "series has no observations".to_string(),
            ));
        }
        if let Some(pair) = observations.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(ForecastError::DataSource(format!(
                "dates must be strictly increasing, found {} after {}",
                pair[1].0, pair[0].0
            )));
        }
        if let Some((date, price)) = observations.iter().find(|(_, p)| !p.is_finite()) {
            return Err(ForecastError::Parse(format!(
                "price {} on {} is not finite",
                price, date
            )));
        }

        let (dates, prices) = observations.into_iter().unzip();
        Ok(Self { dates, prices })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.prices.iter().copied())
    }

    /// The trailing `n` observations (all of them when `n` exceeds the length)
    pub fn tail(&self, n: usize) -> (&[NaiveDate], &[f64]) {
        let start = self.len().saturating_sub(n);
        (&self.dates[start..], &self.prices[start..])
    }

    /// Content hash of dates and prices
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.dates.hash(&mut hasher);
        for price in &self.prices {
            price.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Tabular view with columns `Data` and `Preco_Brent_FOB`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Series::new(DATE_COLUMN, self.dates.as_slice()),
            Series::new(PRICE_COLUMN, self.prices.as_slice()),
        ])?;
        Ok(df)
    }
}

/// Something that yields the HTML document holding the series
pub trait DocumentSource: Send + Sync {
    /// Retrieve the whole document
    fn fetch(&self) -> Result<String>;

    /// Stable identity of the source, used as cache key
    fn source_id(&self) -> String;
}

/// Page fetched over HTTP with a single GET
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self) -> Result<String> {
        info!(url = %self.url, "Fetching Brent price page");

        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::DataSource(format!(
                "{} answered with HTTP {}",
                self.url, status
            )));
        }

        Ok(response.text()?)
    }

    fn source_id(&self) -> String {
        self.url.clone()
    }
}

/// Saved snapshot of the page on local disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn fetch(&self) -> Result<String> {
        info!(path = %self.path.display(), "Reading Brent price snapshot");

        let bytes = fs::read(&self.path).map_err(|e| {
            ForecastError::DataSource(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn source_id(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Turns a source document into an [`ObservedSeries`]
#[derive(Debug, Clone)]
pub struct SeriesLoader<S> {
    source: S,
    table_index: usize,
}

impl SeriesLoader<HttpSource> {
    /// Loader for the configured remote page
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(Self::new(HttpSource::new(config)?, config.table_index))
    }
}

impl<S: DocumentSource> SeriesLoader<S> {
    pub fn new(source: S, table_index: usize) -> Self {
        Self {
            source,
            table_index,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn table_index(&self) -> usize {
        self.table_index
    }

    /// Fetch and parse the series, bypassing the cache
    pub fn load_series(&self) -> Result<ObservedSeries> {
        let document = self.source.fetch()?;
        self.parse_document(&document)
    }

    /// Parse the series table of an already fetched document
    pub fn parse_document(&self, document: &str) -> Result<ObservedSeries> {
        let tables = extract_tables(document);
        let table = tables.get(self.table_index).ok_or_else(|| {
            ForecastError::DataSource(format!(
                "expected a table at index {}, the document has {} tables",
                self.table_index,
                tables.len()
            ))
        })?;

        let series = clean_records(raw_records(table))?;
        info!(
            observations = series.len(),
            first = %series.first_date(),
            last = %series.last_date(),
            "Loaded Brent price series"
        );
        Ok(series)
    }

    /// Cache key of this loader's series
    pub fn cache_key(&self) -> String {
        format!("{}#table{}", self.source.source_id(), self.table_index)
    }

    /// Memoized [`load_series`](Self::load_series)
    pub fn load_cached(&self) -> Result<Arc<ObservedSeries>> {
        SERIES_CACHE.get_or_try_init(self.cache_key(), || self.load_series())
    }

    /// The memoized series, if one has been loaded
    pub fn cached(&self) -> Option<Arc<ObservedSeries>> {
        SERIES_CACHE.get(&self.cache_key())
    }

    /// Forget the memoized series so the next access fetches again
    pub fn refresh(&self) -> bool {
        debug!(key = %self.cache_key(), "Invalidating cached series");
        SERIES_CACHE.invalidate(&self.cache_key())
    }
}

/// Drop every memoized series
pub fn clear_series_cache() {
    SERIES_CACHE.clear();
}

/// The first two cells of every row with at least two cells
pub fn raw_records(table: &HtmlTable) -> Vec<RawRecord> {
    table
        .rows()
        .iter()
        .filter(|row| row.len() >= 2)
        .map(|row| RawRecord {
            date: row[0].clone(),
            price: row[1].clone(),
        })
        .collect()
}

/// Convert scraped rows into a sorted, duplicate-free series
///
/// Header rows are skipped, rows with a missing date or price are dropped and
/// the first occurrence of a repeated date wins.
pub fn clean_records(records: Vec<RawRecord>) -> Result<ObservedSeries> {
    let total = records.len();
    let mut rows = Vec::with_capacity(total);
    let mut missing = 0;

    for record in &records {
        let date = record.date.trim();
        if date == DATE_COLUMN {
            continue;
        }
        if is_missing(date) || is_missing(&record.price) {
            missing += 1;
            continue;
        }
        rows.push((parse_day_first_date(date)?, parse_decimal_ptbr(&record.price)?));
    }

    rows.sort_by_key(|(date, _)| *date);
    let parsed = rows.len();
    rows.dedup_by_key(|(date, _)| *date);

    debug!(
        total,
        missing,
        duplicates = parsed - rows.len(),
        "Cleaned scraped rows"
    );

    if rows.is_empty() {
        return Err(ForecastError::DataSource(
            "the selected table has no data rows".to_string(),
        ));
    }
    ObservedSeries::from_observations(rows)
}

/// Whether a cell stands for a missing value
pub fn is_missing(token: &str) -> bool {
    matches!(token.trim(), "" | "-" | "..." | "nan" | "NaN")
}

/// Parse a day-first date such as `02/01/2020`; ISO dates are also accepted
pub fn parse_day_first_date(token: &str) -> Result<NaiveDate> {
    let token = token.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
        .ok_or_else(|| ForecastError::Parse(format!("invalid date '{}'", token)))
}

/// Parse a decimal with `.` as thousands separator and `,` as decimal mark
pub fn parse_decimal_ptbr(token: &str) -> Result<f64> {
    let normalized: String = token
        .trim()
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ForecastError::Parse(format!("invalid price '{}'", token.trim())))
}
