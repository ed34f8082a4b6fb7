//! Append-only, dedupe-by-title result persistence.
//!
//! Layout: `<results>/<domain>/execution_<n>/`, with `n` taken from a
//! per-domain counter file. In-stock and without-stock records land in
//! JSON-lines files (plus a human-readable text rendering); discarded URLs
//! go to their own file for later review. Each `append` call performs one
//! durable write per touched file. Reopening the same execution reloads the
//! persisted titles, so a restarted run never re-emits a saved product.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use vitrina_core::record::TITLE_NOT_FOUND;
use vitrina_core::{ClassifiedPage, ProductRecord, TitledUrl};

use crate::StoreError;

const IN_STOCK_JSONL: &str = "products.jsonl";
const WITHOUT_STOCK_JSONL: &str = "products_without_stock.jsonl";
const IN_STOCK_TXT: &str = "products.txt";
const WITHOUT_STOCK_TXT: &str = "products_without_stock.txt";
const DISCARDED_FILE: &str = "discarded_urls.txt";
const PROCESSED_URLS: &str = "processed_urls.txt";
const PROCESSED_TITLES: &str = "processed_titles.txt";
const COUNTER_FILE: &str = "n.txt";

#[derive(Debug, Default, Clone, Copy)]
pub struct StoreTotals {
    pub in_stock: usize,
    pub without_stock: usize,
    pub discarded: usize,
}

impl StoreTotals {
    #[must_use]
    pub fn products(&self) -> usize {
        self.in_stock + self.without_stock
    }
}

/// Outcome of one `append` call.
#[derive(Debug, Default)]
pub struct AppendSummary {
    pub saved_in_stock: usize,
    pub saved_without_stock: usize,
    pub discarded: usize,
    pub duplicates: usize,
}

impl AppendSummary {
    #[must_use]
    pub fn saved_products(&self) -> usize {
        self.saved_in_stock + self.saved_without_stock
    }
}

pub struct ResultStore {
    execution_dir: PathBuf,
    execution: u32,
    seen_titles: HashSet<String>,
    processed_urls: HashSet<String>,
    processed_titles: HashSet<String>,
    totals: StoreTotals,
}

impl ResultStore {
    /// Opens the store for one crawl execution.
    ///
    /// With `execution: None` the per-domain counter is incremented and a
    /// fresh execution directory is created; passing `Some(n)` reopens an
    /// existing execution for resumption, seeding the dedup set from its
    /// persisted records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O failure, an underivable domain name,
    /// or a corrupt counter file.
    pub fn open(
        results_dir: &Path,
        root_url: &str,
        execution: Option<u32>,
    ) -> Result<Self, StoreError> {
        let domain = domain_name(root_url).ok_or_else(|| StoreError::InvalidRoot {
            url: root_url.to_owned(),
        })?;
        let domain_dir = results_dir.join(domain);
        create_dir(&domain_dir)?;

        let execution = match execution {
            Some(n) => n,
            None => next_execution(&domain_dir)?,
        };
        let execution_dir = domain_dir.join(format!("execution_{execution}"));
        create_dir(&execution_dir)?;

        let mut store = Self {
            execution_dir,
            execution,
            seen_titles: HashSet::new(),
            processed_urls: HashSet::new(),
            processed_titles: HashSet::new(),
            totals: StoreTotals::default(),
        };
        store.load_existing()?;
        Ok(store)
    }

    #[must_use]
    pub fn execution(&self) -> u32 {
        self.execution
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.execution_dir
    }

    #[must_use]
    pub fn totals(&self) -> StoreTotals {
        self.totals
    }

    /// URLs already handled in this execution, for pre-fetch filtering.
    #[must_use]
    pub fn processed_urls(&self) -> &HashSet<String> {
        &self.processed_urls
    }

    /// Titles already handled in this execution.
    #[must_use]
    pub fn processed_titles(&self) -> &HashSet<String> {
        &self.processed_titles
    }

    /// Copies the site configuration into the execution directory so a
    /// result set documents the selectors that produced it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the copy fails.
    pub fn snapshot_config(&self, config_path: &Path) -> Result<(), StoreError> {
        let name = config_path
            .file_name()
            .map_or_else(|| "site.yaml".into(), std::ffi::OsStr::to_owned);
        let target = self.execution_dir.join(name);
        fs::copy(config_path, &target).map_err(|e| StoreError::Io {
            path: target.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Appends one classified batch: records whose title was already
    /// persisted are skipped, survivors are appended in one pass per file,
    /// and discarded pages are logged to their review file unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when a write fails.
    pub fn append(&mut self, batch: &[ClassifiedPage]) -> Result<AppendSummary, StoreError> {
        let mut summary = AppendSummary::default();
        let mut in_stock_jsonl = String::new();
        let mut in_stock_txt = String::new();
        let mut without_stock_jsonl = String::new();
        let mut without_stock_txt = String::new();
        let mut discarded_lines = String::new();

        for page in batch {
            match page {
                ClassifiedPage::InStock(record) => {
                    if self.remember_title(&record.title) {
                        append_record(&mut in_stock_jsonl, &mut in_stock_txt, record);
                        summary.saved_in_stock += 1;
                    } else {
                        summary.duplicates += 1;
                    }
                }
                ClassifiedPage::WithoutStock(record) => {
                    if self.remember_title(&record.title) {
                        append_record(&mut without_stock_jsonl, &mut without_stock_txt, record);
                        summary.saved_without_stock += 1;
                    } else {
                        summary.duplicates += 1;
                    }
                }
                ClassifiedPage::Discarded(discarded) => {
                    discarded_lines.push_str(&discarded.url);
                    discarded_lines.push('\n');
                    summary.discarded += 1;
                }
            }
        }

        self.append_file(IN_STOCK_JSONL, &in_stock_jsonl)?;
        self.append_file(IN_STOCK_TXT, &in_stock_txt)?;
        self.append_file(WITHOUT_STOCK_JSONL, &without_stock_jsonl)?;
        self.append_file(WITHOUT_STOCK_TXT, &without_stock_txt)?;
        self.append_file(DISCARDED_FILE, &discarded_lines)?;

        self.totals.in_stock += summary.saved_in_stock;
        self.totals.without_stock += summary.saved_without_stock;
        self.totals.discarded += summary.discarded;

        Ok(summary)
    }

    /// Records a batch of fetched `{url, title}` pairs so later runs of the
    /// same execution can filter them before re-fetching. Pages whose title
    /// never resolved keep their URL on file but contribute no title.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when a write fails.
    pub fn record_processed(&mut self, pairs: &[TitledUrl]) -> Result<(), StoreError> {
        let mut url_lines = String::new();
        let mut title_lines = String::new();
        for pair in pairs {
            if self.processed_urls.insert(pair.url.clone()) {
                url_lines.push_str(&pair.url);
                url_lines.push('\n');
            }
            if pair.title != TITLE_NOT_FOUND && self.processed_titles.insert(pair.title.clone()) {
                title_lines.push_str(&pair.title);
                title_lines.push('\n');
            }
        }
        self.append_file(PROCESSED_URLS, &url_lines)?;
        self.append_file(PROCESSED_TITLES, &title_lines)?;
        Ok(())
    }

    /// `true` when the title was new and is now reserved.
    fn remember_title(&mut self, title: &str) -> bool {
        if self.seen_titles.contains(title) {
            tracing::info!(title = %title, "duplicate product skipped");
            return false;
        }
        self.seen_titles.insert(title.to_owned());
        true
    }

    fn append_file(&self, name: &str, content: &str) -> Result<(), StoreError> {
        if content.is_empty() {
            return Ok(());
        }
        let path = self.execution_dir.join(name);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        file.write_all(content.as_bytes()).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Seeds dedup and read-back state from a previous run of the same
    /// execution. Unreadable record lines are skipped with a warning rather
    /// than aborting the whole run.
    fn load_existing(&mut self) -> Result<(), StoreError> {
        for (file, without_stock) in [(IN_STOCK_JSONL, false), (WITHOUT_STOCK_JSONL, true)] {
            let path = self.execution_dir.join(file);
            let Some(content) = read_optional(&path)? else {
                continue;
            };
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<ProductRecord>(line) {
                    Ok(record) => {
                        self.seen_titles.insert(record.title);
                        if without_stock {
                            self.totals.without_stock += 1;
                        } else {
                            self.totals.in_stock += 1;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "skipping corrupt record line");
                    }
                }
            }
        }

        if let Some(content) = read_optional(&self.execution_dir.join(DISCARDED_FILE))? {
            self.totals.discarded += content.lines().filter(|l| !l.trim().is_empty()).count();
        }
        if let Some(content) = read_optional(&self.execution_dir.join(PROCESSED_URLS))? {
            self.processed_urls
                .extend(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(ToString::to_string));
        }
        if let Some(content) = read_optional(&self.execution_dir.join(PROCESSED_TITLES))? {
            self.processed_titles
                .extend(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(ToString::to_string));
        }
        Ok(())
    }
}

fn append_record(jsonl: &mut String, txt: &mut String, record: &ProductRecord) {
    match serde_json::to_string(record) {
        Ok(line) => {
            jsonl.push_str(&line);
            jsonl.push('\n');
            txt.push_str(&render_txt(record));
        }
        Err(err) => {
            tracing::warn!(title = %record.title, error = %err, "record not serializable — skipped");
        }
    }
}

/// Human-readable rendering, one block per product.
fn render_txt(record: &ProductRecord) -> String {
    format!(
        "{}\nPrice: {}\n\n{}\n\nExtracted from [{}]({})\n\n-------\n\n",
        record.title, record.price, record.description, record.title, record.url
    )
}

fn create_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// Reads, increments, and writes back the per-domain execution counter.
fn next_execution(domain_dir: &Path) -> Result<u32, StoreError> {
    let path = domain_dir.join(COUNTER_FILE);
    let current = match read_optional(&path)? {
        Some(content) => {
            let trimmed = content.trim();
            trimmed.parse::<u32>().map_err(|_| StoreError::BadCounter {
                path: path.display().to_string(),
                content: trimmed.to_owned(),
            })?
        }
        None => 0,
    };
    let next = current + 1;
    fs::write(&path, next.to_string()).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(next)
}

/// Derives the results directory name from the root URL: host without the
/// scheme, path, or a leading `www.`.
fn domain_name(root_url: &str) -> Option<String> {
    let without_scheme = root_url
        .split_once("://")
        .map_or(root_url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_owned();
    (!host.is_empty()).then_some(host)
}
