//! Card search and image download against the Scryfall API.
//!
//! ## Lookup flow
//!
//! ```text
//! name ──▶ /cards/named?exact= ──▶ oracle_id
//!                                     │
//!            ┌────────────────────────┘
//!            ▼
//! /cards/search?q=oracleid:<id> lang:<l> unique:prints   (one query per language,
//!            │                                             following next_page)
//!            ▼
//! printings ──▶ group_printings / pick_printing ──▶ download
//! ```
//!
//! Every failure here is per card: a name that is not found or a download that
//! breaks is reported in that card's [`FetchStatus`] and the rest of the deck
//! continues. Only an unusable download directory stops [`fetch_deck`].

use crate::config::SheetConfig;
use crate::decklist::DeckEntry;
use crate::error::{ItemError, ProxyError};
use crate::pipeline::input;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_LENGTH};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Production API root.
pub const SCRYFALL_API: &str = "https://api.scryfall.com";

/// Pause between consecutive API calls in a deck fetch. Scryfall asks
/// clients to stay under ten requests per second.
pub const REQUEST_DELAY: Duration = Duration::from_millis(100);

const USER_AGENT: &str = concat!("proxysheet/", env!("CARGO_PKG_VERSION"));

// ── Models ───────────────────────────────────────────────────────────────

/// The subset of a Scryfall card object this crate uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub oracle_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub card_faces: Vec<CardFace>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUris {
    #[serde(default)]
    pub png: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl Card {
    /// URL of the full-resolution PNG scan.
    ///
    /// Double-faced cards carry images per face; the front face is used. Cards
    /// whose faces share one image (split, adventure) fall back to the
    /// card-level URI.
    pub fn max_quality_image_url(&self) -> Option<&str> {
        self.card_faces
            .first()
            .and_then(|f| f.image_uris.as_ref())
            .and_then(|u| u.png.as_deref())
            .or_else(|| self.image_uris.as_ref().and_then(|u| u.png.as_deref()))
    }

    /// `Set Name #123 [en]`, for status lines.
    pub fn label(&self) -> String {
        format!("{} #{} [{}]", self.set_name, self.collector_number, self.lang)
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<Card>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    details: String,
}

// ── Grouping ─────────────────────────────────────────────────────────────

/// One printing slot (set + collector number) of a card, in up to two
/// languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub set_name: String,
    pub collector_number: String,
    /// The English printing.
    pub primary: Option<Card>,
    /// The first non-English printing seen for this slot.
    pub alternate: Option<Card>,
}

impl Edition {
    /// The English printing when there is one, else the alternate.
    pub fn preferred(&self) -> Option<&Card> {
        self.primary.as_ref().or(self.alternate.as_ref())
    }
}

/// Every edition found for one card name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardGroup {
    pub name: String,
    pub editions: Vec<Edition>,
}

/// Group printings by card name (sorted), then by set and collector number
/// (case-insensitive, first-seen order).
pub fn group_printings(cards: Vec<Card>) -> Vec<CardGroup> {
    let mut by_name: BTreeMap<String, Vec<Edition>> = BTreeMap::new();
    for card in cards {
        let editions = by_name.entry(card.name.clone()).or_default();
        let slot = editions.iter().position(|e| {
            e.set_name.to_lowercase() == card.set_name.to_lowercase()
                && e.collector_number.to_lowercase() == card.collector_number.to_lowercase()
        });
        let idx = match slot {
            Some(i) => i,
            None => {
                editions.push(Edition {
                    set_name: card.set_name.clone(),
                    collector_number: card.collector_number.clone(),
                    primary: None,
                    alternate: None,
                });
                editions.len() - 1
            }
        };
        let edition = &mut editions[idx];
        if card.lang == "en" {
            edition.primary.get_or_insert(card);
        } else {
            edition.alternate.get_or_insert(card);
        }
    }
    by_name
        .into_iter()
        .map(|(name, editions)| CardGroup { name, editions })
        .collect()
}

/// The first printing with a downloadable image, honouring `langs` in order.
pub fn pick_printing<'a>(cards: &'a [Card], langs: &[String]) -> Option<&'a Card> {
    langs.iter().find_map(|lang| {
        cards
            .iter()
            .find(|c| &c.lang == lang && c.max_quality_image_url().is_some())
    })
}

/// Local file name for a downloaded image: the URL basename without its query
/// string, prefixed with `(Nx)` when more than one copy is wanted.
pub fn download_file_name(url: &str, quantity: u32) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let base = path.rsplit('/').next().unwrap_or(path);
    let base = if base.is_empty() { "card.png" } else { base };
    if quantity > 1 {
        format!("({quantity}x){base}")
    } else {
        base.to_string()
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Thin async client for the endpoints this crate needs.
#[derive(Debug, Clone)]
pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl ScryfallClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ProxyError> {
        Self::with_base_url(SCRYFALL_API, timeout_secs)
    }

    pub fn from_config(config: &SheetConfig) -> Result<Self, ProxyError> {
        Self::new(config.download_timeout_secs)
    }

    /// Client against another API root, e.g. a local mirror.
    pub fn with_base_url(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, ProxyError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json;q=0.9,*/*;q=0.8"));
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProxyError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn transfer_error(&self, url: &str, e: reqwest::Error) -> ItemError {
        let reason = if e.is_timeout() {
            format!("timed out after {}s", self.timeout_secs)
        } else {
            e.to_string()
        };
        ItemError::TransferFailure {
            url: url.to_string(),
            reason,
        }
    }

    /// Exact-name lookup of the English card.
    pub async fn named(&self, name: &str) -> Result<Card, ItemError> {
        let url = format!("{}/cards/named", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("exact", name), ("lang", "en")])
            .send()
            .await
            .map_err(|e| self.transfer_error(&url, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            let detail = resp
                .json::<ApiError>()
                .await
                .map(|e| e.details)
                .unwrap_or_else(|_| "HTTP 404".into());
            return Err(ItemError::NotFound {
                query: name.to_string(),
                detail,
            });
        }
        if !status.is_success() {
            return Err(ItemError::TransferFailure {
                url,
                reason: format!("HTTP {status}"),
            });
        }
        resp.json::<Card>()
            .await
            .map_err(|e| self.transfer_error(&url, e))
    }

    /// Every printing of `oracle_id` in `lang`, across all result pages.
    ///
    /// Scryfall answers 404 when a card has no printings in a language, which
    /// ends the walk with what was collected so far. Any other non-success
    /// status (rate limiting, server errors) is a `TransferFailure`.
    pub async fn prints(&self, oracle_id: &str, lang: &str) -> Result<Vec<Card>, ItemError> {
        let first = format!("{}/cards/search", self.base_url);
        let query = format!("oracleid:{oracle_id} lang:{lang} unique:prints");
        let mut request = self.http.get(&first).query(&[("q", query.as_str())]);
        let mut cards = Vec::new();

        loop {
            let resp = request
                .send()
                .await
                .map_err(|e| self.transfer_error(&first, e))?;
            let status = resp.status();
            if status == StatusCode::NOT_FOUND {
                debug!("No more printings of {} in '{}'", oracle_id, lang);
                break;
            }
            if !status.is_success() {
                return Err(ItemError::TransferFailure {
                    url: first,
                    reason: format!("HTTP {status}"),
                });
            }
            let page: SearchPage = resp
                .json()
                .await
                .map_err(|e| self.transfer_error(&first, e))?;
            cards.extend(page.data);

            match page.next_page {
                Some(next) if page.has_more => request = self.http.get(next),
                _ => break,
            }
        }
        Ok(cards)
    }

    /// Look `name` up and collect its printings in each of `langs`.
    ///
    /// Each record's `lang` is set to the language it was requested under.
    pub async fn search_printings(&self, name: &str, langs: &[String]) -> Result<Vec<Card>, ItemError> {
        let card = self.named(name).await?;
        let oracle_id = card.oracle_id.ok_or_else(|| ItemError::NotFound {
            query: name.to_string(),
            detail: "record has no oracle id".into(),
        })?;

        let mut all = Vec::new();
        for lang in langs {
            let prints = self.prints(&oracle_id, lang).await?;
            debug!("{}: {} printings in '{}'", name, prints.len(), lang);
            all.extend(prints.into_iter().map(|mut c| {
                c.lang = lang.clone();
                c
            }));
        }
        info!("Found {} printings of '{}'", all.len(), name);
        Ok(all)
    }

    /// Stream `url` into `dir/file_name`, atomically.
    pub async fn download(&self, url: &str, dir: &Path, file_name: &str) -> Result<PathBuf, ItemError> {
        let fail = |reason: String| ItemError::TransferFailure {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transfer_error(url, e))?;
        if !resp.status().is_success() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }

        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
        let (file, tmp_path) = tmp.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut body = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| self.transfer_error(url, e))?;
            file.write_all(&chunk).await.map_err(|e| fail(e.to_string()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| fail(e.to_string()))?;
        drop(file);

        let dest = dir.join(file_name);
        tmp_path.persist(&dest).map_err(|e| fail(e.error.to_string()))?;
        debug!("Downloaded {} ({} bytes) → {}", url, written, dest.display());
        Ok(dest)
    }

    /// Size of the resource at `url` in MiB, from a HEAD request.
    pub async fn image_size_mb(&self, url: &str) -> Result<f64, ItemError> {
        let resp = self
            .http
            .head(url)
            .send()
            .await
            .map_err(|e| self.transfer_error(url, e))?;
        resp.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|bytes| bytes as f64 / (1024.0 * 1024.0))
            .ok_or_else(|| ItemError::TransferFailure {
                url: url.to_string(),
                reason: "no Content-Length in response".into(),
            })
    }
}

// ── Deck fetch ───────────────────────────────────────────────────────────

/// Outcome of fetching one deck entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Downloaded {
        name: String,
        path: PathBuf,
        url: String,
    },
    /// The image is already on disk, or an earlier entry fetched the same print.
    Skipped { name: String, path: PathBuf },
    NotFound { name: String, error: ItemError },
    Failed { name: String, error: ItemError },
    Cancelled { name: String },
}

impl FetchStatus {
    pub fn name(&self) -> &str {
        match self {
            FetchStatus::Downloaded { name, .. }
            | FetchStatus::Skipped { name, .. }
            | FetchStatus::NotFound { name, .. }
            | FetchStatus::Failed { name, .. }
            | FetchStatus::Cancelled { name } => name,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FetchStatus::NotFound { .. } | FetchStatus::Failed { .. })
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Downloaded { name, path, .. } => {
                write!(f, "Downloaded '{name}': {}", path.display())
            }
            FetchStatus::Skipped { name, path } => {
                write!(f, "'{name}' already at {}, skipping", path.display())
            }
            FetchStatus::NotFound { name, error } => write!(f, "Card '{name}' not found: {error}"),
            FetchStatus::Failed { name, error } => write!(f, "Failed to fetch '{name}': {error}"),
            FetchStatus::Cancelled { name } => write!(f, "Cancelled before fetching '{name}'"),
        }
    }
}

/// Search, pick and download one image per deck entry into `dir`.
///
/// Entries are processed one at a time with [`REQUEST_DELAY`] between API
/// calls. Quantities above one are encoded in the file name as `(Nx)` so the
/// sheet repeats the card.
pub async fn fetch_deck(
    client: &ScryfallClient,
    entries: &[DeckEntry],
    dir: &Path,
    config: &SheetConfig,
) -> Result<Vec<FetchStatus>, ProxyError> {
    input::ensure_output_dir(dir)?;
    info!("Fetching {} cards into {}", entries.len(), dir.display());

    let mut statuses = Vec::with_capacity(entries.len());
    let mut seen_urls = HashSet::new();

    for (i, entry) in entries.iter().enumerate() {
        if config.is_cancelled() {
            statuses.push(FetchStatus::Cancelled {
                name: entry.name.clone(),
            });
            continue;
        }
        if i > 0 {
            tokio::time::sleep(REQUEST_DELAY).await;
        }

        let status = fetch_entry(client, entry, dir, &config.languages, &mut seen_urls).await;
        if status.is_failure() {
            warn!("{status}");
        } else {
            info!("{status}");
        }
        statuses.push(status);
    }
    Ok(statuses)
}

async fn fetch_entry(
    client: &ScryfallClient,
    entry: &DeckEntry,
    dir: &Path,
    langs: &[String],
    seen_urls: &mut HashSet<String>,
) -> FetchStatus {
    let name = entry.name.clone();
    let printings = match client.search_printings(&entry.name, langs).await {
        Ok(p) => p,
        Err(error @ ItemError::NotFound { .. }) => return FetchStatus::NotFound { name, error },
        Err(error) => return FetchStatus::Failed { name, error },
    };

    let Some(url) = pick_printing(&printings, langs).and_then(Card::max_quality_image_url) else {
        return FetchStatus::NotFound {
            error: ItemError::NotFound {
                query: name.clone(),
                detail: format!("no printing with an image in {}", langs.join(", ")),
            },
            name,
        };
    };

    let file_name = download_file_name(url, entry.quantity);
    let path = dir.join(&file_name);
    if !seen_urls.insert(url.to_string()) || path.exists() {
        return FetchStatus::Skipped { name, path };
    }

    match client.download(url, dir, &file_name).await {
        Ok(path) => FetchStatus::Downloaded {
            name,
            path,
            url: url.to_string(),
        },
        Err(error) => FetchStatus::Failed { name, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_FACED: &str = r#"{
        "object": "card",
        "id": "e3285e6b-3e79-4d7c-bf96-d920f973b122",
        "oracle_id": "4457ed35-7c10-48c8-9776-456485fdf070",
        "name": "Lightning Bolt",
        "lang": "en",
        "set_name": "Magic 2010",
        "collector_number": "146",
        "image_uris": {
            "small": "https://cards.scryfall.io/small/front/e/3/e3285e6b.jpg?1562442158",
            "png": "https://cards.scryfall.io/png/front/e/3/e3285e6b.png?1562442158"
        }
    }"#;

    const DOUBLE_FACED: &str = r#"{
        "id": "b0a2d2a4",
        "oracle_id": "0f7f1148",
        "name": "Delver of Secrets // Insectile Aberration",
        "lang": "en",
        "set_name": "Innistrad",
        "collector_number": "51",
        "card_faces": [
            {"name": "Delver of Secrets",
             "image_uris": {"png": "https://cards.scryfall.io/png/front/1/1/front.png?1"}},
            {"name": "Insectile Aberration",
             "image_uris": {"png": "https://cards.scryfall.io/png/back/1/1/back.png?1"}}
        ]
    }"#;

    fn card(name: &str, set: &str, number: &str, lang: &str) -> Card {
        Card {
            id: format!("{name}-{set}-{number}-{lang}"),
            oracle_id: Some("oracle".into()),
            name: name.into(),
            set_name: set.into(),
            collector_number: number.into(),
            lang: lang.into(),
            image_uris: Some(ImageUris {
                png: Some(format!("https://img/{set}/{number}/{lang}.png")),
                ..ImageUris::default()
            }),
            card_faces: vec![],
        }
    }

    #[test]
    fn single_faced_card_uses_card_png() {
        let c: Card = serde_json::from_str(SINGLE_FACED).unwrap();
        assert_eq!(
            c.max_quality_image_url(),
            Some("https://cards.scryfall.io/png/front/e/3/e3285e6b.png?1562442158")
        );
        assert_eq!(c.oracle_id.as_deref(), Some("4457ed35-7c10-48c8-9776-456485fdf070"));
    }

    #[test]
    fn double_faced_card_uses_front_face() {
        let c: Card = serde_json::from_str(DOUBLE_FACED).unwrap();
        assert_eq!(
            c.max_quality_image_url(),
            Some("https://cards.scryfall.io/png/front/1/1/front.png?1")
        );
    }

    #[test]
    fn card_without_images_has_no_url() {
        let mut c = card("X", "S", "1", "en");
        c.image_uris = None;
        assert_eq!(c.max_quality_image_url(), None);
    }

    #[test]
    fn search_page_deserialises_pagination() {
        let page: SearchPage = serde_json::from_str(&format!(
            r#"{{"object":"list","has_more":true,"next_page":"https://api.scryfall.com/cards/search?page=2","data":[{SINGLE_FACED}]}}"#
        ))
        .unwrap();
        assert!(page.has_more);
        assert_eq!(page.data.len(), 1);
        assert!(page.next_page.unwrap().ends_with("page=2"));
    }

    #[test]
    fn grouping_pairs_languages_per_printing() {
        let groups = group_printings(vec![
            card("Bolt", "Magic 2010", "146", "en"),
            card("Bolt", "Magic 2010", "146", "pt"),
            card("Bolt", "Masters 25", "141", "pt"),
            card("Bolt", "MAGIC 2010", "146", "en"),
            card("Armor", "Alpha", "1", "en"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Armor");

        let bolt = &groups[1];
        assert_eq!(bolt.editions.len(), 2);
        let m10 = &bolt.editions[0];
        assert_eq!(m10.set_name, "Magic 2010");
        assert_eq!(m10.primary.as_ref().unwrap().lang, "en");
        assert_eq!(m10.alternate.as_ref().unwrap().lang, "pt");
        assert_eq!(m10.preferred().unwrap().lang, "en");

        let a25 = &bolt.editions[1];
        assert!(a25.primary.is_none());
        assert_eq!(a25.preferred().unwrap().lang, "pt");
    }

    #[test]
    fn pick_follows_language_order() {
        let cards = vec![card("Bolt", "A", "1", "pt"), card("Bolt", "B", "2", "en")];
        let en_first = vec!["en".to_string(), "pt".to_string()];
        let pt_first = vec!["pt".to_string(), "en".to_string()];
        assert_eq!(pick_printing(&cards, &en_first).unwrap().set_name, "B");
        assert_eq!(pick_printing(&cards, &pt_first).unwrap().set_name, "A");
        assert!(pick_printing(&cards, &["ja".to_string()]).is_none());
    }

    #[test]
    fn file_name_strips_query_and_adds_repeat() {
        let url = "https://cards.scryfall.io/png/front/e/3/e3285e6b.png?1562442158";
        assert_eq!(download_file_name(url, 1), "e3285e6b.png");
        assert_eq!(download_file_name(url, 4), "(4x)e3285e6b.png");
        assert_eq!(download_file_name("https://host/", 1), "card.png");
    }

    #[test]
    fn fetch_status_lines() {
        let s = FetchStatus::NotFound {
            name: "Black Lotus".into(),
            error: ItemError::NotFound {
                query: "Black Lotus".into(),
                detail: "No cards found".into(),
            },
        };
        assert!(s.is_failure());
        assert!(s.to_string().starts_with("Card 'Black Lotus' not found"));
        let s = FetchStatus::Cancelled { name: "Island".into() };
        assert_eq!(s.name(), "Island");
        assert!(!s.is_failure());
    }

    /// Answer one connection per canned raw HTTP response, in order.
    async fn serve(responses: Vec<&'static str>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn server_error_on_printing_search_is_a_transfer_failure() {
        let base = serve(vec![
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ])
        .await;
        let client = ScryfallClient::with_base_url(base, 5).unwrap();
        let err = client.prints("4457ed35", "en").await.unwrap_err();
        match err {
            ItemError::TransferFailure { reason, .. } => assert!(reason.contains("503"), "{reason}"),
            other => panic!("expected TransferFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_language_yields_no_printings() {
        let base = serve(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        ])
        .await;
        let client = ScryfallClient::with_base_url(base, 5).unwrap();
        assert_eq!(client.prints("4457ed35", "pt").await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn cancelled_fetch_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        // Unroutable root: any request would fail, not hang, within the timeout.
        let client = ScryfallClient::with_base_url("http://127.0.0.1:9", 1).unwrap();
        let token = crate::progress::CancelToken::new();
        token.cancel();
        let config = SheetConfig::builder().cancel_token(token).build().unwrap();
        let entries = vec![DeckEntry {
            quantity: 2,
            name: "Island".into(),
        }];
        let statuses = fetch_deck(&client, &entries, dir.path(), &config).await.unwrap();
        assert_eq!(statuses, vec![FetchStatus::Cancelled { name: "Island".into() }]);
    }
}
