use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

// === API Request/Response Models ===

/// The JSON body for a `POST /api/tiktok` request.
#[derive(Deserialize, Debug)]
pub struct VideoRequest {
    pub url: String,
}

impl VideoRequest {
    /// Parses the submitted link. Only absolute `http`/`https` URLs with a host are accepted.
    pub fn source_url(&self) -> Result<Url, String> {
        let url = Url::parse(self.url.trim()).map_err(|e| format!("Invalid URL: {}", e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("Invalid URL: unsupported scheme '{}'", url.scheme()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err("Invalid URL: missing host".to_string());
        }
        Ok(url)
    }
}

/// The simplified payload returned for a resolved video.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub title: String,
    pub thumbnail: String,
    pub download_url: String,
}

/// Plain `{"message": ...}` body used by the greeting endpoints.
#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// The report returned by `GET /test`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub backend: String,
    pub database: String,
    pub database_url: String,
    pub database_name: String,
    pub connection_status: String,
    pub collections: Vec<String>,
}

impl DiagnosticsReport {
    /// Builds the report. `is_set` tells whether an environment variable is present.
    ///
    /// No database driver ships with this service, so the connection side always
    /// reports "not connected"; only the environment wiring is inspected.
    pub fn collect(is_set: impl Fn(&str) -> bool) -> Self {
        let describe = |key: &str| {
            let label = if is_set(key) { "Set" } else { "Not Set" };
            label.to_string()
        };
        DiagnosticsReport {
            backend: "Running".to_string(),
            database: "Not Available (no database module configured)".to_string(),
            database_url: describe("DATABASE_URL"),
            database_name: describe("DATABASE_NAME"),
            connection_status: "Not Connected".to_string(),
            collections: Vec::new(),
        }
    }
}

// === Upstream (TikWM) Models ===

/// Top-level JSON returned by the extraction service.
///
/// Fields of an unexpected JSON type are read as absent instead of failing the parse.
#[derive(Deserialize, Debug, Default)]
pub struct UpstreamResponse {
    #[serde(default, deserialize_with = "lenient_integer")]
    code: Option<i64>,
    #[serde(default, deserialize_with = "lenient_data")]
    data: Option<UpstreamData>,
}

impl UpstreamResponse {
    pub fn code(&self) -> Option<i64> {
        self.code
    }

    /// `code == 0` is the only success marker.
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// `None` when `data` is missing, null, not an object, or an empty object.
    pub fn data(&self) -> Option<&UpstreamData> {
        self.data.as_ref()
    }
}

/// The `data` object of a successful upstream reply.
#[derive(Deserialize, Debug, Default)]
pub struct UpstreamData {
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    play: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    play_addr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    cover: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    origin_cover: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    dynamic_cover: Option<String>,
}

impl UpstreamData {
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// No-watermark link candidates, highest priority first.
    pub fn download_candidates(&self) -> [Option<&str>; 2] {
        [non_empty(&self.play), non_empty(&self.play_addr)]
    }

    /// Thumbnail candidates, highest priority first.
    pub fn thumbnail_candidates(&self) -> [Option<&str>; 3] {
        [
            non_empty(&self.cover),
            non_empty(&self.origin_cover),
            non_empty(&self.dynamic_cover),
        ]
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_data<'de, D>(deserializer: D) -> Result<Option<UpstreamData>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) if !map.is_empty() => serde_json::from_value(Value::Object(map))
            .map(Some)
            .map_err(de::Error::custom),
        _ => Ok(None),
    }
}
