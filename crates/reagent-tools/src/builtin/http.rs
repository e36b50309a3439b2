//! Tools backed by public HTTP services

use crate::{Arguments, ParamType, ParameterSchema, ToolFailure, ToolHandler, ToolSpec};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Reader service that returns a page as plain text
pub const READER_ENDPOINT: &str = "https://r.jina.ai/";
/// Weather service
pub const WEATHER_ENDPOINT: &str = "https://wttr.in/";

/// Pages longer than this are truncated before reaching the model
const MAX_CONTENT_CHARS: usize = 20_000;

/// Reader URL for a target page
///
/// Only absolute `http`/`https` URLs are accepted.
pub fn reader_url(target: &str) -> Result<String, ToolFailure> {
    let parsed = Url::parse(target.trim())
        .map_err(|e| ToolFailure::InvalidInput(format!("invalid url '{target}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ToolFailure::InvalidInput(format!(
            "unsupported url scheme '{}'",
            parsed.scheme()
        )));
    }
    Ok(format!("{READER_ENDPOINT}{parsed}"))
}

/// Weather URL for a city, or for the caller's location when `None`
pub fn weather_url(city: Option<&str>) -> Result<Url, ToolFailure> {
    let mut url = Url::parse(WEATHER_ENDPOINT).map_err(|e| ToolFailure::msg(e.to_string()))?;
    if let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) {
        url.path_segments_mut()
            .map_err(|()| ToolFailure::msg("weather endpoint cannot be a base"))?
            .pop_if_empty()
            .push(city);
    }
    url.query_pairs_mut().append_pair("format", "3");
    Ok(url)
}

fn truncate(mut text: String) -> String {
    if let Some((idx, _)) = text.char_indices().nth(MAX_CONTENT_CHARS) {
        text.truncate(idx);
        text.push_str("\n[truncated]");
    }
    text
}

struct FetchWebContent {
    client: Client,
    api_key: Option<String>,
}

#[async_trait]
impl ToolHandler for FetchWebContent {
    async fn call(&self, args: &Arguments) -> Result<String, ToolFailure> {
        let endpoint = reader_url(args.str("url")?)?;
        debug!(url = %endpoint, query = ?args.opt_str("query"), "Fetching web content");

        let mut request = self.client.get(&endpoint);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let body = request.send().await?.error_for_status()?.text().await?;
        Ok(truncate(body))
    }
}

struct GetWeather {
    client: Client,
}

#[async_trait]
impl ToolHandler for GetWeather {
    async fn call(&self, args: &Arguments) -> Result<String, ToolFailure> {
        let url = weather_url(args.opt_str("city"))?;
        debug!(url = %url, "Fetching weather");

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body.trim().to_string())
    }
}

pub(crate) fn fetch_web_content(client: Client, api_key: Option<String>) -> ToolSpec {
    ToolSpec::new(
        "fetch_web_content",
        "Read a web page as plain text",
        ParameterSchema::new()
            .required("url", ParamType::String, "Absolute http(s) URL of the page")
            .optional("query", ParamType::String, "What you are looking for on the page"),
        FetchWebContent { client, api_key },
    )
}

pub(crate) fn get_weather(client: Client) -> ToolSpec {
    ToolSpec::new(
        "get_weather",
        "Get a one-line weather report for a city",
        ParameterSchema::new().optional(
            "city",
            ParamType::String,
            "City name; omit for the current location",
        ),
        GetWeather { client },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_url() {
        assert_eq!(
            reader_url("https://example.com/a?b=1").unwrap(),
            "https://r.jina.ai/https://example.com/a?b=1"
        );
        assert!(reader_url("not a url").is_err());
        assert!(matches!(
            reader_url("file:///etc/passwd"),
            Err(ToolFailure::InvalidInput(_))
        ));
    }

    #[test]
    fn test_weather_url() {
        assert_eq!(
            weather_url(Some("New York")).unwrap().as_str(),
            "https://wttr.in/New%20York?format=3"
        );
        assert_eq!(weather_url(None).unwrap().as_str(), "https://wttr.in/?format=3");
        assert_eq!(weather_url(Some("  ")).unwrap().as_str(), "https://wttr.in/?format=3");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short".to_string()), "short");
        let long = "é".repeat(MAX_CONTENT_CHARS + 5);
        let cut = truncate(long);
        assert!(cut.ends_with("[truncated]"));
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS + "\n[truncated]".len());
    }
}
