//! Economy headlines from the GDELT 2.1 DOC API (free, no key).

use super::http::HttpClient;
use super::provider::DataError;
use serde::{Deserialize, Serialize};

pub const GDELT_DOC_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

pub const DEFAULT_NEWS_QUERY: &str =
    "US economy OR inflation OR jobs OR recession OR Federal Reserve OR debt ceiling";

#[derive(Debug, Deserialize)]
struct DocResponse {
    #[serde(default)]
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source_country: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    seendate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub url: String,
    pub source: String,
    pub seen: String,
}

impl From<Article> for Headline {
    fn from(a: Article) -> Self {
        let source = a
            .source_country
            .filter(|s| !s.is_empty())
            .or(a.source)
            .unwrap_or_default();
        Self {
            title: a.title,
            url: a.url,
            source,
            seen: a.seendate,
        }
    }
}

pub struct NewsClient {
    http: HttpClient,
}

impl NewsClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn latest(&self, query: &str, max_records: usize) -> Result<Vec<Headline>, DataError> {
        let params = [
            ("query", query.to_string()),
            ("mode", "ArtList".to_string()),
            ("format", "json".to_string()),
            ("formatdatetime", "true".to_string()),
            ("maxrecords", max_records.to_string()),
            ("sort", "HybridRel".to_string()),
            ("sourcelang", "english".to_string()),
        ];
        let resp: DocResponse = self.http.get_json(GDELT_DOC_URL, &params, "gdelt")?;
        Ok(into_headlines(resp))
    }
}

fn into_headlines(resp: DocResponse) -> Vec<Headline> {
    resp.articles
        .unwrap_or_default()
        .into_iter()
        .map(Headline::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_falls_back_to_source_field() {
        let resp: DocResponse = serde_json::from_str(
            r#"{"articles":[
                {"title":"Jobs report beats","url":"https://a.example/1","sourceCountry":"United States","seendate":"2024-06-07T13:00:00Z"},
                {"title":"Fed holds","url":"https://b.example/2","sourceCountry":"","source":"b.example","seendate":"2024-06-12T18:00:00Z"},
                {"url":"https://c.example/3"}
            ]}"#,
        )
        .unwrap();
        let headlines = into_headlines(resp);
        assert_eq!(headlines.len(), 3);
        assert_eq!(headlines[0].source, "United States");
        assert_eq!(headlines[1].source, "b.example");
        assert_eq!(headlines[2].title, "");
        assert_eq!(headlines[2].source, "");
    }

    #[test]
    fn missing_articles_is_empty() {
        let resp: DocResponse = serde_json::from_str("{}").unwrap();
        assert!(into_headlines(resp).is_empty());
        let resp: DocResponse = serde_json::from_str(r#"{"articles":null}"#).unwrap();
        assert!(into_headlines(resp).is_empty());
    }
}
