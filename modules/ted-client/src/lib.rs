pub mod error;
pub mod types;

pub use error::{Result, TedClientError};
pub use types::{DetailResponse, PageProps, SearchPage, TalkType, VideoData};

use std::time::Duration;

use tracing::info;

use types::SearchResponse;

pub struct TedClient {
    http: reqwest::Client,
    search_url: String,
    site_url: String,
    hits_per_page: u32,
}

impl TedClient {
    pub fn new(search_url: &str, site_url: &str, hits_per_page: u32) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            search_url: search_url.trim_end_matches('/').to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
            hits_per_page,
        }
    }

    /// Fetch one page of the listing index. The request mirrors the site's
    /// own search call: distinct by objectID, fixed facet set, empty query.
    pub async fn search_page(&self, index_name: &str, page: u32) -> Result<SearchPage> {
        let body = serde_json::json!([{
            "indexName": index_name,
            "params": {
                "attributeForDistinct": "objectID",
                "distinct": 1,
                "facets": ["subtitle_languages", "tags"],
                "highlightPostTag": "__/ais-highlight__",
                "highlightPreTag": "__ais-highlight__",
                "hitsPerPage": self.hits_per_page,
                "maxValuesPerFacet": 500,
                "page": page,
                "query": "",
            },
        }]);

        let resp = self
            .http
            .post(&self.search_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TedClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = resp.json().await?;
        let result = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| TedClientError::Decode("search response had no results".into()))?;

        info!(index_name, page, hits = result.hits.len(), "Fetched listing page");
        Ok(SearchPage {
            page,
            slugs: result.hits.into_iter().map(|h| h.slug).collect(),
            total_pages: result.nb_pages,
        })
    }

    /// Fetch the site's bootstrap document and extract the Next.js build
    /// token. Every detail URL is scoped to this token, so a failure here is
    /// fatal to a run.
    pub async fn build_id(&self) -> Result<String> {
        let resp = self.http.get(&self.site_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TedClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await?;
        let build_id = extract_build_id(&html)?;
        info!(build_id = build_id.as_str(), "Resolved build token");
        Ok(build_id)
    }

    /// Fetch the primary detail payload for a slug.
    pub async fn talk_detail(&self, build_id: &str, slug: &str) -> Result<DetailResponse> {
        self.detail(&format!(
            "{}/_next/data/{build_id}/talks/{slug}.json",
            self.site_url
        ))
        .await
    }

    /// Fetch the alternate-presentation (dubbing) detail payload for a slug.
    pub async fn dubbing_detail(&self, build_id: &str, slug: &str) -> Result<DetailResponse> {
        self.detail(&format!(
            "{}/_next/data/{build_id}/dubbing/{slug}.json",
            self.site_url
        ))
        .await
    }

    async fn detail(&self, url: &str) -> Result<DetailResponse> {
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TedClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

/// Pull the `buildId` out of the `__NEXT_DATA__` script block in the site's
/// bootstrap HTML.
pub fn extract_build_id(html: &str) -> Result<String> {
    let re = regex::Regex::new(r#"(?s)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#)
        .expect("valid regex");

    let raw = re
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| TedClientError::Decode("no __NEXT_DATA__ script in bootstrap page".into()))?;

    #[derive(serde::Deserialize)]
    struct NextData {
        #[serde(rename = "buildId")]
        build_id: String,
    }

    let data: NextData = serde_json::from_str(raw)?;
    Ok(data.build_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_id_is_extracted_from_bootstrap_html() {
        let html = r#"<html><head></head><body>
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{},"buildId":"x1y2z3","page":"/"}
            </script></body></html>"#;
        assert_eq!(extract_build_id(html).unwrap(), "x1y2z3");
    }

    #[test]
    fn missing_next_data_is_a_decode_error() {
        let err = extract_build_id("<html><body>nothing here</body></html>").unwrap_err();
        assert!(matches!(err, TedClientError::Decode(_)));
    }
}
