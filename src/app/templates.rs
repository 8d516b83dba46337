//! Source template for `generate --module NAME`.

/// Adapter type name for a site: `my_site` becomes `MySiteAdapter`.
pub(crate) fn adapter_type_name(site: &str) -> String {
    let mut name: String = site
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect();
    name.push_str("Adapter");
    name
}

/// File name of the generated module.
pub(crate) fn adapter_file_name(site: &str) -> String {
    let stem: String = site
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{stem}.rs")
}

/// Rust source of an adapter skeleton for `site`.
pub(crate) fn adapter_source(site: &str) -> String {
    let type_name = adapter_type_name(site);
    format!(
        r#"//! {site} site adapter.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;

use comic_dl_core::site::{{
    AdapterOptions, PageList, SerieInfo, SiteAdapter, SiteConfig, SiteError,
    build_site_http_client,
}};

const SITE_NAME: &str = "{site}";
const BASE_URL: &str = "https://{site}.example";

pub struct {type_name} {{
    client: Client,
}}

impl {type_name} {{
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {{
        let client = build_site_http_client(config, SITE_NAME, HeaderMap::new())?;
        Ok(Self {{ client }})
    }}
}}

#[async_trait]
impl SiteAdapter for {type_name} {{
    fn site_name(&self) -> &str {{
        SITE_NAME
    }}

    fn can_handle_url(&self, url: &str) -> bool {{
        url.contains(SITE_NAME)
    }}

    fn url_completion(&self, shorthand: &str) -> String {{
        shorthand.to_string()
    }}

    async fn serie_info(&self, url: &str) -> Result<SerieInfo, SiteError> {{
        Err(SiteError::invalid_page(url))
    }}

    async fn image_list(
        &self,
        chapter_uri: &str,
        _adapter_options: &AdapterOptions,
    ) -> Result<PageList, SiteError> {{
        Err(SiteError::invalid_page(chapter_uri))
    }}

    fn base_url(&self) -> Option<String> {{
        Some(BASE_URL.to_string())
    }}

    fn http_client(&self) -> Option<&Client> {{
        Some(&self.client)
    }}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_type_name() {
        assert_eq!(adapter_type_name("mySite"), "MySiteAdapter");
        assert_eq!(adapter_type_name("my_site"), "MySiteAdapter");
        assert_eq!(adapter_type_name("ganma"), "GanmaAdapter");
    }

    #[test]
    fn test_adapter_file_name() {
        assert_eq!(adapter_file_name("mySite"), "mysite.rs");
        assert_eq!(adapter_file_name("my-site"), "my_site.rs");
    }

    #[test]
    fn test_adapter_source_names_site() {
        let source = adapter_source("ganma");
        assert!(source.contains("pub struct GanmaAdapter {"));
        assert!(source.contains(r#"const SITE_NAME: &str = "ganma";"#));
        assert!(source.contains("impl SiteAdapter for GanmaAdapter {"));
    }
}
