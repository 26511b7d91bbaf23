use crate::config::UpstreamConfig;
use crate::errors::ProxyError;
use http::Uri;
use std::collections::HashMap;
use url::Url;

#[derive(Debug)]
pub struct Upstream {
    pub name: String,
    pub url: Url,
    pub api_key: Option<String>,
}

impl From<UpstreamConfig> for Upstream {
    fn from(config: UpstreamConfig) -> Self {
        Self {
            name: config.name,
            url: config.url,
            api_key: config.api_key,
        }
    }
}

impl Upstream {
    /// Builds the upstream URI by appending `path_and_query` to the base URL path.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, ProxyError> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        let mut url = self.url.clone();
        let base_path = self.url.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}{path}"));
        url.set_query(query);

        Ok(url.as_str().parse()?)
    }
}

pub struct Upstreams {
    map: HashMap<String, Upstream>,
}

impl Upstreams {
    pub fn new(config: Vec<UpstreamConfig>) -> Self {
        let map = config
            .into_iter()
            .map(|u| (u.name.clone(), Upstream::from(u)))
            .collect();

        Upstreams { map }
    }

    pub fn get(&self, upstream: &str) -> Option<&Upstream> {
        self.map.get(upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(url: &str) -> Upstream {
        Upstream::from(UpstreamConfig {
            name: "campaigns".into(),
            url: Url::parse(url).unwrap(),
            api_key: None,
        })
    }

    #[test]
    fn test_uri_for() {
        let root = upstream("http://10.0.0.1:8080");
        assert_eq!(
            root.uri_for("/v1/campaigns?page=2").unwrap(),
            "http://10.0.0.1:8080/v1/campaigns?page=2"
        );

        let nested = upstream("https://apps.internal/api/");
        assert_eq!(
            nested.uri_for("/me").unwrap(),
            "https://apps.internal/api/me"
        );
    }

    #[test]
    fn test_upstreams_lookup() {
        let upstreams = Upstreams::new(vec![UpstreamConfig {
            name: "leads".into(),
            url: Url::parse("http://leads.internal").unwrap(),
            api_key: Some("leads-key".into()),
        }]);

        let leads = upstreams.get("leads").unwrap();
        assert_eq!(leads.api_key.as_deref(), Some("leads-key"));
        assert!(upstreams.get("billing").is_none());
    }
}
