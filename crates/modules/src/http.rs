//! `http`: blocking HTTP access for scripts.
//!
//! Every request is attempted twice before the transport error is surfaced.
//! Non-2xx statuses are not errors; the script inspects `status` itself.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use rhai::{Dynamic, ImmutableString, Map, Module};

use crate::{Error, Result, ScriptResult};

/// Attempts per request, including the first.
const ATTEMPTS: usize = 2;

/// HTTP client settings shared by every rule.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("quarry/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Lazily built client; construction is deferred to the first request so
/// that building modules never touches the network stack.
#[derive(Debug)]
struct Transport {
    config: HttpConfig,
    client: OnceLock<Client>,
}

impl Transport {
    fn client(&self, func: &'static str) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.as_str())
            .build()
            .map_err(|source| Error::Http { func, source })?;
        Ok(self.client.get_or_init(|| client))
    }

    fn send(
        &self,
        func: &'static str,
        url: &str,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<Map> {
        let client = self.client(func)?;
        let mut last_error = None;
        for attempt in 1..=ATTEMPTS {
            match build(client).send().and_then(into_map) {
                Ok(map) => return Ok(map),
                Err(e) => {
                    tracing::warn!(func, url, attempt, error = %e, "request failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(source) => Err(Error::Http { func, source }),
            None => Err(Error::usage(func, "no request attempted")),
        }
    }
}

fn into_map(response: Response) -> reqwest::Result<Map> {
    let status = i64::from(response.status().as_u16());

    let mut headers = Map::new();
    for (name, value) in response.headers() {
        let entry = headers
            .entry(name.as_str().into())
            .or_insert_with(|| Dynamic::from_array(Vec::new()));
        if let Some(mut values) = entry.write_lock::<rhai::Array>() {
            values.push(Dynamic::from(value.to_str().unwrap_or_default().to_string()));
        }
    }

    let body = response.text()?;

    let mut map = Map::new();
    map.insert("status".into(), Dynamic::from(status));
    map.insert("body".into(), Dynamic::from(body));
    map.insert("headers".into(), Dynamic::from_map(headers));
    Ok(map)
}

fn header_pairs(headers: &Map) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn with_headers(mut request: RequestBuilder, headers: &[(String, String)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

pub fn module(config: HttpConfig) -> Module {
    let transport = Arc::new(Transport {
        config,
        client: OnceLock::new(),
    });
    let mut module = Module::new();

    let t = Arc::clone(&transport);
    module.set_native_fn("get", move |url: ImmutableString| -> ScriptResult<Map> {
        t.send("http.get", url.as_str(), |c| c.get(url.as_str()))
            .map_err(Into::into)
    });

    let t = Arc::clone(&transport);
    module.set_native_fn("get", move |url: ImmutableString, headers: Map| -> ScriptResult<Map> {
        let headers = header_pairs(&headers);
        t.send("http.get", url.as_str(), |c| with_headers(c.get(url.as_str()), &headers))
            .map_err(Into::into)
    });

    let t = Arc::clone(&transport);
    module.set_native_fn("post", move |url: ImmutableString, body: ImmutableString| -> ScriptResult<Map> {
        t.send("http.post", url.as_str(), |c| c.post(url.as_str()).body(body.to_string()))
            .map_err(Into::into)
    });

    let t = transport;
    module.set_native_fn(
        "post",
        move |url: ImmutableString, body: ImmutableString, headers: Map| -> ScriptResult<Map> {
            let headers = header_pairs(&headers);
            t.send("http.post", url.as_str(), |c| {
                with_headers(c.post(url.as_str()).body(body.to_string()), &headers)
            })
            .map_err(Into::into)
        },
    );

    module
}
