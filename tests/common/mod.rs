#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::header::{HeaderMap, USER_AGENT};
use safe_link_preview::{
    HttpClient, HttpResponse, LinkPreviewConfig, LinkPreviewFetcher, PreviewError, Resolver,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub enum Answer {
    Addrs(Vec<IpAddr>),
    Fail,
    Hang,
}

pub struct MockResolver {
    answer: Answer,
    calls: AtomicUsize,
}

impl MockResolver {
    pub fn returning(addrs: &[&str]) -> Arc<Self> {
        let addrs = addrs.iter().map(|a| a.parse().unwrap()).collect();
        Self::with_answer(Answer::Addrs(addrs))
    }

    pub fn failing() -> Arc<Self> {
        Self::with_answer(Answer::Fail)
    }

    pub fn hanging() -> Arc<Self> {
        Self::with_answer(Answer::Hang)
    }

    fn with_answer(answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Answer::Addrs(addrs) => Ok(addrs.clone()),
            Answer::Fail => Err(PreviewError::DnsError {
                host: host.to_string(),
                message: "NXDOMAIN".to_string(),
            }),
            Answer::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

pub enum Reply {
    Page(u16, String),
    Fail,
    Hang,
}

pub struct MockHttpClient {
    reply: Reply,
    calls: AtomicUsize,
    cancelled: Arc<AtomicBool>,
    seen: Mutex<Vec<(String, Option<String>)>>,
}

impl MockHttpClient {
    pub fn html(body: impl Into<String>) -> Arc<Self> {
        Self::with_reply(Reply::Page(200, body.into()))
    }

    pub fn status(status: u16) -> Arc<Self> {
        Self::with_reply(Reply::Page(status, "<title>Error page</title>".into()))
    }

    pub fn failing() -> Arc<Self> {
        Self::with_reply(Reply::Fail)
    }

    pub fn hanging() -> Arc<Self> {
        Self::with_reply(Reply::Hang)
    }

    fn with_reply(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicBool::new(false)),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// (url, user agent) of every request received.
    pub fn seen(&self) -> Vec<(String, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

/// Flags the request as cancelled if its future is dropped before finishing.
struct CancelOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
        _timeout: Duration,
    ) -> Result<HttpResponse, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.seen.lock().unwrap().push((url.to_string(), user_agent));

        let mut guard = CancelOnDrop {
            flag: self.cancelled.clone(),
            armed: true,
        };

        let result = match &self.reply {
            Reply::Page(status, body) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Reply::Fail => Err(PreviewError::FetchError("connection reset".to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PreviewError::FetchError("unreachable".to_string()))
            }
        };

        guard.armed = false;
        result
    }
}

pub fn preview_fetcher(
    resolver: Arc<MockResolver>,
    http: Arc<MockHttpClient>,
) -> LinkPreviewFetcher {
    preview_fetcher_with(LinkPreviewConfig::default(), resolver, http)
}

pub fn preview_fetcher_with(
    config: LinkPreviewConfig,
    resolver: Arc<MockResolver>,
    http: Arc<MockHttpClient>,
) -> LinkPreviewFetcher {
    LinkPreviewFetcher::from_parts(config, resolver, http).unwrap()
}

pub fn og_page(title: &str, description: &str, image: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta property="og:title" content="{title}">
  <meta content="{description}" property="og:description">
  <meta property="og:image" content="{image}" />
  <title>Ignored</title>
</head>
<body><p>Body</p></body>
</html>"#
    )
}
