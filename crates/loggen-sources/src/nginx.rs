//! NGINX access and error log generators.

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use loggen_core::catalog::{EventGenerator, GeneratorError};
use loggen_core::types::Event;

use crate::common::{base_doc, extend, pick, pick_weighted, random_public_ip};

pub const ACCESS_DATA_STREAM: &str = "logs-nginx.access-default";
pub const ERROR_DATA_STREAM: &str = "logs-nginx.error-default";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "curl/7.88.1",
    "python-requests/2.31.0",
    "Googlebot/2.1 (+http://www.google.com/bot.html)",
    "PostmanRuntime/7.35.0",
];

const METHODS: &[(&str, u32)] = &[
    ("GET", 70),
    ("POST", 20),
    ("PUT", 5),
    ("DELETE", 3),
    ("HEAD", 2),
];

const URL_PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/api/v1/users",
    "/api/v1/products",
    "/api/v1/orders",
    "/api/v1/health",
    "/api/v1/auth/login",
    "/api/v1/auth/logout",
    "/api/v2/graphql",
    "/static/js/main.js",
    "/static/css/style.css",
    "/static/images/logo.png",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
    "/admin/dashboard",
    "/admin/users",
    "/docs/api",
    "/search",
    "/products/123",
    "/products/456/reviews",
];

const REFERRERS: &[&str] = &[
    "-",
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://example.com/",
    "https://internal.example.com/dashboard",
    "https://api-docs.example.com/",
];

const STATUS_CODES: &[(u16, u32)] = &[
    (200, 70),
    (201, 5),
    (204, 3),
    (301, 2),
    (302, 3),
    (304, 5),
    (400, 3),
    (401, 2),
    (403, 2),
    (404, 3),
    (500, 1),
    (502, 1),
];

const HOSTNAMES: &[&str] = &[
    "web-server-01",
    "web-server-02",
    "nginx-lb-01",
    "api-gateway-01",
];

const ERROR_TYPES: &[(&str, &str, u32)] = &[
    (
        "error",
        "connect() failed (111: Connection refused) while connecting to upstream",
        25,
    ),
    (
        "error",
        "upstream timed out (110: Connection timed out) while reading response header from upstream",
        20,
    ),
    ("warn", "client intended to send too large body", 15),
    (
        "error",
        "open() \"/var/www/html/favicon.ico\" failed (2: No such file or directory)",
        20,
    ),
    (
        "crit",
        "SSL_do_handshake() failed (SSL: error:14094412:SSL routines:ssl3_read_bytes:sslv3 alert bad certificate)",
        5,
    ),
    (
        "error",
        "limiting requests, excess: 10.520 by zone \"api_limit\"",
        10,
    ),
    (
        "warn",
        "upstream server temporarily disabled while connecting to upstream",
        5,
    ),
];

pub struct NginxAccess {
    rng: SmallRng,
}

pub fn new_access() -> Box<dyn EventGenerator> {
    Box::new(NginxAccess {
        rng: SmallRng::from_entropy(),
    })
}

/// Response sizes track what the path would plausibly serve, except that
/// error responses are always small.
fn body_bytes(rng: &mut SmallRng, path: &str, status: u16) -> u64 {
    if status >= 400 {
        rng.gen_range(200..=1_000)
    } else if path.ends_with(".js") || path.ends_with(".css") {
        rng.gen_range(10_000..=500_000)
    } else if path.ends_with(".png") || path.ends_with(".jpg") || path.ends_with(".ico") {
        rng.gen_range(5_000..=2_000_000)
    } else if path.contains("/api/") {
        rng.gen_range(100..=50_000)
    } else {
        rng.gen_range(500..=20_000)
    }
}

impl EventGenerator for NginxAccess {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        let rng = &mut self.rng;
        let client_ip = random_public_ip(rng);
        let method = pick_weighted(rng, METHODS, |m| m.1)?.0;
        let path = *pick(rng, URL_PATHS)?;
        let status = pick_weighted(rng, STATUS_CODES, |s| s.1)?.0;
        let user_agent = *pick(rng, USER_AGENTS)?;
        let referrer = *pick(rng, REFERRERS)?;
        let hostname = *pick(rng, HOSTNAMES)?;

        let body_bytes = body_bytes(rng, path, status);
        let response_time = if status >= 500 {
            rng.gen_range(1.0..30.0)
        } else {
            rng.gen_range(0.001..2.0)
        };

        let mut doc = base_doc("nginx.access", "nginx");
        extend(
            &mut doc,
            json!({
                "host": { "name": hostname, "hostname": hostname },
                "source": { "ip": &client_ip, "address": &client_ip },
                "url": { "path": path, "original": path },
                "http": {
                    "request": {
                        "method": method,
                        "referrer": if referrer == "-" { Value::Null } else { referrer.into() },
                    },
                    "response": {
                        "status_code": status,
                        "body": { "bytes": body_bytes },
                    },
                    "version": "1.1",
                },
                "user_agent": { "original": user_agent },
                "event": {
                    "category": ["web"],
                    "type": ["access"],
                    "outcome": if status < 400 { "success" } else { "failure" },
                    "duration": (response_time * 1e9) as u64,
                },
                "nginx": {
                    "access": { "remote_ip_list": [&client_ip] },
                },
                "message": format!(
                    "{client_ip} - - [{}] \"{method} {path} HTTP/1.1\" {status} {body_bytes} \"{referrer}\" \"{user_agent}\"",
                    Utc::now().format("%d/%b/%Y:%H:%M:%S +0000"),
                ),
            }),
        );

        Ok(Event::new(doc, ACCESS_DATA_STREAM))
    }
}

pub struct NginxError {
    rng: SmallRng,
}

pub fn new_error() -> Box<dyn EventGenerator> {
    Box::new(NginxError {
        rng: SmallRng::from_entropy(),
    })
}

impl EventGenerator for NginxError {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        let rng = &mut self.rng;
        let hostname = *pick(rng, HOSTNAMES)?;
        let client_ip = random_public_ip(rng);
        let (level, text, _) = *pick_weighted(rng, ERROR_TYPES, |e| e.2)?;

        let pid: u32 = rng.gen_range(1_000..=65_000);
        let tid: u32 = rng.gen_range(1..=100);
        let connection: u32 = rng.gen_range(100_000..=999_999);
        let request_path = *pick(rng, URL_PATHS)?;

        let mut doc = base_doc("nginx.error", "nginx");
        extend(
            &mut doc,
            json!({
                "host": { "name": hostname, "hostname": hostname },
                "source": { "ip": &client_ip, "address": &client_ip },
                "process": { "pid": pid, "thread": { "id": tid } },
                "log": { "level": level },
                "event": {
                    "category": ["web"],
                    "type": ["error"],
                    "outcome": "failure",
                },
                "nginx": {
                    "error": { "connection_id": connection },
                },
                "url": { "path": request_path },
                "message": format!(
                    "{} [{level}] {pid}#{tid}: *{connection} {text}, client: {client_ip}, request: \"GET {request_path} HTTP/1.1\"",
                    Utc::now().format("%Y/%m/%d %H:%M:%S"),
                ),
            }),
        );

        Ok(Event::new(doc, ERROR_DATA_STREAM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_document_carries_http_fields_and_combined_message() {
        let mut generator = NginxAccess {
            rng: SmallRng::seed_from_u64(42),
        };
        for _ in 0..50 {
            let event = generator.generate().unwrap();
            assert_eq!(event.data_stream, ACCESS_DATA_STREAM);
            let doc = &event.doc;
            let status = doc["http"]["response"]["status_code"].as_u64().unwrap();
            assert!((200..=599).contains(&status));
            let outcome = doc["event"]["outcome"].as_str().unwrap();
            assert_eq!(outcome == "success", status < 400);
            let message = doc["message"].as_str().unwrap();
            assert!(message.contains("HTTP/1.1"), "{message}");
        }
    }

    #[test]
    fn error_levels_come_from_the_weighted_table() {
        let mut generator = NginxError {
            rng: SmallRng::seed_from_u64(42),
        };
        for _ in 0..50 {
            let event = generator.generate().unwrap();
            let level = event.doc["log"]["level"].as_str().unwrap();
            assert!(["error", "warn", "crit"].contains(&level), "{level}");
            assert!(event.doc["message"].as_str().unwrap().contains(level));
        }
    }
}
