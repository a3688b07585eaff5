//! In-process cookie jar.
//!
//! Values are JSON-encoded then percent-encoded, exactly as they would sit in
//! a `Cookie` header. Cookies that arrive from a server via
//! [`CookieStorage::ingest_set_cookie`] usually carry bare strings; those read
//! back as JSON strings.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::{decode_stored, Expiry, SetOptions, StorageError, StorageService};
use crate::lock;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lax" => Some(SameSite::Lax),
            "strict" => Some(SameSite::Strict),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CookieEntry {
    /// Percent-encoded value as it appears on the wire.
    encoded: String,
    path: String,
    expires_at: Option<DateTime<Utc>>,
    same_site: Option<SameSite>,
    secure: bool,
}

impl CookieEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
pub struct CookieStorage {
    entries: Mutex<BTreeMap<String, CookieEntry>>,
}

impl CookieStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the `Set-Cookie` string for `key`, if it is present.
    pub fn set_cookie_string(&self, key: &str) -> Option<String> {
        let entries = lock(&self.entries);
        let entry = entries.get(key)?;
        let mut cookie = format!("{}={}", urlencoding::encode(key), entry.encoded);
        if let Some(at) = entry.expires_at {
            cookie.push_str(&format!("; expires={}", at.format(HTTP_DATE)));
        }
        cookie.push_str(&format!("; path={}", entry.path));
        if let Some(same_site) = entry.same_site {
            cookie.push_str(&format!("; samesite={}", same_site.as_str()));
        }
        if entry.secure {
            cookie.push_str("; secure");
        }
        Some(cookie)
    }

    /// Render a `Cookie` request header from every live entry.
    pub fn cookie_header(&self) -> String {
        let now = Utc::now();
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| !entry.is_expired(now));
        entries
            .iter()
            .map(|(key, entry)| format!("{}={}", urlencoding::encode(key), entry.encoded))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Store a cookie from a server `Set-Cookie` header.
    ///
    /// `Max-Age` wins over `Expires`; a non-positive age deletes the cookie.
    /// Returns the cookie name, or `None` if the header has no `name=value`
    /// pair.
    pub fn ingest_set_cookie(&self, header: &str) -> Option<String> {
        let mut parts = header.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let now = Utc::now();
        let mut entry = CookieEntry {
            encoded: value.trim().to_string(),
            path: "/".to_string(),
            expires_at: None,
            same_site: None,
            secure: false,
        };
        let mut max_age = None;
        for attr in parts {
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "max-age" => max_age = val.trim().parse::<i64>().ok(),
                "expires" => {
                    entry.expires_at = DateTime::parse_from_rfc2822(val.trim())
                        .ok()
                        .map(|at| at.with_timezone(&Utc));
                }
                "path" => entry.path = val.trim().to_string(),
                "samesite" => entry.same_site = SameSite::parse(val.trim()),
                "secure" => entry.secure = true,
                _ => {}
            }
        }
        // A lifetime too large to represent is kept as a session cookie.
        if let Some(seconds) = max_age {
            entry.expires_at = if seconds <= 0 {
                Some(now)
            } else {
                Duration::try_seconds(seconds).and_then(|ttl| now.checked_add_signed(ttl))
            };
        }

        let decoded_name = urlencoding::decode(name)
            .map(|n| n.into_owned())
            .unwrap_or_else(|_| name.to_string());
        let mut entries = lock(&self.entries);
        if entry.is_expired(now) {
            entries.remove(&decoded_name);
        } else {
            entries.insert(decoded_name.clone(), entry);
        }
        Some(decoded_name)
    }
}

#[async_trait]
impl StorageService for CookieStorage {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let now = Utc::now();
        let mut entries = lock(&self.entries);
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            entries.remove(key);
            return Ok(None);
        }
        let raw = urlencoding::decode(&entry.encoded)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| entry.encoded.clone());
        Ok(Some(decode_stored(&raw)))
    }

    async fn set_value(&self, key: &str, value: Value, options: &SetOptions) -> Result<(), StorageError> {
        let now = Utc::now();
        let entry = CookieEntry {
            encoded: urlencoding::encode(&value.to_string()).into_owned(),
            path: options.path.clone().unwrap_or_else(|| "/".to_string()),
            expires_at: options.expires.map(|e| e.resolve(now)),
            same_site: options.same_site,
            secure: options.secure,
        };
        let mut entries = lock(&self.entries);
        if entry.is_expired(now) {
            entries.remove(key);
        } else {
            entries.insert(key.to_string(), entry);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let expired = SetOptions {
            expires: Some(Expiry::After(Duration::milliseconds(-1))),
            ..SetOptions::default()
        };
        self.set_value(key, Value::String(String::new()), &expired).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        lock(&self.entries).clear();
        Ok(())
    }
}
