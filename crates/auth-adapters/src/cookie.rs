//! # Session cookie
//!
//! The cookie carries only the session id plus an HMAC-SHA256 tag over it:
//! `<uuid>.<base64url(tag)>`. Everything else lives in the session store.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("session secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("session cookie name must not be empty")]
    EmptyName,
}

#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    max_age: Duration,
    secure: bool,
    mac: HmacSha256,
}

impl SessionCookie {
    pub fn new(
        name: impl Into<String>,
        secret: &SecretString,
        max_age: Duration,
        secure: bool,
    ) -> Result<Self, CookieError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CookieError::EmptyName);
        }
        let key = secret.expose_secret().as_bytes();
        if key.len() < MIN_SECRET_LEN {
            return Err(CookieError::WeakSecret);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| CookieError::WeakSecret)?;
        Ok(Self { name, max_age, secure, mac })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self, id: &Uuid) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac
    }

    pub fn sign(&self, id: Uuid) -> String {
        let tag = self.tag(&id).finalize().into_bytes();
        format!("{}.{}", id, URL_SAFE_NO_PAD.encode(tag))
    }

    /// Returns the session id if the value carries a valid tag.
    pub fn verify(&self, value: &str) -> Option<Uuid> {
        let (id, tag) = value.split_once('.')?;
        let id = Uuid::parse_str(id).ok()?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        // verify_slice compares in constant time
        self.tag(&id).verify_slice(&tag).ok()?;
        Some(id)
    }

    /// Finds and verifies our cookie in a `Cookie` request header.
    pub fn extract(&self, cookie_header: &str) -> Option<Uuid> {
        cookie_header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == self.name)
            .find_map(|(_, value)| self.verify(value))
    }

    /// `Set-Cookie` value that starts a session.
    pub fn issue(&self, id: Uuid) -> String {
        self.header(&self.sign(id), self.max_age.num_seconds())
    }

    /// `Set-Cookie` value that removes the cookie.
    pub fn clear(&self) -> String {
        self.header("", 0)
    }

    fn header(&self, value: &str, max_age: i64) -> String {
        let mut header = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name, value, max_age
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}
