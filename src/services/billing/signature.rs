//! HMAC-SHA256 webhook signature checks for both billing providers.
//!
//! Every verifier returns `bool` and never fails: malformed headers, bad
//! timestamps and undecodable secrets or signatures all read as "not verified".

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Maximum distance, in seconds, between the signed timestamp and now.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Prefixes providers put in front of the base64 webhook secret.
const KNOWN_SECRET_PREFIXES: [&str; 2] = ["pdl_ntfset_", "whsec_"];

struct SignatureHeader<'a> {
    timestamp: &'a str,
    signatures: Vec<&'a str>,
}

/// Splits a `key=value` list on both `;` and `,`. The first timestamp wins;
/// every signature under `sig_key` is kept as a candidate.
fn parse_header<'a>(header: &'a str, ts_key: &str, sig_key: &str) -> Option<SignatureHeader<'a>> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split([';', ',']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part.split_once('=')?;
        let (key, value) = (key.trim(), value.trim());
        if key == ts_key {
            timestamp.get_or_insert(value);
        } else if key == sig_key && !value.is_empty() {
            signatures.push(value);
        }
    }

    Some(SignatureHeader {
        timestamp: timestamp?,
        signatures,
    })
    .filter(|parsed| !parsed.signatures.is_empty())
}

fn within_tolerance(timestamp: &str, now: i64) -> bool {
    match timestamp.parse::<i64>() {
        Ok(ts) => (i128::from(now) - i128::from(ts)).abs() <= i128::from(SIGNATURE_TOLERANCE_SECS),
        Err(_) => false,
    }
}

fn compute(key: &[u8], timestamp: &str, separator: u8, body: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(&[separator]);
    mac.update(body);
    Some(mac.finalize().into_bytes().to_vec())
}

fn any_candidate_matches(expected: &[u8], candidates: &[&str]) -> bool {
    // Every candidate is checked so timing does not reveal which one matched.
    candidates.iter().fold(false, |matched, candidate| {
        let ok = hex::decode(candidate)
            .map(|provided| bool::from(expected.ct_eq(&provided)))
            .unwrap_or(false);
        matched | ok
    })
}

fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let trimmed = secret.trim();
    let stripped = KNOWN_SECRET_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    STANDARD
        .decode(stripped)
        .or_else(|_| URL_SAFE_NO_PAD.decode(stripped))
        .ok()
        .filter(|key| !key.is_empty())
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`, signed over `"{t}.{body}"`
/// with the raw secret as key.
pub fn verify_stripe_signature(body: &[u8], header: &str, secret: &str) -> bool {
    verify_stripe_signature_at(body, header, secret, now_unix())
}

pub fn verify_stripe_signature_at(body: &[u8], header: &str, secret: &str, now: i64) -> bool {
    let Some(parsed) = parse_header(header, "t", "v1") else {
        return false;
    };
    if secret.is_empty() || !within_tolerance(parsed.timestamp, now) {
        return false;
    }
    compute(secret.as_bytes(), parsed.timestamp, b'.', body)
        .map(|expected| any_candidate_matches(&expected, &parsed.signatures))
        .unwrap_or(false)
}

/// `Paddle-Signature: ts=<unix>;h1=<hex>[,h1=<hex>...]`, signed over `"{ts}:{body}"`
/// with the base64-decoded secret as key.
pub fn verify_paddle_signature(body: &[u8], header: &str, secret: &str) -> bool {
    verify_paddle_signature_at(body, header, secret, now_unix())
}

pub fn verify_paddle_signature_at(body: &[u8], header: &str, secret: &str, now: i64) -> bool {
    let Some(parsed) = parse_header(header, "ts", "h1") else {
        return false;
    };
    if !within_tolerance(parsed.timestamp, now) {
        return false;
    }
    let Some(key) = decode_secret(secret) else {
        return false;
    };
    compute(&key, parsed.timestamp, b':', body)
        .map(|expected| any_candidate_matches(&expected, &parsed.signatures))
        .unwrap_or(false)
}
