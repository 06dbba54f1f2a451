// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The QPACK static table (RFC 9204 Appendix A). Read-only, shared by both
//! ends of a connection, indexed independently from the dynamic table.

use std::collections::HashMap;

use lazy_static::lazy_static;

pub const STATIC_TABLE_LEN: usize = 99;

static STATIC_TABLE_RAW: &'static [(&'static str, &'static str)] = &[
    (":authority", ""),
    (":path", "/"),
    ("age", "0"),
    ("content-disposition", ""),
    ("content-length", "0"),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("referer", ""),
    ("set-cookie", ""),
    (":method", "CONNECT"),
    (":method", "DELETE"),
    (":method", "GET"),
    (":method", "HEAD"),
    (":method", "OPTIONS"),
    (":method", "POST"),
    (":method", "PUT"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "103"),
    (":status", "200"),
    (":status", "304"),
    (":status", "404"),
    (":status", "503"),
    ("accept", "*/*"),
    ("accept", "application/dns-message"),
    ("accept-encoding", "gzip, deflate, br"),
    ("accept-ranges", "bytes"),
    ("access-control-allow-headers", "cache-control"),
    ("access-control-allow-headers", "content-type"),
    ("access-control-allow-origin", "*"),
    ("cache-control", "max-age=0"),
    ("cache-control", "max-age=2592000"),
    ("cache-control", "max-age=604800"),
    ("cache-control", "no-cache"),
    ("cache-control", "no-store"),
    ("cache-control", "public, max-age=31536000"),
    ("content-encoding", "br"),
    ("content-encoding", "gzip"),
    ("content-type", "application/dns-message"),
    ("content-type", "application/javascript"),
    ("content-type", "application/json"),
    ("content-type", "application/x-www-form-urlencoded"),
    ("content-type", "image/gif"),
    ("content-type", "image/jpeg"),
    ("content-type", "image/png"),
    ("content-type", "text/css"),
    ("content-type", "text/html; charset=utf-8"),
    ("content-type", "text/plain"),
    ("content-type", "text/plain;charset=utf-8"),
    ("range", "bytes=0-"),
    ("strict-transport-security", "max-age=31536000"),
    ("strict-transport-security", "max-age=31536000; includesubdomains"),
    ("strict-transport-security", "max-age=31536000; includesubdomains; preload"),
    ("vary", "accept-encoding"),
    ("vary", "origin"),
    ("x-content-type-options", "nosniff"),
    ("x-xss-protection", "1; mode=block"),
    (":status", "100"),
    (":status", "204"),
    (":status", "206"),
    (":status", "302"),
    (":status", "400"),
    (":status", "403"),
    (":status", "421"),
    (":status", "425"),
    (":status", "500"),
    ("accept-language", ""),
    ("access-control-allow-credentials", "FALSE"),
    ("access-control-allow-credentials", "TRUE"),
    ("access-control-allow-headers", "*"),
    ("access-control-allow-methods", "get"),
    ("access-control-allow-methods", "get, post, options"),
    ("access-control-allow-methods", "options"),
    ("access-control-expose-headers", "content-length"),
    ("access-control-request-headers", "content-type"),
    ("access-control-request-method", "get"),
    ("access-control-request-method", "post"),
    ("alt-svc", "clear"),
    ("authorization", ""),
    ("content-security-policy", "script-src 'none'; object-src 'none'; base-uri 'none'"),
    ("early-data", "1"),
    ("expect-ct", ""),
    ("forwarded", ""),
    ("if-range", ""),
    ("origin", ""),
    ("purpose", "prefetch"),
    ("server", ""),
    ("timing-allow-origin", "*"),
    ("upgrade-insecure-requests", "1"),
    ("user-agent", ""),
    ("x-forwarded-for", ""),
    ("x-frame-options", "deny"),
    ("x-frame-options", "sameorigin"),
];

lazy_static! {
    /// Lookup from name to the smallest static index carrying it, used to
    /// find a name-only match fast.
    static ref STATIC_NAME_INDEX: HashMap<&'static str, usize> = {
        let mut m = HashMap::new();
        for (idx, &(name, _)) in STATIC_TABLE_RAW.iter().enumerate() {
            m.entry(name).or_insert(idx);
        }
        m
    };

    /// Lookup from (name, value) to its static index, for exact matches.
    static ref STATIC_NAME_VALUE_INDEX: HashMap<(&'static str, &'static str), usize> = {
        let mut m = HashMap::new();
        for (idx, &pair) in STATIC_TABLE_RAW.iter().enumerate() {
            m.insert(pair, idx);
        }
        m
    };
}

pub fn get(index: usize) -> Option<(&'static [u8], &'static [u8])> {
    STATIC_TABLE_RAW.get(index).map(|&(n, v)| (n.as_bytes(), v.as_bytes()))
}

/// Looks for an exact (name, value) match in the static table, falling back
/// to a name-only match. Mirrors the match-kind semantics used by the
/// dynamic table's own `lookup`.
pub fn find(name: &[u8], value: &[u8]) -> Option<(usize, bool)> {
    if let (Ok(name), Ok(value)) = (std::str::from_utf8(name), std::str::from_utf8(value)) {
        if let Some(&idx) = STATIC_NAME_VALUE_INDEX.get(&(name, value)) {
            return Some((idx, true));
        }
        if let Some(&idx) = STATIC_NAME_INDEX.get(name) {
            return Some((idx, false));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_99_entries() {
        assert_eq!(STATIC_TABLE_RAW.len(), STATIC_TABLE_LEN);
    }

    #[test]
    fn known_indices() {
        assert_eq!(get(0), Some((&b":authority"[..], &b""[..])));
        assert_eq!(get(17), Some((&b":method"[..], &b"GET"[..])));
        assert_eq!(get(25), Some((&b":status"[..], &b"200"[..])));
    }

    #[test]
    fn find_exact_and_name_only() {
        assert_eq!(find(b":method", b"GET"), Some((17, true)));
        assert_eq!(find(b":method", b"PATCH"), Some((15, false)));
        assert_eq!(find(b"x-not-there", b"v"), None);
    }
}
