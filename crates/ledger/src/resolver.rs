//! Identity resolution - map a raw scanned value to an account
//!
//! Precedence is fixed: identity code, then account id, then a JSON payload
//! carrying `accountId` (or legacy `userId`) and/or `code`. The first branch
//! that matches wins, so a value that is one account's code and another's id
//! resolves to the code owner.

use cleancredit_core::Account;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::borrow::Cow;

/// Which rule produced the match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    IdentityCode,
    AccountId,
    Payload,
}

/// A successful resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub account: &'a Account,
    pub matched_by: MatchedBy,
}

/// Fields a payload may carry
#[derive(Debug, Default, PartialEq, Eq)]
struct ScanPayload {
    account_id: Option<String>,
    code: Option<String>,
}

/// Percent-decode a scanned value.
///
/// Decoding is strict: a `%` that does not start a two-digit hex escape, or
/// escapes that do not form UTF-8, leave the raw value untouched.
pub fn decode_scan_value(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') || !has_valid_escapes(raw) {
        return Cow::Borrowed(raw);
    }
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Borrowed(raw),
    }
}

fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = |offset: usize| bytes.get(i + offset).map_or(false, u8::is_ascii_hexdigit);
            if !(hex(1) && hex(2)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Resolve a raw scanned value against the account pool.
///
/// Returns `None` when nothing matches; the caller reports that as an
/// unrecognized code.
pub fn resolve<'a>(raw: &str, accounts: &'a [Account]) -> Option<Resolved<'a>> {
    let decoded = decode_scan_value(raw);
    let value = decoded.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(account) = accounts.iter().find(|a| a.identity_code.as_str() == value) {
        tracing::debug!(account = %account.id, "Scan resolved by identity code");
        return Some(Resolved {
            account,
            matched_by: MatchedBy::IdentityCode,
        });
    }

    if let Some(account) = accounts.iter().find(|a| a.id.as_str() == value) {
        tracing::debug!(account = %account.id, "Scan resolved by account id");
        return Some(Resolved {
            account,
            matched_by: MatchedBy::AccountId,
        });
    }

    let payload = parse_payload(value)?;
    let account = match (payload.account_id.as_deref(), payload.code.as_deref()) {
        (Some(id), Some(code)) => accounts
            .iter()
            .find(|a| a.id.as_str() == id && a.identity_code.as_str() == code),
        (None, Some(code)) => accounts.iter().find(|a| a.identity_code.as_str() == code),
        (Some(id), None) => accounts.iter().find(|a| a.id.as_str() == id),
        (None, None) => None,
    }?;

    tracing::debug!(account = %account.id, "Scan resolved by payload");
    Some(Resolved {
        account,
        matched_by: MatchedBy::Payload,
    })
}

fn parse_payload(value: &str) -> Option<ScanPayload> {
    let Value::Object(map) = serde_json::from_str::<Value>(value).ok()? else {
        return None;
    };

    let field = |names: &[&str]| -> Result<Option<String>, ()> {
        for name in names {
            match map.get(*name) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => return Ok(Some(s.trim().to_string())),
                Some(Value::Number(n)) => return Ok(Some(n.to_string())),
                Some(_) => return Err(()),
            }
        }
        Ok(None)
    };

    Some(ScanPayload {
        account_id: field(&["accountId", "userId"]).ok()?,
        code: field(&["code"]).ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleancredit_core::{AccountId, IdentityCode, Points};

    fn slot(id: &str, code: &str) -> Account {
        Account::unclaimed(
            AccountId::new(id).unwrap(),
            IdentityCode::new(code).unwrap(),
            Points::new(1000),
        )
    }

    fn pool() -> Vec<Account> {
        vec![
            slot("TAG_001", "8472910384"),
            slot("TAG_002", "2948571039"),
            slot("TAG_003", "5019283746"),
        ]
    }

    #[test]
    fn test_resolve_by_code() {
        let accounts = pool();
        let resolved = resolve("2948571039", &accounts).unwrap();
        assert_eq!(resolved.account.id.as_str(), "TAG_002");
        assert_eq!(resolved.matched_by, MatchedBy::IdentityCode);
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let accounts = pool();
        let resolved = resolve("  5019283746\n", &accounts).unwrap();
        assert_eq!(resolved.account.id.as_str(), "TAG_003");
    }

    #[test]
    fn test_resolve_by_account_id() {
        let accounts = pool();
        let resolved = resolve("TAG_003", &accounts).unwrap();
        assert_eq!(resolved.account.id.as_str(), "TAG_003");
        assert_eq!(resolved.matched_by, MatchedBy::AccountId);
    }

    #[test]
    fn test_code_wins_over_account_id() {
        // An account whose id looks like another account's code
        let mut accounts = pool();
        accounts.push(slot("2948571039", "1029384756"));

        let resolved = resolve("2948571039", &accounts).unwrap();
        assert_eq!(resolved.account.id.as_str(), "TAG_002");
        assert_eq!(resolved.matched_by, MatchedBy::IdentityCode);
    }

    #[test]
    fn test_resolve_payload_pair() {
        let accounts = pool();
        let raw = r#"{"accountId":"TAG_001","code":"8472910384"}"#;
        let resolved = resolve(raw, &accounts).unwrap();
        assert_eq!(resolved.account.id.as_str(), "TAG_001");
        assert_eq!(resolved.matched_by, MatchedBy::Payload);
    }

    #[test]
    fn test_payload_pair_must_agree() {
        let accounts = pool();
        let raw = r#"{"accountId":"TAG_001","code":"2948571039"}"#;
        assert!(resolve(raw, &accounts).is_none());
    }

    #[test]
    fn test_payload_legacy_user_id() {
        let accounts = pool();
        let raw = r#"{"userId":"TAG_002","code":"2948571039"}"#;
        assert_eq!(resolve(raw, &accounts).unwrap().account.id.as_str(), "TAG_002");
    }

    #[test]
    fn test_payload_single_field() {
        let accounts = pool();

        let by_code = resolve(r#"{"code":"5019283746"}"#, &accounts).unwrap();
        assert_eq!(by_code.account.id.as_str(), "TAG_003");

        let by_id = resolve(r#"{"accountId":"TAG_001"}"#, &accounts).unwrap();
        assert_eq!(by_id.account.id.as_str(), "TAG_001");

        assert!(resolve(r#"{"name":"Asha"}"#, &accounts).is_none());
    }

    #[test]
    fn test_percent_encoded_payload() {
        let accounts = pool();
        let raw = "%7B%22accountId%22%3A%22TAG_002%22%2C%22code%22%3A%222948571039%22%7D";
        let resolved = resolve(raw, &accounts).unwrap();
        assert_eq!(resolved.account.id.as_str(), "TAG_002");
        assert_eq!(resolved.matched_by, MatchedBy::Payload);
    }

    #[test]
    fn test_malformed_escape_uses_raw_value() {
        assert_eq!(decode_scan_value("100%"), "100%");
        assert_eq!(decode_scan_value("%zz12"), "%zz12");
        assert_eq!(decode_scan_value("%FF"), "%FF");
        assert_eq!(decode_scan_value("TAG%5F001"), "TAG_001");
    }

    #[test]
    fn test_unresolvable_values() {
        let accounts = pool();
        assert!(resolve("1111111111", &accounts).is_none());
        assert!(resolve("", &accounts).is_none());
        assert!(resolve("   ", &accounts).is_none());
        assert!(resolve("{not json", &accounts).is_none());
        assert!(resolve("[1,2,3]", &accounts).is_none());
    }
}
