//! HTTP digest access authentication (RFC 2617, MD5 only)
//!
//! The gateway answers unauthenticated requests with a `WWW-Authenticate: Digest ...`
//! challenge. We answer each challenge once, so the nonce count is always 1.
use thiserror::Error;

const SCHEME: &str = "digest";
const NONCE_COUNT: &str = "00000001";
const QOP_AUTH: &str = "auth";
const ALGORITHM_MD5: &str = "MD5";

#[derive(Error, Debug, PartialEq)]
pub enum DigestError {
    #[error("not a Digest challenge: {0}")]
    NotDigest(String),
    #[error("challenge is missing '{0}'")]
    MissingParam(&'static str),
    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("unsupported qop '{0}'")]
    UnsupportedQop(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DigestCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
    /// Whether the server asked for `qop=auth`; if not, the RFC 2069 form is used
    pub qop_auth: bool,
}

impl DigestChallenge {
    pub fn parse(header: &str) -> Result<Self, DigestError> {
        let header = header.trim();
        let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(DigestError::NotDigest(header.to_string()));
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut algorithm = None;
        let mut qop = None;
        for (key, value) in parse_params(params) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Some(value),
                "qop" => qop = Some(value),
                _ => log::trace!("Ignoring digest challenge parameter '{key}'"),
            }
        }

        if let Some(alg) = &algorithm {
            if !alg.eq_ignore_ascii_case(ALGORITHM_MD5) {
                return Err(DigestError::UnsupportedAlgorithm(alg.clone()));
            }
        }

        let qop_auth = match qop {
            None => false,
            Some(options) => {
                if options.split(',').any(|o| o.trim() == QOP_AUTH) {
                    true
                } else {
                    return Err(DigestError::UnsupportedQop(options));
                }
            }
        };

        Ok(DigestChallenge {
            realm: realm.ok_or(DigestError::MissingParam("realm"))?,
            nonce: nonce.ok_or(DigestError::MissingParam("nonce"))?,
            opaque,
            algorithm,
            qop_auth,
        })
    }
}

/// Split `key=value, key="quoted, value"` pairs; keys are lower-cased
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let value = if chars.next_if_eq(&'"').is_some() {
            let mut value = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    _ => value.push(c),
                }
            }
            value
        } else {
            let raw: String = chars.by_ref().take_while(|c| *c != ',').collect();
            raw.trim().to_string()
        };

        params.push((key, value));
    }

    params
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

pub fn new_cnonce() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

/// Build the `Authorization` header value answering `challenge`
pub fn authorization(
    credentials: &DigestCredentials,
    challenge: &DigestChallenge,
    method: &str,
    uri: &str,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!(
        "{}:{}:{}",
        credentials.username, challenge.realm, credentials.password
    ));
    let ha2 = md5_hex(&format!("{method}:{uri}"));

    let response = if challenge.qop_auth {
        md5_hex(&format!(
            "{ha1}:{}:{NONCE_COUNT}:{cnonce}:{QOP_AUTH}:{ha2}",
            challenge.nonce
        ))
    } else {
        md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce))
    };

    let mut header = format!(
        r#"Digest username="{}", realm="{}", nonce="{}", uri="{uri}", response="{response}""#,
        credentials.username, challenge.realm, challenge.nonce
    );
    if let Some(algorithm) = &challenge.algorithm {
        header.push_str(&format!(", algorithm={algorithm}"));
    }
    if challenge.qop_auth {
        header.push_str(&format!(
            r#", qop={QOP_AUTH}, nc={NONCE_COUNT}, cnonce="{cnonce}""#
        ));
    }
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(r#", opaque="{opaque}""#));
    }
    header
}
