//! Registry ABI - Calldata encoding and log decoding for the registry contract
//!
//! Only the types the registry calls take are encoded: `uint8`/`uint256`
//! (held as `u64`), `string` and `string[]`.

use dehug_registry::{Address, ContentId, ContentKind, ContentUploadRequest, ContentUploadedEvent, TxHash};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// `uploadContent` function signature
pub const UPLOAD_CONTENT_SIGNATURE: &str =
    "uploadContent(uint8,string,string,string,string,string,string[])";
/// Locator to token id lookup
pub const LOOKUP_SIGNATURE: &str = "ipfsHashToTokenId(string)";
/// `ContentUploaded(uint256 indexed tokenId, address indexed uploader, uint8 contentType, string ipfsHash, string title)`
pub const CONTENT_UPLOADED_SIGNATURE: &str = "ContentUploaded(uint256,address,uint8,string,string)";
/// Selector of the standard `Error(string)` revert payload
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const WORD: usize = 32;

/// ABI decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Input shorter than the layout requires
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },
    /// Integer does not fit the target type
    #[error("integer overflow")]
    Overflow,
    /// String payload is not UTF-8
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    /// Log does not carry the expected topics
    #[error("unexpected log topics")]
    UnexpectedTopics,
    /// Content kind outside the enum
    #[error("unknown content kind {0}")]
    InvalidKind(u8),
}

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// 4-byte function selector
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topic0 of the `ContentUploaded` event
pub fn content_uploaded_topic() -> [u8; 32] {
    keccak256(CONTENT_UPLOADED_SIGNATURE.as_bytes())
}

/// A value to encode
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    /// Unsigned integer (any width up to 256 bits, value fits `u64`)
    Uint(u64),
    /// Dynamic string
    Str(&'a str),
    /// Dynamic array of strings
    StrArray(&'a [String]),
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let rem = out.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

fn encode_string(s: &str) -> Vec<u8> {
    let mut out = uint_word(s.len() as u64).to_vec();
    out.extend(padded(s.as_bytes()));
    out
}

/// Head/tail encode a tuple of tokens
pub fn encode_tokens(tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Uint(v) => head.extend(uint_word(*v)),
            Token::Str(s) => {
                head.extend(uint_word((head_len + tail.len()) as u64));
                tail.extend(encode_string(s));
            }
            Token::StrArray(items) => {
                head.extend(uint_word((head_len + tail.len()) as u64));
                tail.extend(uint_word(items.len() as u64));
                let elements: Vec<Token<'_>> = items.iter().map(|s| Token::Str(s)).collect();
                tail.extend(encode_tokens(&elements));
            }
        }
    }

    head.extend(tail);
    head
}

/// Calldata for `uploadContent`
pub fn encode_upload_content(request: &ContentUploadRequest) -> Vec<u8> {
    let mut data = selector(UPLOAD_CONTENT_SIGNATURE).to_vec();
    data.extend(encode_tokens(&[
        Token::Uint(u64::from(request.kind.as_u8())),
        Token::Str(&request.content_locator),
        Token::Str(&request.metadata_locator),
        Token::Str(request.image_locator_or_empty()),
        Token::Str(&request.title),
        Token::Str(&request.description),
        Token::StrArray(&request.tags),
    ]));
    data
}

/// Calldata for the locator lookup
pub fn encode_lookup(content_locator: &str) -> Vec<u8> {
    let mut data = selector(LOOKUP_SIGNATURE).to_vec();
    data.extend(encode_tokens(&[Token::Str(content_locator)]));
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow)?;
    data.get(offset..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })
}

fn word_to_u64(word: &[u8]) -> Result<u64, AbiError> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(buf))
}

fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    usize::try_from(word_to_u64(word)?).map_err(|_| AbiError::Overflow)
}

/// Decode a single `uint256` return value
pub fn decode_uint(data: &[u8]) -> Result<u64, AbiError> {
    word_to_u64(word_at(data, 0)?)
}

/// Decode the string whose offset sits in the head slot at `head_offset`
pub fn decode_string_at(data: &[u8], head_offset: usize) -> Result<String, AbiError> {
    let offset = word_to_usize(word_at(data, head_offset)?)?;
    let len = word_to_usize(word_at(data, offset)?)?;
    let start = offset + WORD;
    let end = start.checked_add(len).ok_or(AbiError::Overflow)?;
    let bytes = data.get(start..end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

/// Reason string of an `Error(string)` revert payload
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    decode_string_at(body, 0).ok()
}

/// Log entry as returned by the node, before event decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Indexed topics, topic0 first
    pub topics: Vec<[u8; 32]>,
    /// Non-indexed data
    pub data: Vec<u8>,
    /// Block that emitted the log
    pub block_number: u64,
    /// Emitting transaction
    pub transaction_hash: TxHash,
}

/// Decode a `ContentUploaded` log
pub fn decode_content_uploaded(log: &RawLog) -> Result<ContentUploadedEvent, AbiError> {
    let [topic0, id_topic, uploader_topic] = log.topics.as_slice() else {
        return Err(AbiError::UnexpectedTopics);
    };
    if *topic0 != content_uploaded_topic() {
        return Err(AbiError::UnexpectedTopics);
    }

    let id = ContentId(word_to_u64(id_topic)?);
    let mut uploader = [0u8; 20];
    uploader.copy_from_slice(&uploader_topic[12..]);

    let raw_kind = word_to_u64(word_at(&log.data, 0)?)?;
    let raw_kind = u8::try_from(raw_kind).map_err(|_| AbiError::Overflow)?;
    let kind = ContentKind::from_u8(raw_kind).ok_or(AbiError::InvalidKind(raw_kind))?;

    Ok(ContentUploadedEvent {
        id,
        uploader: Address(uploader),
        kind,
        content_locator: decode_string_at(&log.data, WORD)?,
        title: decode_string_at(&log.data, 2 * WORD)?,
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    })
}

/// Inverse of [`decode_content_uploaded`], for fixtures and local nodes
pub fn encode_content_uploaded(event: &ContentUploadedEvent) -> RawLog {
    let mut uploader_topic = [0u8; 32];
    uploader_topic[12..].copy_from_slice(event.uploader.as_bytes());
    RawLog {
        topics: vec![content_uploaded_topic(), uint_word(event.id.0), uploader_topic],
        data: encode_tokens(&[
            Token::Uint(u64::from(event.kind.as_u8())),
            Token::Str(&event.content_locator),
            Token::Str(&event.title),
        ]),
        block_number: event.block_number,
        transaction_hash: event.transaction_hash,
    }
}
