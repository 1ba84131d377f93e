//! Response signing with sr25519
//!
//! The signed payload is the JSON object
//! `{"document": .., "chunk_size": .., "chunk_qty": .., "chunks": [..]}` with the
//! keys in that order, encoded exactly like Python's default `json.dumps`
//! (`", "` / `": "` separators, ASCII-only output), so that validators can
//! rebuild the same bytes.

use crate::text::chunking::error::{ChunkingError, Result};
use crate::text::chunking::types::{ChunkRequest, ChunkResponse, ChunkResult};
use schnorrkel::{ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature, signing_context};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Signing context shared with substrate-based verifiers
pub const SIGNING_CONTEXT: &[u8] = b"substrate";

#[derive(Serialize)]
struct CanonicalPayload<'a> {
    document: &'a str,
    chunk_size: u32,
    chunk_qty: u32,
    chunks: &'a [String],
}

/// serde_json formatter matching Python's `json.dumps` defaults
struct PythonJsonFormatter;

impl Formatter for PythonJsonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    // serde_json already escapes quotes, backslashes and C0 controls;
    // everything else outside printable ASCII becomes \uXXXX (UTF-16 units)
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if (' '..='~').contains(&c) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Canonical bytes covered by the miner signature
pub fn canonical_payload(
    document: &str,
    chunk_size: u32,
    chunk_qty: u32,
    chunks: &[String],
) -> Result<Vec<u8>> {
    let payload = CanonicalPayload {
        document,
        chunk_size,
        chunk_qty,
        chunks,
    };
    let mut out = Vec::with_capacity(document.len() * 2 + 64);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PythonJsonFormatter);
    payload.serialize(&mut ser)?;
    Ok(out)
}

fn decode_hex(name: &str, value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).map_err(|e| ChunkingError::configuration(format!("{name} is not hex: {e}")))
}

/// sr25519 hotkey used to sign responses
#[derive(Clone)]
pub struct Hotkey {
    keypair: Keypair,
}

impl std::fmt::Debug for Hotkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hotkey")
            .field("public", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl Hotkey {
    /// Derive the keypair from a 32-byte mini secret (substrate seed)
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let mini = MiniSecretKey::from_bytes(seed)
            .map_err(|e| ChunkingError::configuration(format!("invalid hotkey seed: {e}")))?;
        Ok(Self {
            keypair: mini.expand_to_keypair(ExpansionMode::Ed25519),
        })
    }

    pub fn from_seed_hex(seed: &str) -> Result<Self> {
        Self::from_seed(&decode_hex("hotkey seed", seed)?)
    }

    /// Build from a 32-byte public key and a 64-byte private key (ed25519 layout)
    pub fn from_pair(public: &[u8], private: &[u8]) -> Result<Self> {
        let keypair = Keypair::from_half_ed25519_bytes(&[private, public].concat())
            .map_err(|e| ChunkingError::configuration(format!("invalid hotkey pair: {e}")))?;
        if keypair.secret.to_public() != keypair.public {
            return Err(ChunkingError::configuration(
                "hotkey public key does not match the private key",
            ));
        }
        Ok(Self { keypair })
    }

    pub fn from_pair_hex(public: &str, private: &str) -> Result<Self> {
        Self::from_pair(
            &decode_hex("hotkey public key", public)?,
            &decode_hex("hotkey private key", private)?,
        )
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Private key in the 64-byte ed25519 layout accepted by [`Hotkey::from_pair`]
    pub fn private_key(&self) -> [u8; 64] {
        self.keypair.secret.to_ed25519_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let context = signing_context(SIGNING_CONTEXT);
        self.keypair.sign(context.bytes(message)).to_bytes()
    }
}

/// Check a detached signature over `message`
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let public = PublicKey::from_bytes(public_key)
        .map_err(|e| ChunkingError::signing(format!("invalid public key: {e}")))?;
    let signature = Signature::from_bytes(signature)
        .map_err(|e| ChunkingError::signing(format!("invalid signature: {e}")))?;
    public
        .verify(signing_context(SIGNING_CONTEXT).bytes(message), &signature)
        .map_err(|e| ChunkingError::signing(format!("signature mismatch: {e}")))
}

/// Signs the outgoing chunk results
#[derive(Debug, Clone)]
pub struct ResponseSigner {
    hotkey: Hotkey,
}

impl ResponseSigner {
    pub fn new(hotkey: Hotkey) -> Self {
        Self { hotkey }
    }

    pub fn hotkey(&self) -> &Hotkey {
        &self.hotkey
    }

    /// Hex signature over the effective values of `result` and the request's document
    pub fn sign(&self, request: &ChunkRequest, result: &ChunkResult) -> Result<String> {
        let payload = canonical_payload(
            &request.document,
            result.chunk_size,
            result.chunk_qty,
            result.chunks(),
        )?;
        Ok(hex::encode(self.hotkey.sign(&payload)))
    }

    /// Build the signed response for `request`
    pub fn sign_response(&self, request: ChunkRequest, result: ChunkResult) -> Result<ChunkResponse> {
        let miner_signature = self.sign(&request, &result)?;
        Ok(ChunkResponse {
            document: request.document,
            chunk_size: result.chunk_size,
            chunk_qty: result.chunk_qty,
            soft_time_limit: request.soft_time_limit,
            chunks: result.into_chunks(),
            miner_signature,
        })
    }
}

/// Verify `response.miner_signature` against the miner's public key
pub fn verify_response(public_key: &[u8], response: &ChunkResponse) -> Result<()> {
    let payload = canonical_payload(
        &response.document,
        response.chunk_size,
        response.chunk_qty,
        &response.chunks,
    )?;
    let signature = hex::decode(&response.miner_signature)
        .map_err(|e| ChunkingError::signing(format!("signature is not hex: {e}")))?;
    verify(public_key, &payload, &signature)
}
