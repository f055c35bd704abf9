//! Known-answer validation against published AES-256-GCM test vectors

use anyhow::Result;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sealtoken::Cipher;
use sealtoken::cipher::{NONCE_SIZE, NonceSource};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GoldenVector {
    key: String,
    nonce: String,
    plaintext: String,
    ciphertext: String,
    comment: String,
}

/// Hands out one predetermined nonce, standing in for the OS source.
struct FixedNonce([u8; NONCE_SIZE]);

impl NonceSource for FixedNonce {
    fn fill_nonce(&self, nonce: &mut [u8]) -> sealtoken::Result<usize> {
        nonce.copy_from_slice(&self.0);
        Ok(NONCE_SIZE)
    }
}

fn load_golden_vectors() -> Result<Vec<GoldenVector>> {
    let json_data = include_str!("../testdata/golden-vectors.json");
    let vectors: Vec<GoldenVector> = serde_json::from_str(json_data)?;
    Ok(vectors)
}

#[test]
fn test_golden_vectors_seal() {
    let vectors = load_golden_vectors().expect("failed to load golden vectors");
    assert!(!vectors.is_empty());

    for (i, vector) in vectors.iter().enumerate() {
        let key = hex::decode(&vector.key).expect("failed to decode key");
        let nonce: [u8; NONCE_SIZE] = hex::decode(&vector.nonce)
            .expect("failed to decode nonce")
            .try_into()
            .expect("nonce must be 12 bytes");
        let plaintext = hex::decode(&vector.plaintext).expect("failed to decode plaintext");
        let ciphertext = hex::decode(&vector.ciphertext).expect("failed to decode ciphertext");

        let cipher = Cipher::new(&key)
            .expect("vector key must be valid")
            .with_nonce_source(FixedNonce(nonce));
        let token = cipher.seal(&plaintext).expect("seal failed");

        let mut expected = nonce.to_vec();
        expected.extend_from_slice(&ciphertext);
        assert_eq!(
            URL_SAFE_NO_PAD.decode(&token).unwrap(),
            expected,
            "vector {i} ({})",
            vector.comment
        );
        assert_eq!(token, URL_SAFE_NO_PAD.encode(&expected), "vector {i}");
    }
}

#[test]
fn test_golden_vectors_open() {
    let vectors = load_golden_vectors().expect("failed to load golden vectors");

    for (i, vector) in vectors.iter().enumerate() {
        let key = hex::decode(&vector.key).unwrap();
        let mut raw = hex::decode(&vector.nonce).unwrap();
        raw.extend_from_slice(&hex::decode(&vector.ciphertext).unwrap());
        let expected = hex::decode(&vector.plaintext).unwrap();

        let cipher = Cipher::new(&key).unwrap();
        let opened = cipher
            .open(&URL_SAFE_NO_PAD.encode(&raw))
            .unwrap_or_else(|e| panic!("vector {i} ({}) failed: {e}", vector.comment));
        assert_eq!(opened, expected, "vector {i}");

        // Flip the last tag bit
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(cipher.open(&URL_SAFE_NO_PAD.encode(&raw)).is_err(), "vector {i}");
    }
}

#[test]
fn test_text_vector_round_trip() {
    // Test case 14's plaintext is sixteen NUL characters, valid UTF-8 text.
    let vectors = load_golden_vectors().unwrap();
    let vector = &vectors[1];
    let key = hex::decode(&vector.key).unwrap();
    let plaintext = String::from_utf8(hex::decode(&vector.plaintext).unwrap()).unwrap();

    let cipher = Cipher::new(&key).unwrap();
    let token = cipher.encrypt(&plaintext).unwrap();
    assert_eq!(cipher.decrypt(&token).unwrap(), plaintext);
}
