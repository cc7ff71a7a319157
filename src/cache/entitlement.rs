//! Per-scope entitlement encryption: HKDF-derived AES-256-GCM subkeys.
//! Spec.md §4.E "Entitlement layer".

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use super::Error;

pub const MASTER_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Supplies the current request's entitlement scope. `None` means the
/// caller is unscoped (public access).
pub trait EntitlementProvider: Send + Sync {
    fn scope(&self) -> Option<String>;
}

/// A fixed scope, mainly for tests and simple single-tenant embeddings.
pub struct FixedScopeProvider(pub Option<String>);

impl EntitlementProvider for FixedScopeProvider {
    fn scope(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Joins the non-null scopes of its inner providers with `|`, yielding
/// `None` when every inner provider reports `None`.
pub struct CompositeEntitlementProvider {
    providers: Vec<Box<dyn EntitlementProvider>>,
}

impl CompositeEntitlementProvider {
    pub fn new(providers: Vec<Box<dyn EntitlementProvider>>) -> Self {
        CompositeEntitlementProvider { providers }
    }
}

impl EntitlementProvider for CompositeEntitlementProvider {
    fn scope(&self) -> Option<String> {
        let scopes: Vec<String> = self.providers.iter().filter_map(|p| p.scope()).collect();
        if scopes.is_empty() {
            None
        } else {
            Some(scopes.join("|"))
        }
    }
}

fn derive_subkey(master_key: &[u8; MASTER_KEY_LEN], scope: &str, cache_key: &str) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(scope.as_bytes()), master_key);
    let mut okm = [0u8; 32];
    hk.expand(cache_key.as_bytes(), &mut okm)
        .expect("32-byte okm is within HKDF-SHA256's output length limit");
    okm
}

/// Encrypts `plaintext` under a subkey derived from `master_key` and
/// `scope`, writing `nonce ‖ ciphertext ‖ tag`.
pub fn encrypt(
    master_key: &[u8; MASTER_KEY_LEN],
    scope: &str,
    cache_key: &str,
    plaintext: &[u8],
) -> Vec<u8> {
    let subkey = derive_subkey(master_key, scope, cache_key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&subkey));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .expect("AES-256-GCM encryption of an in-memory buffer cannot fail");
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypts a `nonce ‖ ciphertext ‖ tag` buffer. Returns `None` on a tag
/// mismatch (tampering is transparent to callers, spec.md §7 `IntegrityFailure`).
pub fn decrypt(
    master_key: &[u8; MASTER_KEY_LEN],
    scope: &str,
    cache_key: &str,
    stored: &[u8],
) -> Option<Vec<u8>> {
    if stored.len() < NONCE_LEN {
        return None;
    }
    let (nonce_bytes, ciphertext) = stored.split_at(NONCE_LEN);
    let subkey = derive_subkey(master_key, scope, cache_key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&subkey));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .ok()
}

pub fn validate_master_key(key: &[u8]) -> Result<[u8; MASTER_KEY_LEN], Error> {
    key.try_into()
        .map_err(|_| Error::InvalidArgument("master key must be exactly 32 bytes".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encrypt_decrypt() {
        let key = [7u8; MASTER_KEY_LEN];
        let ct = encrypt(&key, "tenant-a", "k1", b"hello");
        let pt = decrypt(&key, "tenant-a", "k1", &ct).unwrap();
        assert_eq!(pt, b"hello");
    }

    #[test]
    fn wrong_scope_fails_to_decrypt() {
        let key = [7u8; MASTER_KEY_LEN];
        let ct = encrypt(&key, "tenant-a", "k1", b"hello");
        assert!(decrypt(&key, "tenant-b", "k1", &ct).is_none());
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let key = [7u8; MASTER_KEY_LEN];
        let mut ct = encrypt(&key, "tenant-a", "k1", b"hello");
        let last = ct.len() - 1;
        ct[last] ^= 0xff;
        assert!(decrypt(&key, "tenant-a", "k1", &ct).is_none());
    }

    #[test]
    fn composite_provider_joins_scopes() {
        let composite = CompositeEntitlementProvider::new(vec![
            Box::new(FixedScopeProvider(Some("a".into()))),
            Box::new(FixedScopeProvider(None)),
            Box::new(FixedScopeProvider(Some("b".into()))),
        ]);
        assert_eq!(composite.scope(), Some("a|b".to_string()));
        let all_null = CompositeEntitlementProvider::new(vec![
            Box::new(FixedScopeProvider(None)),
            Box::new(FixedScopeProvider(None)),
        ]);
        assert_eq!(all_null.scope(), None);
    }
}
