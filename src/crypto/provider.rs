//! Cryptographic backends.

use std::sync::Arc;

use crate::Result;
use crate::error::EnvironmentError;

use super::{BLOCK_SIZE, KEY_SIZE};

/// A stateful block cipher mode processing whole blocks in place.
pub trait BlockTransform: Send {
    /// Encrypts or decrypts `data` in place, continuing the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not a multiple of the block size.
    fn process_blocks(&mut self, data: &mut [u8]) -> Result<()>;
}

/// The primitives needed by the backup format.
pub trait CryptoProvider: Send + Sync + std::fmt::Debug {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Returns `true` if the backend can perform operations.
    fn is_available(&self) -> bool;

    /// PBKDF2-HMAC-SHA1 with a 32-byte output.
    fn derive_key(&self, password: &[u8], salt: &[u8], rounds: u32) -> Result<[u8; KEY_SIZE]>;

    /// Fills `buf` from a cryptographically secure source.
    fn fill_random(&self, buf: &mut [u8]) -> Result<()>;

    /// Creates an AES-256-CBC decryptor.
    fn cbc_decryptor(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; BLOCK_SIZE],
    ) -> Result<Box<dyn BlockTransform>>;

    /// Creates an AES-256-CBC encryptor.
    fn cbc_encryptor(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; BLOCK_SIZE],
    ) -> Result<Box<dyn BlockTransform>>;
}

/// Fails with [`EnvironmentError::CryptoUnavailable`] if `provider` is absent.
pub fn ensure_available(provider: &dyn CryptoProvider) -> Result<()> {
    if provider.is_available() {
        Ok(())
    } else {
        log::warn!("crypto provider '{}' is unavailable", provider.name());
        Err(EnvironmentError::CryptoUnavailable.into())
    }
}

/// Returns the provider compiled into this build.
pub fn default_provider() -> Arc<dyn CryptoProvider> {
    #[cfg(feature = "aes")]
    {
        Arc::new(RustCryptoProvider::new())
    }
    #[cfg(not(feature = "aes"))]
    {
        Arc::new(UnavailableProvider)
    }
}

/// A provider that reports itself unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

impl CryptoProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn derive_key(&self, _: &[u8], _: &[u8], _: u32) -> Result<[u8; KEY_SIZE]> {
        Err(EnvironmentError::CryptoUnavailable.into())
    }

    fn fill_random(&self, _: &mut [u8]) -> Result<()> {
        Err(EnvironmentError::CryptoUnavailable.into())
    }

    fn cbc_decryptor(
        &self,
        _: &[u8; KEY_SIZE],
        _: &[u8; BLOCK_SIZE],
    ) -> Result<Box<dyn BlockTransform>> {
        Err(EnvironmentError::CryptoUnavailable.into())
    }

    fn cbc_encryptor(
        &self,
        _: &[u8; KEY_SIZE],
        _: &[u8; BLOCK_SIZE],
    ) -> Result<Box<dyn BlockTransform>> {
        Err(EnvironmentError::CryptoUnavailable.into())
    }
}

#[cfg(feature = "aes")]
pub use rustcrypto::RustCryptoProvider;

#[cfg(feature = "aes")]
mod rustcrypto {
    use std::io;

    use aes::Aes256;
    use cbc::cipher::generic_array::GenericArray;
    use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
    use rand::RngCore;
    use rand::rngs::OsRng;
    use sha1::Sha1;

    use super::{BLOCK_SIZE, BlockTransform, CryptoProvider, KEY_SIZE};
    use crate::Result;

    type Aes256CbcDec = cbc::Decryptor<Aes256>;
    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    fn unaligned(len: usize) -> crate::Error {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} bytes is not a multiple of the AES block size", len),
        )
        .into()
    }

    struct CbcDecrypt(Aes256CbcDec);

    impl BlockTransform for CbcDecrypt {
        fn process_blocks(&mut self, data: &mut [u8]) -> Result<()> {
            if data.len() % BLOCK_SIZE != 0 {
                return Err(unaligned(data.len()));
            }
            for block in data.chunks_exact_mut(BLOCK_SIZE) {
                self.0.decrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            Ok(())
        }
    }

    struct CbcEncrypt(Aes256CbcEnc);

    impl BlockTransform for CbcEncrypt {
        fn process_blocks(&mut self, data: &mut [u8]) -> Result<()> {
            if data.len() % BLOCK_SIZE != 0 {
                return Err(unaligned(data.len()));
            }
            for block in data.chunks_exact_mut(BLOCK_SIZE) {
                self.0.encrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            Ok(())
        }
    }

    /// The RustCrypto backend (`aes`, `cbc`, `pbkdf2`, `sha1`, `rand`).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RustCryptoProvider;

    impl RustCryptoProvider {
        /// Creates the provider.
        pub fn new() -> Self {
            Self
        }
    }

    impl CryptoProvider for RustCryptoProvider {
        fn name(&self) -> &'static str {
            "rustcrypto"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn derive_key(&self, password: &[u8], salt: &[u8], rounds: u32) -> Result<[u8; KEY_SIZE]> {
            let mut key = [0u8; KEY_SIZE];
            pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, rounds, &mut key);
            Ok(key)
        }

        fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
            OsRng
                .try_fill_bytes(buf)
                .map_err(|e| io::Error::other(format!("failed to generate random bytes: {}", e)))?;
            Ok(())
        }

        fn cbc_decryptor(
            &self,
            key: &[u8; KEY_SIZE],
            iv: &[u8; BLOCK_SIZE],
        ) -> Result<Box<dyn BlockTransform>> {
            Ok(Box::new(CbcDecrypt(Aes256CbcDec::new(
                &(*key).into(),
                &(*iv).into(),
            ))))
        }

        fn cbc_encryptor(
            &self,
            key: &[u8; KEY_SIZE],
            iv: &[u8; BLOCK_SIZE],
        ) -> Result<Box<dyn BlockTransform>> {
            Ok(Box::new(CbcEncrypt(Aes256CbcEnc::new(
                &(*key).into(),
                &(*iv).into(),
            ))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_unavailable_provider_fails() {
        let provider = UnavailableProvider;
        assert!(!provider.is_available());
        assert!(matches!(
            ensure_available(&provider),
            Err(Error::Environment(EnvironmentError::CryptoUnavailable))
        ));
        assert!(provider.derive_key(b"pw", b"salt", 1).is_err());
        assert!(provider.fill_random(&mut [0u8; 4]).is_err());
    }

    #[cfg(feature = "aes")]
    #[test]
    fn test_pbkdf2_hmac_sha1_vectors() {
        let provider = RustCryptoProvider::new();
        let cases = [
            (1, "0c60c80f961f0e71f3a9b524af6012062fe037a6e0f0eb94fe8fc46bdc637164"),
            (2, "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957cae93136266537a8d7bf4b76"),
            (4096, "4b007901b765489abead49d926f721d065a429c12e463f6c4cd79401085b03db"),
        ];
        for (rounds, expected) in cases {
            let key = provider.derive_key(b"password", b"salt", rounds).unwrap();
            assert_eq!(hex::encode(key), expected, "rounds {rounds}");
        }
    }

    #[cfg(feature = "aes")]
    #[test]
    fn test_fill_random_changes_buffer() {
        let provider = RustCryptoProvider::new();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        provider.fill_random(&mut a).unwrap();
        provider.fill_random(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[cfg(feature = "aes")]
    #[test]
    fn test_cbc_chains_across_calls() {
        let provider = RustCryptoProvider::new();
        let key = [5u8; KEY_SIZE];
        let iv = [6u8; BLOCK_SIZE];

        let mut whole = [0x42u8; 48];
        provider.cbc_encryptor(&key, &iv).unwrap().process_blocks(&mut whole).unwrap();

        let mut split = [0x42u8; 48];
        let mut enc = provider.cbc_encryptor(&key, &iv).unwrap();
        enc.process_blocks(&mut split[..16]).unwrap();
        enc.process_blocks(&mut split[16..]).unwrap();
        assert_eq!(whole, split);

        let mut dec = provider.cbc_decryptor(&key, &iv).unwrap();
        dec.process_blocks(&mut split[..32]).unwrap();
        dec.process_blocks(&mut split[32..]).unwrap();
        assert_eq!(split, [0x42u8; 48]);
    }

    #[cfg(feature = "aes")]
    #[test]
    fn test_unaligned_input_is_rejected() {
        let provider = RustCryptoProvider::new();
        let mut dec = provider.cbc_decryptor(&[0u8; KEY_SIZE], &[0u8; BLOCK_SIZE]).unwrap();
        assert!(dec.process_blocks(&mut [0u8; 15]).is_err());
    }
}
