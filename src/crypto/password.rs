//! Password handling for encrypted backups.

use zeroize::Zeroizing;

/// A password for backup encryption/decryption.
///
/// The password is zeroed on drop. Key derivation consumes its UTF-8 bytes.
#[derive(Clone)]
pub struct Password {
    inner: Zeroizing<String>,
}

impl Password {
    /// Creates a new password from a string.
    pub fn new<S: Into<String>>(password: S) -> Self {
        Self {
            inner: Zeroizing::new(password.into()),
        }
    }

    /// Returns the UTF-8 bytes fed into PBKDF2.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Returns the password as a string slice.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Returns true if the password is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the length of the password in characters.
    pub fn len(&self) -> usize {
        self.inner.chars().count()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Password {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_bytes_ascii() {
        let password = Password::new("test");
        assert_eq!(password.as_bytes(), b"test");
    }

    #[test]
    fn test_password_bytes_unicode() {
        let password = Password::new("пароль");
        // two bytes per Cyrillic letter in UTF-8
        assert_eq!(password.as_bytes().len(), 12);
        assert_eq!(password.len(), 6);
    }

    #[test]
    fn test_password_debug() {
        let password = Password::new("secret");
        let debug = format!("{:?}", password);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("len"));
    }

    #[test]
    fn test_password_from_string() {
        let password: Password = String::from("test").into();
        assert_eq!(password.as_str(), "test");
        let password: Password = "test".into();
        assert!(!password.is_empty());
        assert!(Password::new("").is_empty());
    }
}
