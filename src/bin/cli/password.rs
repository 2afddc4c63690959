//! Password handling for CLI operations.

use android_backup::Password;
use rpassword::prompt_password;

/// Gets a password from the provided option or prompts the user
pub fn get_password(provided: Option<String>, backup_encrypted: bool) -> Option<Password> {
    if let Some(pwd) = provided {
        return Some(Password::new(pwd));
    }

    if !backup_encrypted {
        return None;
    }

    match prompt_password("Enter password: ") {
        Ok(pwd) if !pwd.is_empty() => Some(Password::new(pwd)),
        _ => None,
    }
}

/// Prompts for password confirmation (for creating encrypted backups)
pub fn confirm_password() -> Option<Password> {
    let pwd1 = match prompt_password("Enter password: ") {
        Ok(pwd) => pwd,
        Err(_) => return None,
    };

    if pwd1.is_empty() {
        eprintln!("Password cannot be empty");
        return None;
    }

    let pwd2 = match prompt_password("Confirm password: ") {
        Ok(pwd) => pwd,
        Err(_) => return None,
    };

    if pwd1 == pwd2 {
        Some(Password::new(pwd1))
    } else {
        eprintln!("Passwords do not match");
        None
    }
}

/// Returns the provided password or prompts twice for a new one
pub fn get_or_confirm_password(provided: Option<String>) -> Option<Password> {
    match provided {
        Some(pwd) => Some(Password::new(pwd)),
        None => confirm_password(),
    }
}
