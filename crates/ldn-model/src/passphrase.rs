use rand::Rng;

/// Random passphrase in the format offered to users, `Ryujinx-` and 8 hex digits.
pub fn generate_passphrase() -> String {
    format!("Ryujinx-{:08x}", rand::thread_rng().gen::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_format() {
        let passphrase = generate_passphrase();
        let (prefix, code) = passphrase.split_at(8);
        assert_eq!(prefix, "Ryujinx-");
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
