use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub(crate) const CODE_LENGTH: usize = 6;

pub(crate) fn generate_unlock_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(CODE_LENGTH);
    for _ in 0..CODE_LENGTH {
        let index = rng.gen_range(0..ALPHABET.len());
        code.push(ALPHABET[index] as char);
    }
    code
}

/// Codes are stored uppercase; the supplied value is matched
/// case-insensitively.
pub(crate) fn codes_match(stored: &str, supplied: &str) -> bool {
    stored.eq_ignore_ascii_case(supplied.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_fixed_length_and_alphabet() {
        for _ in 0..50 {
            let code = generate_unlock_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn match_is_case_insensitive() {
        assert!(codes_match("A1B2C3", "a1b2c3"));
        assert!(codes_match("A1B2C3", " a1B2c3 "));
        assert!(!codes_match("A1B2C3", "a1b2c4"));
    }
}
