//! Password hashing

const BCRYPT_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("testtest").unwrap();
        assert_ne!(hash, "testtest");
        assert!(verify_password("testtest", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
