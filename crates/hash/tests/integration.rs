//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use libstage_hash::*;
    use tempfile::tempdir;
    use tokio::fs;

    #[tokio::test]
    async fn test_hash_reader_over_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("libfoo.so");

        let data = b"\x7fELF verify this content";
        fs::write(&file_path, data).await.unwrap();

        let file = fs::File::open(&file_path).await.unwrap();
        let hash = Hash::hash_reader(file).await.unwrap();
        assert_eq!(hash, Hash::from_data(data));
        assert_ne!(hash, Hash::from_data(b"different content"));
    }

    #[test]
    fn test_hash_from_hex_errors() {
        // Too short
        let result = Hash::from_hex("1234");
        assert!(result.is_err());

        // Too long
        let result = Hash::from_hex(&"a".repeat(66));
        assert!(result.is_err());

        // Invalid hex
        let result = Hash::from_hex("xyz123");
        assert!(result.is_err());
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = Hash::from_data(b"A");
        assert_eq!(Hash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert_eq!(hash.to_hex().len(), 64);
    }
}
