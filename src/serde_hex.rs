//! Serde helpers for `0x`-prefixed hex byte strings.

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "super")]
        bytes: Vec<u8>,
    }

    #[test]
    fn test_hex_field() {
        let json = serde_json::to_string(&Wrapper { bytes: vec![0xca, 0xfe] }).unwrap();
        assert_eq!(json, r#"{"bytes":"0xcafe"}"#);

        let bare: Wrapper = serde_json::from_str(r#"{"bytes":"cafe"}"#).unwrap();
        assert_eq!(bare.bytes, vec![0xca, 0xfe]);
        assert!(serde_json::from_str::<Wrapper>(r#"{"bytes":"0xzz"}"#).is_err());
    }
}
