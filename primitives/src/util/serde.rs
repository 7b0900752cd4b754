/// (De)serializes raw bytes as a `0x` prefixed hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::ToHex;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&bytes.to_hex_prefixed())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        let hex = string
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("expected a `0x` prefixed hex string"))?;

        hex::decode(hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Payload {
        #[serde(with = "super::hex_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn hex_bytes_de_serialization() {
        let payload = Payload {
            data: vec![0xde, 0xad, 0xbe, 0xef],
        };

        let json = serde_json::to_value(&payload).expect("Should serialize");
        assert_eq!(json!({ "data": "0xdeadbeef" }), json);
        assert_eq!(payload, serde_json::from_value(json).expect("Should deserialize"));

        assert!(serde_json::from_value::<Payload>(json!({ "data": "deadbeef" })).is_err());
    }
}
