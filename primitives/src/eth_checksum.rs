//! [EIP-55](https://eips.ethereum.org/EIPS/eip-55) mixed-case checksum encoding.
use tiny_keccak::{Hasher, Keccak};

/// Checksums the raw address bytes and returns a `0x` prefixed string.
pub fn checksum(address: &[u8]) -> String {
    let lowercase = hex::encode(address);

    let mut address_hash = [0_u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(lowercase.as_bytes());
    hasher.finalize(&mut address_hash);

    let mut checksummed = String::with_capacity(2 + lowercase.len());
    checksummed.push_str("0x");

    for (index, hex_char) in lowercase.chars().enumerate() {
        // high nibble for even positions, low nibble for odd ones
        let hash_byte = address_hash[index / 2];
        let nibble = if index % 2 == 0 {
            hash_byte >> 4
        } else {
            hash_byte & 0x0f
        };

        if nibble > 7 {
            checksummed.push(hex_char.to_ascii_uppercase());
        } else {
            checksummed.push(hex_char);
        }
    }

    checksummed
}
