//! Per-field key schedules. Every metadata field and the resource payload
//! itself is encrypted with its own small integer seed; `KeySchedule`
//! binds those seeds to a concrete [`Prng`](crate::prng::Prng) and knows
//! how to turn a seed plus a buffer length into a decrypted byte stream.

use crate::prng::{Ea06Rand, Mt19937, MsvcRand, Prng};
use crate::util::from_utf16le;

/// A field's base seed and whether the ciphertext length must be folded
/// into that seed before use.
#[derive(Clone, Copy, Debug)]
pub struct KValue {
    pub value: i32,
    pub add_len: bool,
}

/// Per-format-version collection of field seeds, bound to the PRNG the
/// format uses and carrying the running hash/password state later fields
/// need to derive the data-payload seed.
pub trait KeySchedule {
    fn force_decode_stream(&mut self, buf: &[u8], key: i32, add_len: bool) -> Vec<u8>;

    fn needs_unicode(&self) -> bool;
    fn needs_legacy(&self) -> bool {
        false
    }
    fn data_uses_hash(&self) -> bool {
        false
    }

    fn file(&self) -> KValue;
    fn tag_size(&self) -> KValue;
    fn tag(&self) -> KValue;
    fn path_size(&self) -> KValue;
    fn path(&self) -> KValue;
    fn compressed_size(&self) -> KValue;
    fn decompressed_size(&self) -> KValue;
    fn checksum(&self) -> KValue;
    fn data_key(&self) -> KValue;
    fn pass_key(&self) -> KValue;

    fn hash(&self) -> &[u8];
    fn set_hash(&mut self, hash: Vec<u8>);
    fn password(&self) -> &[u8];
    fn set_password(&mut self, password: Vec<u8>);

    fn decode_stream(&mut self, buf: &[u8], key: KValue) -> Vec<u8> {
        self.force_decode_stream(buf, key.value, key.add_len)
    }

    fn decode_string(&mut self, buf: &[u8], key: KValue) -> String {
        let raw = self.decode_stream(buf, key);
        if self.needs_unicode() {
            from_utf16le(&raw)
        } else {
            String::from_utf8_lossy(&raw).into_owned()
        }
    }

    /// The payload seed, offset by a running sum over the hash (EA05) or
    /// the plaintext password (legacy formats). Every other field uses
    /// its stored [`KValue`] unmodified.
    fn data(&self) -> KValue {
        let base = self.data_key();
        if self.data_uses_hash() {
            let mut value = base.value;
            for &b in self.hash() {
                value = value.wrapping_add(b as i32);
            }
            KValue { value, add_len: base.add_len }
        } else if self.needs_legacy() {
            let mut value = base.value - 0x849;
            for &b in self.password() {
                value = value.wrapping_add(b as i8 as i32);
            }
            KValue { value, add_len: base.add_len }
        } else {
            base
        }
    }
}

pub struct Ea06Keys {
    generator: Ea06Rand,
    hash: Vec<u8>,
    password: Vec<u8>,
}

impl Ea06Keys {
    pub fn new() -> Self {
        Ea06Keys { generator: Ea06Rand::default(), hash: Vec::new(), password: Vec::new() }
    }
}

impl Default for Ea06Keys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySchedule for Ea06Keys {
    fn force_decode_stream(&mut self, buf: &[u8], key: i32, add_len: bool) -> Vec<u8> {
        let mut seed = key;
        let mut factor = 2i32;
        if !self.needs_unicode() {
            factor -= 1;
        }
        if add_len {
            seed = seed.wrapping_add(buf.len() as i32 / factor);
        }
        self.generator.set_seed(seed as u32);
        buf.iter().map(|&b| b ^ (self.generator.next() as u8)).collect()
    }

    fn needs_unicode(&self) -> bool {
        true
    }

    fn file(&self) -> KValue {
        KValue { value: 0x18ee, add_len: false }
    }
    fn tag_size(&self) -> KValue {
        KValue { value: 0xadbc, add_len: true }
    }
    fn tag(&self) -> KValue {
        KValue { value: 0xb33f, add_len: true }
    }
    fn path_size(&self) -> KValue {
        KValue { value: 0xf820, add_len: true }
    }
    fn path(&self) -> KValue {
        KValue { value: 0xf479, add_len: true }
    }
    fn compressed_size(&self) -> KValue {
        KValue { value: 0x87bc, add_len: true }
    }
    fn decompressed_size(&self) -> KValue {
        KValue { value: 0x87bc, add_len: true }
    }
    fn checksum(&self) -> KValue {
        KValue { value: 0xa685, add_len: true }
    }
    fn data_key(&self) -> KValue {
        KValue { value: 0x2477, add_len: false }
    }
    fn pass_key(&self) -> KValue {
        KValue { value: 0xc3d2, add_len: false }
    }

    fn hash(&self) -> &[u8] {
        &self.hash
    }
    fn set_hash(&mut self, hash: Vec<u8>) {
        self.hash = hash;
    }
    fn password(&self) -> &[u8] {
        &self.password
    }
    fn set_password(&mut self, password: Vec<u8>) {
        self.password = password;
    }
}

pub struct Ea05Keys {
    generator: Mt19937,
    hash: Vec<u8>,
    password: Vec<u8>,
}

impl Ea05Keys {
    pub fn new() -> Self {
        Ea05Keys { generator: Mt19937::default(), hash: Vec::new(), password: Vec::new() }
    }
}

impl Default for Ea05Keys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySchedule for Ea05Keys {
    fn force_decode_stream(&mut self, buf: &[u8], key: i32, add_len: bool) -> Vec<u8> {
        let mut factor = 1i32;
        if self.needs_unicode() {
            factor += 1;
        }
        let mut seed = key;
        if add_len {
            seed = seed.wrapping_add(buf.len() as i32 / factor);
        }
        self.generator.set_seed(seed as u32);
        buf.iter().map(|&b| b ^ (self.generator.next() as u8)).collect()
    }

    fn needs_unicode(&self) -> bool {
        false
    }
    fn data_uses_hash(&self) -> bool {
        true
    }

    fn file(&self) -> KValue {
        KValue { value: 0x16FA, add_len: false }
    }
    fn tag_size(&self) -> KValue {
        KValue { value: 0x29bc, add_len: true }
    }
    fn tag(&self) -> KValue {
        KValue { value: 0xa25e, add_len: true }
    }
    fn path_size(&self) -> KValue {
        KValue { value: 0x29ac, add_len: true }
    }
    fn path(&self) -> KValue {
        KValue { value: 0xf25e, add_len: true }
    }
    fn compressed_size(&self) -> KValue {
        KValue { value: 0x45aa, add_len: true }
    }
    fn decompressed_size(&self) -> KValue {
        KValue { value: 0x45aa, add_len: true }
    }
    fn checksum(&self) -> KValue {
        KValue { value: 0xc3d2, add_len: true }
    }
    fn data_key(&self) -> KValue {
        KValue { value: 0x22af, add_len: false }
    }
    fn pass_key(&self) -> KValue {
        KValue { value: 0xc3d2, add_len: false }
    }

    fn hash(&self) -> &[u8] {
        &self.hash
    }
    fn set_hash(&mut self, hash: Vec<u8>) {
        self.hash = hash;
    }
    fn password(&self) -> &[u8] {
        &self.password
    }
    fn set_password(&mut self, password: Vec<u8>) {
        self.password = password;
    }
}

/// Legacy (pre-EA05) key schedule. Seeded by either the MSVC LCG or
/// MT19937 depending on a marker byte read before the hash field
/// (`script[0x10] == 1` meaning MSVCRT).
pub struct LegacyKeys {
    generator: Box<dyn Prng + Send>,
    hash: Vec<u8>,
    password: Vec<u8>,
}

impl LegacyKeys {
    pub fn new(old_auto_it: bool) -> Self {
        let generator: Box<dyn Prng + Send> =
            if old_auto_it { Box::new(MsvcRand::default()) } else { Box::new(Mt19937::default()) };
        LegacyKeys { generator, hash: Vec::new(), password: Vec::new() }
    }
}

impl KeySchedule for LegacyKeys {
    fn force_decode_stream(&mut self, buf: &[u8], key: i32, add_len: bool) -> Vec<u8> {
        let seed = if add_len { key.wrapping_add(buf.len() as i32) } else { key.wrapping_add(0x849) };
        self.generator.set_seed(seed as u32);
        buf.iter().map(|&b| b ^ (self.generator.next() as u8)).collect()
    }

    fn needs_unicode(&self) -> bool {
        false
    }
    fn needs_legacy(&self) -> bool {
        true
    }

    fn file(&self) -> KValue {
        KValue { value: 0x16FA - 0x849, add_len: false }
    }
    fn tag_size(&self) -> KValue {
        KValue { value: 0x29bc, add_len: true }
    }
    fn tag(&self) -> KValue {
        KValue { value: 0xa25e, add_len: true }
    }
    fn path_size(&self) -> KValue {
        KValue { value: 0x29ac, add_len: true }
    }
    fn path(&self) -> KValue {
        KValue { value: 0xf25e, add_len: true }
    }
    fn compressed_size(&self) -> KValue {
        KValue { value: 0x45aa, add_len: true }
    }
    fn decompressed_size(&self) -> KValue {
        KValue { value: 0x45aa, add_len: true }
    }
    fn checksum(&self) -> KValue {
        KValue { value: 0xc3d2, add_len: true }
    }
    fn data_key(&self) -> KValue {
        KValue { value: 0x22af, add_len: false }
    }
    fn pass_key(&self) -> KValue {
        KValue { value: 0xc3d2, add_len: true }
    }

    fn hash(&self) -> &[u8] {
        &self.hash
    }
    fn set_hash(&mut self, hash: Vec<u8>) {
        self.hash = hash;
    }
    fn password(&self) -> &[u8] {
        &self.password
    }
    fn set_password(&mut self, password: Vec<u8>) {
        self.password = password;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ea05_decode_is_its_own_inverse() {
        let mut keys = Ea05Keys::new();
        let plain = b"hello resource tag".to_vec();
        let key = keys.tag();
        let cipher = keys.decode_stream(&plain, key);
        let mut keys2 = Ea05Keys::new();
        let key2 = keys2.tag();
        let roundtrip = keys2.decode_stream(&cipher, key2);
        assert_eq!(roundtrip, plain);
    }

    #[test]
    fn legacy_data_key_folds_in_signed_password_sum() {
        let mut keys = LegacyKeys::new(false);
        keys.set_password(vec![0xff, 0x01]); // -1 + 1 = 0
        let data = keys.data();
        assert_eq!(data.value, keys.data_key().value - 0x849);
    }
}
