use std::borrow::Cow;

use derive_into_owned::IntoOwned;

use crate::errors::{PcapError, PcapResult};

/// Algorithm of a packet hash option
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HashAlgorithm {
    TwosComplement,
    Xor,
    Crc32,
    Md5,
    Sha1,
    /// Unknown algorithm, the raw byte is kept
    Invalid(u8),
}

impl From<u8> for HashAlgorithm {
    fn from(code: u8) -> Self {
        match code {
            0 => HashAlgorithm::TwosComplement,
            1 => HashAlgorithm::Xor,
            2 => HashAlgorithm::Crc32,
            3 => HashAlgorithm::Md5,
            4 => HashAlgorithm::Sha1,
            _ => HashAlgorithm::Invalid(code),
        }
    }
}

impl From<HashAlgorithm> for u8 {
    fn from(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::TwosComplement => 0,
            HashAlgorithm::Xor => 1,
            HashAlgorithm::Crc32 => 2,
            HashAlgorithm::Md5 => 3,
            HashAlgorithm::Sha1 => 4,
            HashAlgorithm::Invalid(code) => code,
        }
    }
}

/// Value of a packet hash option: a 1-byte algorithm tag followed by the hash.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct HashBlock<'a> {
    /// Hashing algorithm
    pub algorithm: HashAlgorithm,
    /// Hash of the packet
    pub value: Cow<'a, [u8]>,
}

impl<'a> HashBlock<'a> {
    /// Creates a new borrowed `HashBlock`
    pub fn new(algorithm: HashAlgorithm, value: &'a [u8]) -> Self {
        HashBlock { algorithm, value: Cow::Borrowed(value) }
    }

    /// Parses a `HashBlock` from an option value.
    pub fn from_slice(slice: &'a [u8]) -> PcapResult<Self> {
        let (algorithm, value) = slice.split_first().ok_or(PcapError::InvalidField("HashBlock: empty value"))?;

        Ok(HashBlock { algorithm: HashAlgorithm::from(*algorithm), value: Cow::Borrowed(value) })
    }

    /// Returns the option value: the algorithm tag followed by the hash.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.value.len() + 1);
        out.push(self.algorithm.into());
        out.extend_from_slice(&self.value);
        out
    }

    /// The hash read as UTF-8, invalid sequences being replaced.
    pub fn string_value(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5: &str = "f59b7efafd800e27b47a488d30615c73";

    #[test]
    fn unknown_algorithm() {
        let mut data = vec![5_u8];
        data.extend_from_slice(MD5.as_bytes());

        let hash = HashBlock::from_slice(&data).unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Invalid(5));
        assert_eq!(hash.to_vec(), data);
    }

    #[test]
    fn md5() {
        let mut data = vec![3_u8];
        data.extend_from_slice(MD5.as_bytes());

        let hash = HashBlock::from_slice(&data).unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Md5);
        assert_eq!(hash.string_value(), MD5);
    }

    #[test]
    fn empty() {
        assert!(HashBlock::from_slice(&[]).is_err());
    }
}
