use nom::IResult;

use crate::util::{all_of, u24_prefixed};

/// Certificate body before TLS 1.3: a u24 list of u24 DER certificates,
/// leaf first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CertificateList {
    pub chain: Vec<Vec<u8>>,
}

impl CertificateList {
    pub fn new(chain: Vec<Vec<u8>>) -> Self {
        CertificateList { chain }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CertificateList> {
        let (rest, list) = u24_prefixed(input)?;
        let (_, certs) = all_of(u24_prefixed)(list)?;
        Ok((
            rest,
            CertificateList {
                chain: certs.into_iter().map(|c| c.to_vec()).collect(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        let total: usize = self.chain.iter().map(|c| 3 + c.len()).sum();
        output.extend_from_slice(&(total as u32).to_be_bytes()[1..]);
        for cert in &self.chain {
            output.extend_from_slice(&(cert.len() as u32).to_be_bytes()[1..]);
            output.extend_from_slice(cert);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = &[
        0x00, 0x00, 0x0C, // total length
        0x00, 0x00, 0x04, // certificate 1 length
        0x01, 0x02, 0x03, 0x04, // certificate 1
        0x00, 0x00, 0x02, // certificate 2 length
        0x05, 0x06, // certificate 2
    ];

    #[test]
    fn two_certificates() {
        let (rest, parsed) = CertificateList::parse(MESSAGE).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.chain, vec![vec![1, 2, 3, 4], vec![5, 6]]);

        let mut out = Vec::new();
        parsed.serialize(&mut out);
        assert_eq!(out, MESSAGE);
    }

    #[test]
    fn empty_chain() {
        let (_, parsed) = CertificateList::parse(&[0, 0, 0]).unwrap();
        assert!(parsed.chain.is_empty());
    }

    #[test]
    fn truncated_certificate_fails() {
        assert!(CertificateList::parse(&[0x00, 0x00, 0x05, 0x00, 0x00, 0x04, 0x01, 0x02]).is_err());
    }
}
