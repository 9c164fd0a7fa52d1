use super::Backend;
use crate::Result;

/// Image bytes owned by the process, e.g. a section copied out of a larger container
#[derive(Debug)]
pub struct Owned {
    data: Box<[u8]>,
}

impl Owned {
    /// Takes ownership of `data`, releasing any spare capacity
    pub fn new(data: Vec<u8>) -> Owned {
        Owned {
            data: data.into_boxed_slice(),
        }
    }
}

impl Backend for Owned {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| out_of_bounds_error!(offset, len))
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn section_slices() {
        // Two 8-byte buckets of a cuckoo filter section
        let section: Vec<u8> = (0..16).collect();
        let mut data = Vec::with_capacity(64);
        data.extend(&section);

        let owned = Owned::new(data);
        assert_eq!(owned.len(), 16);
        assert_eq!(owned.data(), section.as_slice());
        assert_eq!(owned.data_slice(8, 8).unwrap(), &section[8..]);
        assert!(owned.data_slice(8, 9).is_err());
    }

    #[test]
    fn range_errors_carry_request() {
        let owned = Owned::new(vec![0x00; 100]);

        assert!(matches!(
            owned.data_slice(usize::MAX, 1),
            Err(Error::OutOfBounds { offset: usize::MAX, length: 1, .. })
        ));
        assert!(matches!(
            owned.data_slice(99, 2),
            Err(Error::OutOfBounds {
                offset: 99,
                length: 2,
                ..
            })
        ));
        assert!(matches!(
            owned.data_slice(101, 0),
            Err(Error::OutOfBounds { offset: 101, .. })
        ));

        let empty: &[u8] = &[];
        assert_eq!(owned.data_slice(100, 0).unwrap(), empty);
    }
}
