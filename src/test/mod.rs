//! Fixture builders for unit tests.
//!
//! The library only reads images. These helpers are the minimal writer needed to produce
//! well-formed (and deliberately broken) NativeFormat structures for tests.

/// Encodes `value` in the shortest NativeFormat unsigned form.
pub fn encode_unsigned(value: u32) -> Vec<u8> {
    if value < 1 << 7 {
        vec![(value << 1) as u8]
    } else if value < 1 << 14 {
        vec![((value << 2) | 0b01) as u8, (value >> 6) as u8]
    } else if value < 1 << 21 {
        vec![
            ((value << 3) | 0b011) as u8,
            (value >> 5) as u8,
            (value >> 13) as u8,
        ]
    } else if value < 1 << 28 {
        vec![
            ((value << 4) | 0b0111) as u8,
            (value >> 4) as u8,
            (value >> 12) as u8,
            (value >> 20) as u8,
        ]
    } else {
        let mut out = vec![0b0_1111];
        out.extend(value.to_le_bytes());
        out
    }
}

/// Encodes `value` in the shortest NativeFormat signed form.
pub fn encode_signed(value: i32) -> Vec<u8> {
    let fits = |bits: u32| {
        let half = 1_i64 << (bits - 1);
        (-half..half).contains(&i64::from(value))
    };

    if fits(7) {
        vec![(value << 1) as u8]
    } else if fits(14) {
        vec![((value << 2) | 0b01) as u8, (value >> 6) as u8]
    } else if fits(21) {
        vec![
            ((value << 3) | 0b011) as u8,
            (value >> 5) as u8,
            (value >> 13) as u8,
        ]
    } else if fits(28) {
        vec![
            ((value << 4) | 0b0111) as u8,
            (value >> 4) as u8,
            (value >> 12) as u8,
            (value >> 20) as u8,
        ]
    } else {
        let mut out = vec![0b0_1111];
        out.extend(value.to_le_bytes());
        out
    }
}

/// Result of [`HashtableBuilder::build`].
pub struct BuiltTable {
    /// Complete image
    pub data: Vec<u8>,
    /// Offset of the table header byte
    pub table_offset: u32,
    /// End of the entry region
    pub end_offset: u32,
    /// Payload offset of every entry, in the order the entries were added
    pub payloads: Vec<u32>,
}

/// Builds an image holding payloads followed by a hash table linking to them.
///
/// Layout: `[payloads][header][bucket directory][entries]`. Entries link backwards to their
/// payloads, so every relative offset in the table is negative.
pub struct HashtableBuilder {
    shift: u8,
    entry_index_size: u8,
    entries: Vec<(i32, Vec<u8>)>,
}

impl HashtableBuilder {
    pub fn new(shift: u8, entry_index_size: u8) -> Self {
        HashtableBuilder {
            shift,
            entry_index_size,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, hashcode: i32, payload: Vec<u8>) -> &mut Self {
        self.entries.push((hashcode, payload));
        self
    }

    pub fn build(&self) -> BuiltTable {
        let mut data = Vec::new();
        let mut payloads = Vec::new();
        for (_, payload) in &self.entries {
            payloads.push(data.len() as u32);
            data.extend(payload);
        }

        let table_offset = data.len() as u32;
        data.push((self.shift << 2) | self.entry_index_size);

        let base = data.len() as u32;
        let bucket_count = 1_usize << self.shift;
        let width = 1_usize << self.entry_index_size;
        let directory_len = (bucket_count + 1) * width;
        let entries_start = base + directory_len as u32;

        let mask = (bucket_count - 1) as u32;
        let mut entries = Vec::new();
        let mut starts = Vec::with_capacity(bucket_count + 1);
        for bucket in 0..bucket_count as u32 {
            starts.push(directory_len + entries.len());
            for (index, (hashcode, _)) in self.entries.iter().enumerate() {
                if ((*hashcode as u32) >> 8) & mask != bucket {
                    continue;
                }

                entries.push(*hashcode as u8);
                let field = entries_start + entries.len() as u32;
                let delta = i64::from(payloads[index]) - i64::from(field);
                entries.extend(encode_signed(delta as i32));
            }
        }
        starts.push(directory_len + entries.len());

        for start in starts {
            match self.entry_index_size {
                0 => data.push(start as u8),
                1 => data.extend((start as u16).to_le_bytes()),
                _ => data.extend((start as u32).to_le_bytes()),
            }
        }
        data.extend(entries);

        let end_offset = data.len() as u32;
        BuiltTable {
            data,
            table_offset,
            end_offset,
            payloads,
        }
    }
}
