#![allow(dead_code)]

#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform integer in `[min, max)`.
    pub fn gen_i32(&mut self, min: i32, max: i32) -> i32 {
        let span = (max - min).max(1) as u64;
        min + (self.next_u64() % span) as i32
    }

    /// Lower-case ASCII word of `len` letters.
    pub fn gen_word(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| char::from(b'a' + (self.next_u64() % 26) as u8))
            .collect()
    }

    /// Copy of `word` with up to `edits` random substitutions.
    pub fn misspell(&mut self, word: &str, edits: usize) -> String {
        let mut chars: Vec<char> = word.chars().collect();
        if chars.is_empty() {
            return String::new();
        }
        for _ in 0..edits {
            let at = (self.next_u64() % chars.len() as u64) as usize;
            chars[at] = char::from(b'a' + (self.next_u64() % 26) as u8);
        }
        chars.into_iter().collect()
    }
}
