// ============================================================
// Layer 5 — ELMo Character Encoder
// ============================================================
// Turns sentences into the character-id grid the char-CNN reads.
//
// Every token becomes `max_chars` ids:
//
//   [BOW, byte_0, byte_1, ..., EOW, PAD, PAD, ...]      (+1 each)
//
// Raw bytes map to 0..=255, the markers sit above them, and the
// whole row is shifted by one so that id 0 means "no token here".
// Each sentence is wrapped in <S> ... </S> marker tokens, and a
// batch is padded to the longest sentence with all-zero rows.
//
// Token bytes beyond `max_chars - 2` are dropped.

/// Characters per token, including the word markers.
pub const MAX_CHARS_PER_TOKEN: usize = 50;

/// Ids 0..=260 shifted by one, plus the 0 mask id.
pub const CHAR_VOCAB_SIZE: usize = 262;

/// Literal token that is never pooled.
pub const PAD_TOKEN: &str = "--PAD--";

const BOS_CHAR: u16 = 256;
const EOS_CHAR: u16 = 257;
const BOW_CHAR: u16 = 258;
const EOW_CHAR: u16 = 259;
const PAD_CHAR: u16 = 260;

/// Character ids for a whole batch, row-major `[batch, seq_len, max_chars]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub ids: Vec<i32>,
    /// True where any token sits, boundary markers included,
    /// row-major `[batch, seq_len]`
    pub slot_mask: Vec<bool>,
    /// True where a real word sits (not <S>, </S>, `--PAD--` or padding),
    /// row-major `[batch, seq_len]`
    pub word_mask: Vec<bool>,
    pub batch_size: usize,
    /// Longest sentence in the batch plus the two boundary tokens
    pub seq_len: usize,
    pub max_chars: usize,
}

impl EncodedBatch {
    /// Occupied slots in sentence `row`, `<S>` and `</S>` included.
    pub fn row_length(&self, row: usize) -> usize {
        self.slot_mask[row * self.seq_len..(row + 1) * self.seq_len]
            .iter()
            .filter(|&&m| m)
            .count()
    }

    /// Flat `[batch * seq_len]` gather index that reverses each row's
    /// occupied prefix and leaves its padding in place. Applying it twice
    /// restores the original order.
    pub fn reverse_permutation(&self) -> Vec<i32> {
        let t = self.seq_len;
        (0..self.batch_size)
            .flat_map(|row| {
                let len = self.row_length(row);
                (0..t).map(move |p| {
                    let src = if p < len { len - 1 - p } else { p };
                    (row * t + src) as i32
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CharEncoder {
    max_chars: usize,
}

impl CharEncoder {
    pub fn new(max_chars: usize) -> Self {
        // room for BOW + at least one byte + EOW
        Self {
            max_chars: max_chars.max(3),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Ids for one word token.
    pub fn encode_word(&self, word: &str) -> Vec<i32> {
        let mut ids = vec![PAD_CHAR; self.max_chars];
        ids[0] = BOW_CHAR;
        let bytes = word.as_bytes();
        let n = bytes.len().min(self.max_chars - 2);
        for (slot, &b) in ids[1..=n].iter_mut().zip(bytes) {
            *slot = b as u16;
        }
        ids[n + 1] = EOW_CHAR;
        ids.into_iter().map(|c| c as i32 + 1).collect()
    }

    fn encode_marker(&self, marker: u16) -> Vec<i32> {
        let mut ids = vec![PAD_CHAR; self.max_chars];
        ids[0] = BOW_CHAR;
        ids[1] = marker;
        ids[2] = EOW_CHAR;
        ids.into_iter().map(|c| c as i32 + 1).collect()
    }

    /// Encode a batch of sentences, splitting each on whitespace.
    pub fn encode_batch<S: AsRef<str>>(&self, sentences: &[S]) -> EncodedBatch {
        let tokenised: Vec<Vec<&str>> = sentences
            .iter()
            .map(|s| s.as_ref().split_whitespace().collect())
            .collect();

        let longest = tokenised.iter().map(Vec::len).max().unwrap_or(0);
        let seq_len = longest + 2;
        let batch_size = sentences.len();

        let mut ids = Vec::with_capacity(batch_size * seq_len * self.max_chars);
        let mut slot_mask = Vec::with_capacity(batch_size * seq_len);
        let mut word_mask = Vec::with_capacity(batch_size * seq_len);
        let bos = self.encode_marker(BOS_CHAR);
        let eos = self.encode_marker(EOS_CHAR);
        let empty = vec![0i32; self.max_chars];

        for tokens in &tokenised {
            ids.extend_from_slice(&bos);
            slot_mask.push(true);
            word_mask.push(false);

            for token in tokens {
                ids.extend(self.encode_word(token));
                slot_mask.push(true);
                word_mask.push(*token != PAD_TOKEN);
            }

            ids.extend_from_slice(&eos);
            slot_mask.push(true);
            word_mask.push(false);

            for _ in tokens.len()..longest {
                ids.extend_from_slice(&empty);
                slot_mask.push(false);
                word_mask.push(false);
            }
        }

        EncodedBatch {
            ids,
            slot_mask,
            word_mask,
            batch_size,
            seq_len,
            max_chars: self.max_chars,
        }
    }
}

impl Default for CharEncoder {
    fn default() -> Self {
        Self::new(MAX_CHARS_PER_TOKEN)
    }
}
