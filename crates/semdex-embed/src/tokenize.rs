use anyhow::{anyhow, ensure, Result};
use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Longest input the encoder sees; longer chunks are truncated.
pub const MAX_TOKENS: usize = 256;

/// Configure batch-longest padding and truncation at [`MAX_TOKENS`].
pub fn prepare_tokenizer(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: MAX_TOKENS, ..Default::default() }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    Ok(())
}

/// Returns `(input_ids, token_type_ids, attention_mask)`, each `[B, T]`.
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    device: &Device,
) -> Result<(Tensor, Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
    ensure!(seq_len > 0, "tokenizer produced empty encodings");

    let mut ids = Vec::with_capacity(texts.len() * seq_len);
    let mut type_ids = Vec::with_capacity(texts.len() * seq_len);
    let mut mask = Vec::with_capacity(texts.len() * seq_len);
    for enc in &encodings {
        ensure!(enc.get_ids().len() == seq_len, "batch is not padded to a common length");
        ids.extend_from_slice(enc.get_ids());
        type_ids.extend_from_slice(enc.get_type_ids());
        mask.extend_from_slice(enc.get_attention_mask());
    }

    let shape = (encodings.len(), seq_len);
    let input_ids = Tensor::from_vec(ids, shape, device)?;
    let token_type_ids = Tensor::from_vec(type_ids, shape, device)?;
    let attention_mask = Tensor::from_vec(mask, shape, device)?;
    Ok((input_ids, token_type_ids, attention_mask))
}
