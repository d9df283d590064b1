//! Dense vectors shared by TF-IDF retrieval and the zero-shot embedding scorer.

/// A dense text vector: TF-IDF weights, or a sentence embedding.
pub type Embedding = Vec<f32>;

/// Cosine of the angle between `a` and `b`, in `[-1.0, 1.0]`.
///
/// Mismatched lengths, empty input and zero vectors all score `0.0`, so a
/// journal entry with no indexed terms never ranks as similar.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(feature = "embeddings")]
pub use model::EmbeddingModel;

#[cfg(feature = "embeddings")]
mod model {
    use super::Embedding;
    use anyhow::Result;
    use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
    use std::sync::Arc;

    /// Sentence embedding model, loaded once and shared.
    #[derive(Clone)]
    pub struct EmbeddingModel {
        model: Arc<TextEmbedding>,
    }

    impl EmbeddingModel {
        pub fn new() -> Result<Self> {
            let mut options = InitOptions::default();
            options.model_name = FastEmbedModel::MultilingualE5Small;
            options.show_download_progress = true;

            let model = TextEmbedding::try_new(options)?;
            tracing::info!("Embedding model loaded (multilingual-e5-small)");

            Ok(Self {
                model: Arc::new(model),
            })
        }

        pub fn embed(&self, text: &str) -> Result<Embedding> {
            let embeddings = self.model.embed(vec![text], None)?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("Failed to generate embedding"))
        }

        pub fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
            let embeddings = self.model.embed(texts, None)?;
            Ok(embeddings)
        }
    }
}
