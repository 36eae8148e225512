use ahash::{AHashMap, AHashSet};

/// Tokens ignored during analysis.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "with",
];

/// Built-in retail corpus the vocabulary is fitted over. Covers the
/// product domains the engine indexes so everyday catalog text lands on
/// non-zero features.
pub(crate) const SEED_CORPUS: &[&str] = &[
    "product goods merchandise retail shop store market purchase price brand",
    "electronics computer phone smartphone tablet laptop monitor charger battery screen",
    "clothing apparel fashion shirt pants dress jacket coat sweater fabric",
    "shoes sneakers boots sandals running walking trail footwear laces sole",
    "red blue green black white grey yellow orange color pattern",
    "furniture home table chair sofa bed shelf cabinet lamp decor",
    "kitchen cooking meal recipe grocery food snack drink utensils appliance",
    "books reading novel textbook magazine literature learning paper print author",
    "sports fitness exercise workout gym training athletic gear equipment outdoor",
    "health beauty skincare cosmetics hygiene wellness vitamins soap lotion care",
    "toys games puzzle hobby craft supplies creative play children fun",
    "automotive car truck motorcycle vehicle parts tires engine maintenance repair",
    "garden plant flower yard lawn tool soil seeds landscape watering",
    "music audio speaker headphone instrument sound media player wireless volume",
    "jewelry watch ring necklace bracelet luxury gold silver gemstone accessory",
    "office desk business work school stationery pen notebook organizer professional",
];

/// Lowercased alphanumeric unigrams plus adjacent bigrams, stop words
/// removed before pairing.
fn tokenize(text: &str) -> Vec<String> {
    let unigrams: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect();

    let mut tokens = unigrams.clone();
    tokens.extend(
        unigrams
            .windows(2)
            .map(|pair| format!("{} {}", pair[0], pair[1])),
    );
    tokens
}

/// TF-IDF vectorizer over a vocabulary fixed at fit time.
///
/// Feature layout is deterministic: terms are capped at `max_features` by
/// corpus frequency (ties broken lexicographically) and indexed in sorted
/// order, so identical input always maps to the identical feature vector.
pub struct TfIdfVectorizer {
    vocabulary: AHashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfIdfVectorizer {
    /// Fit over `corpus`, keeping at most `max_features` terms.
    pub fn fit(corpus: &[&str], max_features: usize) -> Self {
        let n_documents = corpus.len();
        let mut document_frequency: AHashMap<String, usize> = AHashMap::default();
        let mut corpus_count: AHashMap<String, usize> = AHashMap::default();

        for doc in corpus {
            let mut seen: AHashSet<&str> = AHashSet::default();
            let tokens = tokenize(doc);
            for token in &tokens {
                *corpus_count.entry(token.clone()).or_insert(0) += 1;
            }
            for token in &tokens {
                if seen.insert(token.as_str()) {
                    *document_frequency.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut terms: Vec<(String, usize)> = corpus_count.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(max_features);

        let mut selected: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();
        selected.sort();

        let mut vocabulary = AHashMap::default();
        let mut idf = Vec::with_capacity(selected.len());
        for (index, term) in selected.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0);
            idf.push(((n_documents as f32 + 1.0) / (df as f32 + 1.0)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Self { vocabulary, idf }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Raw tf-idf features, length = vocabulary size. Out-of-vocabulary
    /// tokens contribute nothing; fully unknown text maps to all zeros.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut features = vec![0.0f32; self.vocabulary.len()];

        for token in &tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                features[index] += 1.0;
            }
        }

        let token_count = tokens.len() as f32;
        if token_count > 0.0 {
            for (index, value) in features.iter_mut().enumerate() {
                *value = *value / token_count * self.idf[index];
            }
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_unigrams_and_bigrams() {
        let tokens = tokenize("Red Running-Shoes");
        assert!(tokens.contains(&"red".to_string()));
        assert!(tokens.contains(&"running".to_string()));
        assert!(tokens.contains(&"shoes".to_string()));
        assert!(tokens.contains(&"red running".to_string()));
        assert!(tokens.contains(&"running shoes".to_string()));
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        let tokens = tokenize("the shoes for a run");
        assert!(!tokens.iter().any(|t| t == "the" || t == "for" || t == "a"));
        assert!(tokens.contains(&"shoes run".to_string()));
    }

    #[test]
    fn test_fit_transform_deterministic() {
        let vectorizer = TfIdfVectorizer::fit(SEED_CORPUS, 384);
        assert!(vectorizer.vocabulary_size() > 0);
        assert!(vectorizer.vocabulary_size() <= 384);

        let a = vectorizer.transform("red sneakers");
        let b = vectorizer.transform("red sneakers");
        assert_eq!(a, b);
        assert_eq!(a.len(), vectorizer.vocabulary_size());
    }

    #[test]
    fn test_unknown_text_maps_to_zeros() {
        let vectorizer = TfIdfVectorizer::fit(SEED_CORPUS, 384);
        let features = vectorizer.transform("zzzz qqqq");
        assert!(features.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_max_features_caps_vocabulary() {
        let vectorizer = TfIdfVectorizer::fit(SEED_CORPUS, 16);
        assert_eq!(vectorizer.vocabulary_size(), 16);
    }
}
