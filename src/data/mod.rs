// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw corpus files and tensor batches.
//
//   train.csv / test.csv       glove.txt          lexicon.txt
//       │                          │                   │
//       ▼                          │                   │
//   CsvCorpus  (loader)            │                   │
//       │                          │                   │
//       ▼                          │                   │
//   Preprocessor                   │                   │
//       │                          │                   │
//       ▼                          ▼                   ▼
//   Tokenizer ──── vocabulary ──▶ LookupTable    SentimentLexicon::align
//       │
//       ▼
//   TextDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   TextBatcher  → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader   → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads labelled sentences from CSV files
pub mod loader;

/// Normalises raw sentences
pub mod preprocessor;

/// Pretrained / random word vectors aligned with the vocabulary
pub mod embedding;

/// Word polarity lexicon aligned with the vocabulary
pub mod lexicon;

/// Implements Burn's Dataset trait for encoded sentences
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/held-out sets
pub mod splitter;
