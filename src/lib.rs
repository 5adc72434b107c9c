pub mod alphabet;
pub mod codec;
pub mod config;
pub mod doubling;
pub mod error;
pub mod kmer;
pub mod lcp;
pub mod path_node;
pub mod priority_queue;
pub mod progress;
pub mod read_buffer;
pub mod rmq;
pub mod sl_array;
pub mod value_index;

pub use alphabet::Alphabet;
pub use codec::{Key, KeyType, Node, NodeType};
pub use config::{ConstructionParameters, MAX_DOUBLING_STEPS};
pub use doubling::PathGraph;
pub use error::{ConstructionError, Result};
pub use kmer::{unique_keys, KMer};
pub use lcp::LCP;
pub use path_node::{PathNode, Phase, RankType, LABEL_LENGTH};
