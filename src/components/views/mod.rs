mod listen;
mod search;

pub use listen::ListenView;
pub use search::SearchView;
