pub mod memo;

pub use memo::{memo_key, MemoFlags, MemoLookup, ResponseCache};
