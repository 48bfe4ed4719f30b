mod rewriter;

pub use rewriter::EdgeRewriter;
