use crate::index::SearchResult;

use super::NOT_FOUND_SENTINEL;

/// Build the grounded prompt for one question.
///
/// Retrieved chunks are joined in rank order, separated by blank lines.
#[inline]
pub fn build_prompt(context: &[SearchResult], question: &str) -> String {
    let context_text = context
        .iter()
        .map(|result| result.chunk.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Use the following pieces of context to answer the question at the end.\n\
         If you don't know the answer based on the provided context, respond with exactly: \"{NOT_FOUND_SENTINEL}\"\n\
         Don't try to make up an answer. Be concise and accurate in your response.\n\
         Cite specific information from the context when possible.\n\
         \n\
         Context: {context_text}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}
