use fqa_core::domain::Chunk;

pub fn context_block(index: usize, chunk: &Chunk) -> String {
    let page = chunk
        .page
        .map(|p| format!(" (page {p})"))
        .unwrap_or_default();
    format!("[{}] Source: {}{}\n{}", index + 1, chunk.source_form, page, chunk.text.trim())
}

/// "Stuff" prompt: every context block verbatim, most relevant first, then the question.
pub fn grounded_answer_prompt(question: &str, blocks: &[String]) -> String {
    format!(
        r#"Use the following pieces of context to answer the question at the end.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
The context is ordered from most to least relevant. When the answer depends on a specific form, name that form.

{context}

Question: {question}
Helpful Answer:"#,
        context = blocks.join("\n\n"),
    )
}

pub fn context_free_prompt(question: &str) -> String {
    format!(
        r#"No form context matched this question.
Answer briefly, state that no matching form was found, and do not invent form names or requirements.

Question: {question}
Helpful Answer:"#
    )
}
