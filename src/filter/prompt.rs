//! Prompt construction and text chunking

/// System prompt for an extraction request
pub fn system_prompt(description: &str) -> String {
    format!(
        "You extract structured data from web page text.\n\n\
         1. Extract only information matching: {description}\n\
         2. Reply with a single JSON object whose keys are field names. Use an array \
         when a field has several values, for example one entry per product.\n\
         3. Do not add explanations or commentary.\n\
         4. Use only the text you are given, not outside knowledge.\n\
         5. If nothing matches, reply with an empty object {{}}.\n\
         6. Links in the text appear as [url] right after the link text; keep them \
         when a field asks for a link."
    )
}

/// User message for one piece of page text
pub fn user_message(text: &str, description: &str) -> String {
    format!("Text content: {}\n\nDescription: {}", text, description)
}

/// Splits text into pieces of at most `size` characters
///
/// Pieces break on line boundaries; a single line longer than `size` is cut
/// into `size`-character slices.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();

        if line_len > size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(size) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        // +1 for the joining newline
        let needed = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + needed > size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}
