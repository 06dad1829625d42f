//! Output delivery: chunking, clipboard, output file, stdout, token count.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use arboard::Clipboard;

use crate::config::Config;
use crate::error::{CpaiError, Result};

/// Split `text` into parts of at most `size` characters.
///
/// A part ends after the last newline in its window, else after the last
/// whitespace; a run without either is cut at the window edge.
pub fn chunk_content(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(size) else {
            parts.push(rest);
            break;
        };
        let window = &rest[..limit];
        let cut = window
            .rfind('\n')
            .map(|pos| pos + 1)
            .or_else(|| {
                window
                    .char_indices()
                    .rev()
                    .find(|(pos, c)| *pos > 0 && c.is_whitespace())
                    .map(|(pos, c)| pos + c.len_utf8())
            })
            .unwrap_or(limit);

        let (part, tail) = rest.split_at(cut);
        parts.push(part);
        rest = tail;
    }

    tracing::debug!("split {} characters into {} parts", text.chars().count(), parts.len());
    parts
}

/// cl100k token count, `None` when the encoder is unavailable
pub fn count_tokens(text: &str) -> Option<usize> {
    match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Some(bpe.encode_with_special_tokens(text).len()),
        Err(err) => {
            tracing::warn!("token counting unavailable: {}", err);
            None
        }
    }
}

/// Deliver the document to the configured destinations.
///
/// The output file always receives the whole document. Clipboard problems
/// are logged and do not fail the run.
pub fn write_output(content: &str, config: &Config) -> Result<()> {
    let chars = content.chars().count();
    if chars > config.chunk_size {
        tracing::warn!(
            "output size ({} characters) exceeds the chunk size ({} characters); it will be split into multiple parts",
            chars,
            config.chunk_size
        );
    }

    if let Some(path) = &config.output_file {
        write_file(path, content)?;
        tracing::info!("output written to {}", path.display());
    }

    if config.use_clipboard {
        if let Err(err) = copy_to_clipboard(content, config.chunk_size) {
            tracing::error!("failed to copy to clipboard: {}", err);
        }
    } else if config.output_file.is_none() {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| CpaiError::io("<stdout>", e))?;
    }

    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CpaiError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| CpaiError::io(path, e))
}

fn copy_to_clipboard(content: &str, chunk_size: usize) -> Result<()> {
    let mut clipboard = Clipboard::new()?;
    let parts = labeled_parts(content, chunk_size);
    let total = parts.len();

    for (index, part) in parts.iter().enumerate() {
        clipboard.set_text(part.as_str())?;
        if total == 1 {
            tracing::info!("content copied to clipboard");
            break;
        }
        tracing::info!("part {} of {} copied to clipboard", index + 1, total);
        if index + 1 < total {
            wait_for_enter()?;
        }
    }
    Ok(())
}

/// Clipboard parts; every part after the first names its position
fn labeled_parts(content: &str, chunk_size: usize) -> Vec<String> {
    let parts = chunk_content(content, chunk_size);
    let total = parts.len();
    parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| {
            if index == 0 {
                part.to_string()
            } else {
                format!("------ part {} of {} ------\n{}", index + 1, total, part)
            }
        })
        .collect()
}

fn wait_for_enter() -> Result<()> {
    eprint!("Press Enter when ready for the next part...");
    io::stderr().flush().map_err(|e| CpaiError::io("<stderr>", e))?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| CpaiError::io("<stdin>", e))?;
    Ok(())
}
